use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::Image;
use crate::repo::StoreResult;

/// Image repository for database operations
///
/// Images are immutable once ingested and keyed by the SHA-256 of their
/// bytes, so registering the same content twice keeps the first row.
/// Listing order is insertion order and stays stable across calls.
///
/// # Example
///
/// ```no_run
/// use tagflow::db::DbConnection;
/// use tagflow::repo::ImageRepo;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// let image = ImageRepo::create(&conn, "9f86d0...", "cat.png").unwrap();
/// assert_eq!(ImageRepo::count(&conn).unwrap(), 1);
/// ```
pub struct ImageRepo;

impl ImageRepo {
    /// Register an image; a no-op if the hash is already known.
    /// Returns the stored row, which keeps the original filename on conflict.
    pub fn create(conn: &Connection, sha256: &str, filename: &str) -> StoreResult<Image> {
        let image = Image::new(sha256.to_string(), filename.to_string());

        conn.execute(
            "INSERT INTO images (sha256, filename, ingested_ts) VALUES (?1, ?2, ?3)
             ON CONFLICT(sha256) DO NOTHING",
            rusqlite::params![image.sha256, image.filename, image.ingested_ts],
        )?;

        match Self::get_by_sha256(conn, sha256)? {
            Some(stored) => Ok(stored),
            None => Ok(image),
        }
    }

    /// Get image by content hash
    pub fn get_by_sha256(conn: &Connection, sha256: &str) -> StoreResult<Option<Image>> {
        let image = conn
            .query_row(
                "SELECT sha256, filename, ingested_ts FROM images WHERE sha256 = ?1",
                [sha256],
                row_to_image,
            )
            .optional()?;
        Ok(image)
    }

    /// Get the first image registered under a filename
    pub fn get_by_filename(conn: &Connection, filename: &str) -> StoreResult<Option<Image>> {
        let image = conn
            .query_row(
                "SELECT sha256, filename, ingested_ts FROM images
                 WHERE filename = ?1 ORDER BY rowid LIMIT 1",
                [filename],
                row_to_image,
            )
            .optional()?;
        Ok(image)
    }

    /// List all images in insertion order
    pub fn list(conn: &Connection) -> StoreResult<Vec<Image>> {
        let mut stmt = conn.prepare(
            "SELECT sha256, filename, ingested_ts FROM images ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], row_to_image)?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }

    /// Count all images
    pub fn count(conn: &Connection) -> StoreResult<usize> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_image(row: &Row) -> rusqlite::Result<Image> {
    Ok(Image {
        sha256: row.get(0)?,
        filename: row.get(1)?,
        ingested_ts: row.get(2)?,
    })
}

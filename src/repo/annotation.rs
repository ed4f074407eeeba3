use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashSet;
use crate::models::{Annotation, AnnotationStats};
use crate::repo::StoreResult;

/// Annotation repository for database operations
///
/// Manages per-annotator answers with support for:
/// - Upserting an answer keyed by (image, username, stage)
/// - Bulk hash lookups per stage used by dependency resolution
/// - Any-user existence checks used by scheduling
/// - Store-wide statistics
///
/// # Shared answers
///
/// Existence and value lookups deliberately ignore `username`: once any
/// annotator answers a stage for an image, that answer gates downstream
/// stages for everyone.
///
/// # Example
///
/// ```no_run
/// use tagflow::db::DbConnection;
/// use tagflow::repo::{AnnotationRepo, ImageRepo};
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// ImageRepo::create(&conn, "abc123", "cat.png").unwrap();
/// let annotation = AnnotationRepo::upsert(&conn, "abc123", "alice", 0, "true").unwrap();
/// ```
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Insert an answer, or overwrite the value of an existing one for the
    /// same (image, username, stage). The row id is preserved on overwrite.
    pub fn upsert(
        conn: &Connection,
        image_sha256: &str,
        username: &str,
        stage_index: usize,
        value: &str,
    ) -> StoreResult<Annotation> {
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO annotations (image_sha256, username, stage_index, option_value, annotated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(image_sha256, username, stage_index)
             DO UPDATE SET option_value = excluded.option_value, annotated_ts = excluded.annotated_ts",
            rusqlite::params![image_sha256, username, stage_index as i64, value, now],
        )?;

        let stored = Self::get(conn, image_sha256, username, stage_index)?;
        Ok(stored.unwrap_or(Annotation {
            id: None,
            image_sha256: image_sha256.to_string(),
            username: username.to_string(),
            stage_index,
            value: value.to_string(),
            annotated_ts: now,
        }))
    }

    /// Get one annotator's answer for an image at a stage
    pub fn get(
        conn: &Connection,
        image_sha256: &str,
        username: &str,
        stage_index: usize,
    ) -> StoreResult<Option<Annotation>> {
        let annotation = conn
            .query_row(
                "SELECT id, image_sha256, username, stage_index, option_value, annotated_ts
                 FROM annotations
                 WHERE image_sha256 = ?1 AND username = ?2 AND stage_index = ?3",
                rusqlite::params![image_sha256, username, stage_index as i64],
                row_to_annotation,
            )
            .optional()?;
        Ok(annotation)
    }

    /// Get all answers for an image, ordered by stage then username
    pub fn get_for_image(conn: &Connection, image_sha256: &str) -> StoreResult<Vec<Annotation>> {
        let mut stmt = conn.prepare(
            "SELECT id, image_sha256, username, stage_index, option_value, annotated_ts
             FROM annotations
             WHERE image_sha256 = ?1
             ORDER BY stage_index ASC, username ASC",
        )?;
        let rows = stmt.query_map([image_sha256], row_to_annotation)?;

        let mut annotations = Vec::new();
        for row in rows {
            annotations.push(row?);
        }
        Ok(annotations)
    }

    /// Whether any annotator has answered this stage for the image
    pub fn exists_at_stage(conn: &Connection, image_sha256: &str, stage_index: usize) -> StoreResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM annotations WHERE image_sha256 = ?1 AND stage_index = ?2
             )",
            rusqlite::params![image_sha256, stage_index as i64],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Count images that no annotator has answered at this stage
    pub fn count_unannotated_at_stage(conn: &Connection, stage_index: usize) -> StoreResult<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM images i
             WHERE NOT EXISTS (
                SELECT 1 FROM annotations a
                WHERE a.image_sha256 = i.sha256 AND a.stage_index = ?1
             )",
            [stage_index as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Hashes of images with at least one answer equal to `value` at this stage
    pub fn image_hashes_with_value(
        conn: &Connection,
        stage_index: usize,
        value: &str,
    ) -> StoreResult<HashSet<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT image_sha256 FROM annotations
             WHERE stage_index = ?1 AND option_value = ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![stage_index as i64, value], |row| {
            row.get::<_, String>(0)
        })?;

        let mut hashes = HashSet::new();
        for row in rows {
            hashes.insert(row?);
        }
        Ok(hashes)
    }

    /// Hashes of images with any answer at this stage
    pub fn image_hashes_at_stage(conn: &Connection, stage_index: usize) -> StoreResult<HashSet<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT image_sha256 FROM annotations WHERE stage_index = ?1",
        )?;
        let rows = stmt.query_map([stage_index as i64], |row| row.get::<_, String>(0))?;

        let mut hashes = HashSet::new();
        for row in rows {
            hashes.insert(row?);
        }
        Ok(hashes)
    }

    /// Count answers given by one annotator
    pub fn count_by_user(conn: &Connection, username: &str) -> StoreResult<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM annotations WHERE username = ?1",
            [username],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Store-wide counters
    pub fn stats(conn: &Connection) -> StoreResult<AnnotationStats> {
        let stats = conn.query_row(
            "SELECT COUNT(DISTINCT image_sha256), COUNT(*), COUNT(DISTINCT username)
             FROM annotations",
            [],
            |row| {
                Ok(AnnotationStats {
                    annotated_images: row.get::<_, i64>(0)? as usize,
                    total_annotations: row.get::<_, i64>(1)? as usize,
                    total_users: row.get::<_, i64>(2)? as usize,
                })
            },
        )?;
        Ok(stats)
    }
}

fn row_to_annotation(row: &Row) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: Some(row.get(0)?),
        image_sha256: row.get(1)?,
        username: row.get(2)?,
        stage_index: row.get::<_, i64>(3)? as usize,
        value: row.get(4)?,
        annotated_ts: row.get(5)?,
    })
}

use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;

        for version in (current_version + 1)..=CURRENT_VERSION {
            log::debug!("Applying schema migration v{}", version);
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: images and annotations
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // Images are keyed by content hash; re-ingesting identical bytes is a no-op
    tx.execute(
        "CREATE TABLE images (
            sha256 TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            ingested_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // One row per (image, annotator, stage); resubmission overwrites
    tx.execute(
        "CREATE TABLE annotations (
            id INTEGER PRIMARY KEY,
            image_sha256 TEXT NOT NULL REFERENCES images(sha256) ON DELETE CASCADE,
            username TEXT NOT NULL,
            stage_index INTEGER NOT NULL,
            option_value TEXT NOT NULL,
            annotated_ts INTEGER NOT NULL,
            UNIQUE(image_sha256, username, stage_index)
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_annotations_stage_value ON annotations(stage_index, option_value)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_annotations_image_stage ON annotations(image_sha256, stage_index)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_annotations_username ON annotations(username)",
        [],
    )?;

    Ok(())
}

/// Migration v2: task id -> stage index registry
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // Note: annotations.stage_index joins positionally; this table pins each
    // position to the task id that first claimed it.
    tx.execute(
        "CREATE TABLE task_stages (
            task_id TEXT PRIMARY KEY,
            stage_index INTEGER NOT NULL UNIQUE,
            registered_ts INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use crate::db::migrations::MigrationManager;

/// Default database file name, created next to the project config
pub const DEFAULT_DB_FILE: &str = "annotations.db";

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Resolve the database path for a project.
    ///
    /// An explicit path wins; otherwise the database lives next to the config
    /// file. A leading `~/` is expanded to the home directory.
    pub fn resolve_path(config_path: &Path, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return expand_home(path);
        }
        let config_path = expand_home(config_path);
        match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(DEFAULT_DB_FILE),
            _ => PathBuf::from(DEFAULT_DB_FILE),
        }
    }

    /// Open the database, creating it and parent directories if needed
    pub fn open(db_path: &Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        // WAL lets readers proceed while an annotation is being written
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("Failed to enable WAL mode")?;
        log::debug!("journal_mode={}", mode);
        conn.busy_timeout(Duration::from_millis(5000))
            .context("Failed to set busy timeout")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        log::debug!("Opened database {}", db_path.display());
        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}

/// Expand a leading `~/` using the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

use rusqlite::Connection;
use crate::repo::StoreResult;

/// Recorded task id -> stage index pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub task_id: String,
    pub stage_index: usize,
    pub registered_ts: i64,
}

pub struct StageRepo;

impl StageRepo {
    /// List all recorded stages ordered by index
    pub fn list_all(conn: &Connection) -> StoreResult<Vec<StageRecord>> {
        let mut stmt = conn.prepare(
            "SELECT task_id, stage_index, registered_ts FROM task_stages ORDER BY stage_index",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StageRecord {
                task_id: row.get(0)?,
                stage_index: row.get::<_, i64>(1)? as usize,
                registered_ts: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Record a task at a stage index
    pub fn register(conn: &Connection, task_id: &str, stage_index: usize) -> StoreResult<StageRecord> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO task_stages (task_id, stage_index, registered_ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![task_id, stage_index as i64, now],
        )?;
        Ok(StageRecord {
            task_id: task_id.to_string(),
            stage_index,
            registered_ts: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_register_and_list() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::register(&conn, "rotation", 1).unwrap();
        StageRepo::register(&conn, "has_person", 0).unwrap();

        let records = StageRepo::list_all(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task_id, "has_person");
        assert_eq!(records[1].stage_index, 1);
    }

    #[test]
    fn test_register_duplicate_index_fails() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::register(&conn, "a", 0).unwrap();
        assert!(StageRepo::register(&conn, "b", 0).is_err());
    }
}

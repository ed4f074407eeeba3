use rusqlite::Connection;
use std::collections::HashMap;
use crate::repo::StageRepo;
use crate::workflow::{ConfigError, TaskGraph};

/// Pins each task id to the stage index it was first seen at.
///
/// Annotation rows reference stages by position. Recording the pairing lets
/// a reordered config fail loudly at startup instead of silently attributing
/// old answers to the wrong task.
pub struct StageRegistry;

/// What `StageRegistry::sync` changed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub registered: Vec<String>,
    pub missing: Vec<String>,
}

impl StageRegistry {
    pub fn sync(conn: &Connection, graph: &TaskGraph) -> Result<SyncReport, ConfigError> {
        let records = StageRepo::list_all(conn)?;
        let by_task: HashMap<&str, usize> = records
            .iter()
            .map(|r| (r.task_id.as_str(), r.stage_index))
            .collect();
        let by_stage: HashMap<usize, &str> = records
            .iter()
            .map(|r| (r.stage_index, r.task_id.as_str()))
            .collect();

        let mut pending = Vec::new();
        for (index, task) in graph.tasks().iter().enumerate() {
            match by_task.get(task.id.as_str()) {
                Some(&recorded) if recorded == index => {}
                Some(&recorded) => {
                    return Err(ConfigError::StageMismatch {
                        task_id: task.id.clone(),
                        recorded,
                        current: index,
                    });
                }
                None => {
                    if let Some(owner) = by_stage.get(&index) {
                        return Err(ConfigError::StageTaken {
                            stage_index: index,
                            recorded_task: owner.to_string(),
                            current_task: task.id.clone(),
                        });
                    }
                    pending.push((task.id.as_str(), index));
                }
            }
        }

        let mut report = SyncReport::default();
        let tx = conn.unchecked_transaction().map_err(crate::repo::StoreError::from)?;
        for (task_id, index) in pending {
            StageRepo::register(&tx, task_id, index)?;
            log::info!("Registered task {} at stage {}", task_id, index);
            report.registered.push(task_id.to_string());
        }
        tx.commit().map_err(crate::repo::StoreError::from)?;

        for record in &records {
            if graph.find_task_index(&record.task_id).is_none() {
                log::warn!(
                    "task {} (stage {}) is no longer configured; its stage stays reserved",
                    record.task_id,
                    record.stage_index
                );
                report.missing.push(record.task_id.clone());
            }
        }

        Ok(report)
    }
}

use std::path::PathBuf;
use thiserror::Error;
use crate::repo::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config defines no tasks")]
    NoTasks,

    #[error("task {0} is defined twice")]
    DuplicateTask(String),

    #[error("task {task_id} does not have any classes or a compatible type")]
    NoClasses { task_id: String },

    #[error("task {task_id}: {message}")]
    InvalidTask { task_id: String, message: String },

    #[error(
        "task {task_id} is recorded at stage {recorded} but the config places it at stage {current}; \
         existing annotations are stored by stage position, so tasks must not be reordered"
    )]
    StageMismatch {
        task_id: String,
        recorded: usize,
        current: usize,
    },

    #[error("stage {stage_index} is recorded for task {recorded_task}, but the config places task {current_task} there")]
    StageTaken {
        stage_index: usize,
        recorded_task: String,
        current_task: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

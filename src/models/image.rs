use serde::{Deserialize, Serialize};

/// Ingested image, identified by the SHA-256 of its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub sha256: String,
    pub filename: String,
    pub ingested_ts: i64,
}

impl Image {
    pub fn new(sha256: String, filename: String) -> Self {
        Self {
            sha256,
            filename,
            ingested_ts: chrono::Utc::now().timestamp(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// One annotator's answer for one image at one stage
///
/// The natural key is `(image_sha256, username, stage_index)`; a later
/// submission for the same key overwrites `value` and `annotated_ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Option<i64>,
    pub image_sha256: String,
    pub username: String,
    pub stage_index: usize,
    pub value: String,
    pub annotated_ts: i64,
}

/// Store-wide annotation counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationStats {
    pub annotated_images: usize,
    pub total_annotations: usize,
    pub total_users: usize,
}

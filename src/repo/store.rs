use rusqlite::Connection;
use std::collections::HashSet;
use crate::models::{Annotation, Image};
use crate::repo::{AnnotationRepo, ImageRepo, StoreResult};

/// Persistence operations the scheduling engine depends on.
///
/// All lookups that mention a stage use any-annotator semantics. Listing
/// order must be stable across calls within one request.
pub trait AnnotationStore {
    fn count_images(&self) -> StoreResult<usize>;

    fn list_images(&self) -> StoreResult<Vec<Image>>;

    fn get_image(&self, sha256: &str) -> StoreResult<Option<Image>>;

    fn count_unannotated_at_stage(&self, stage_index: usize) -> StoreResult<usize>;

    fn annotation_exists_at_stage(&self, sha256: &str, stage_index: usize) -> StoreResult<bool>;

    /// Hashes with at least one answer equal to `value` at the stage
    fn image_hashes_with_value_at_stage(&self, stage_index: usize, value: &str) -> StoreResult<HashSet<String>>;

    /// Hashes with any answer at the stage
    fn image_hashes_annotated_at_stage(&self, stage_index: usize) -> StoreResult<HashSet<String>>;

    fn upsert_annotation(
        &self,
        sha256: &str,
        username: &str,
        stage_index: usize,
        value: &str,
    ) -> StoreResult<Annotation>;
}

/// SQLite-backed store borrowing one connection for the length of a request
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }
}

impl AnnotationStore for SqliteStore<'_> {
    fn count_images(&self) -> StoreResult<usize> {
        ImageRepo::count(self.conn)
    }

    fn list_images(&self) -> StoreResult<Vec<Image>> {
        ImageRepo::list(self.conn)
    }

    fn get_image(&self, sha256: &str) -> StoreResult<Option<Image>> {
        ImageRepo::get_by_sha256(self.conn, sha256)
    }

    fn count_unannotated_at_stage(&self, stage_index: usize) -> StoreResult<usize> {
        AnnotationRepo::count_unannotated_at_stage(self.conn, stage_index)
    }

    fn annotation_exists_at_stage(&self, sha256: &str, stage_index: usize) -> StoreResult<bool> {
        AnnotationRepo::exists_at_stage(self.conn, sha256, stage_index)
    }

    fn image_hashes_with_value_at_stage(&self, stage_index: usize, value: &str) -> StoreResult<HashSet<String>> {
        AnnotationRepo::image_hashes_with_value(self.conn, stage_index, value)
    }

    fn image_hashes_annotated_at_stage(&self, stage_index: usize) -> StoreResult<HashSet<String>> {
        AnnotationRepo::image_hashes_at_stage(self.conn, stage_index)
    }

    fn upsert_annotation(
        &self,
        sha256: &str,
        username: &str,
        stage_index: usize,
        value: &str,
    ) -> StoreResult<Annotation> {
        AnnotationRepo::upsert(self.conn, sha256, username, stage_index, value)
    }
}

// In-memory store that records how often each query runs

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use crate::models::{Annotation, Image};
use crate::repo::{AnnotationStore, StoreError, StoreResult};

#[derive(Default)]
pub struct CountingStore {
    images: Vec<Image>,
    annotations: RefCell<Vec<Annotation>>,
    list_calls: Cell<usize>,
    exists_calls: Cell<usize>,
    value_calls: Cell<usize>,
    fail: Cell<bool>,
    fail_count: Cell<bool>,
}

impl CountingStore {
    /// Images named `img0`, `img1`, ... in catalog order
    pub fn with_images(n: usize) -> Self {
        Self {
            images: (0..n)
                .map(|i| Image {
                    sha256: format!("img{}", i),
                    filename: format!("img{}.png", i),
                    ingested_ts: 1000 + i as i64,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn annotate(&self, sha256: &str, username: &str, stage_index: usize, value: &str) {
        self.upsert_annotation(sha256, username, stage_index, value).unwrap();
    }

    pub fn fail_queries(&self) {
        self.fail.set(true);
    }

    /// Fail only `count_images`
    pub fn fail_count_images(&self) {
        self.fail_count.set(true);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.get()
    }

    pub fn value_calls(&self) -> usize {
        self.value_calls.get()
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail.get() {
            return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl AnnotationStore for CountingStore {
    fn count_images(&self) -> StoreResult<usize> {
        self.check()?;
        if self.fail_count.get() {
            return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(self.images.len())
    }

    fn list_images(&self) -> StoreResult<Vec<Image>> {
        self.check()?;
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.images.clone())
    }

    fn get_image(&self, sha256: &str) -> StoreResult<Option<Image>> {
        self.check()?;
        Ok(self.images.iter().find(|img| img.sha256 == sha256).cloned())
    }

    fn count_unannotated_at_stage(&self, stage_index: usize) -> StoreResult<usize> {
        self.check()?;
        let annotated = self.image_hashes_annotated_at_stage(stage_index)?;
        Ok(self
            .images
            .iter()
            .filter(|img| !annotated.contains(&img.sha256))
            .count())
    }

    fn annotation_exists_at_stage(&self, sha256: &str, stage_index: usize) -> StoreResult<bool> {
        self.check()?;
        self.exists_calls.set(self.exists_calls.get() + 1);
        Ok(self
            .annotations
            .borrow()
            .iter()
            .any(|a| a.image_sha256 == sha256 && a.stage_index == stage_index))
    }

    fn image_hashes_with_value_at_stage(&self, stage_index: usize, value: &str) -> StoreResult<HashSet<String>> {
        self.check()?;
        self.value_calls.set(self.value_calls.get() + 1);
        Ok(self
            .annotations
            .borrow()
            .iter()
            .filter(|a| a.stage_index == stage_index && a.value == value)
            .map(|a| a.image_sha256.clone())
            .collect())
    }

    fn image_hashes_annotated_at_stage(&self, stage_index: usize) -> StoreResult<HashSet<String>> {
        self.check()?;
        Ok(self
            .annotations
            .borrow()
            .iter()
            .filter(|a| a.stage_index == stage_index)
            .map(|a| a.image_sha256.clone())
            .collect())
    }

    fn upsert_annotation(
        &self,
        sha256: &str,
        username: &str,
        stage_index: usize,
        value: &str,
    ) -> StoreResult<Annotation> {
        self.check()?;
        let mut annotations = self.annotations.borrow_mut();
        if let Some(existing) = annotations.iter_mut().find(|a| {
            a.image_sha256 == sha256 && a.username == username && a.stage_index == stage_index
        }) {
            existing.value = value.to_string();
            return Ok(existing.clone());
        }
        let annotation = Annotation {
            id: Some(annotations.len() as i64 + 1),
            image_sha256: sha256.to_string(),
            username: username.to_string(),
            stage_index,
            value: value.to_string(),
            annotated_ts: 2000,
        };
        annotations.push(annotation.clone());
        Ok(annotation)
    }
}

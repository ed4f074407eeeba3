use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use crate::engine::{Annotator, EngineResult, RequestContext};
use crate::repo::{AnnotationStore, StoreError};

/// The next image to show an annotator, and for which task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationStep {
    pub task_id: String,
    pub image_sha256: String,
    pub image_filename: String,
}

impl<S: AnnotationStore> Annotator<S> {
    /// Pick the next (task, image) pair.
    ///
    /// With a task id, only that task is considered and `None` means the
    /// task is done. Without one, tasks are tried in stage order and `None`
    /// means every task is done.
    pub fn next_step(&self, ctx: &RequestContext, task_id: Option<&str>) -> EngineResult<Option<AnnotationStep>> {
        self.next_step_with_rng(ctx, task_id, &mut rand::thread_rng())
    }

    pub fn next_step_with_rng<R: Rng + ?Sized>(
        &self,
        ctx: &RequestContext,
        task_id: Option<&str>,
        rng: &mut R,
    ) -> EngineResult<Option<AnnotationStep>> {
        let Some(task_id) = task_id else {
            for task in self.graph.tasks() {
                if let Some(step) = self.next_step_for_task(ctx, &task.id, rng)? {
                    return Ok(Some(step));
                }
            }
            log::debug!("All tasks are done");
            return Ok(None);
        };
        self.next_step_for_task(ctx, task_id, rng)
    }

    /// Scan the catalog in order, keep the first `offset_advance` images
    /// that are eligible and unanswered, and pick one of them at random.
    /// The pick is uniform over that prefix, not over every eligible image.
    fn next_step_for_task<R: Rng + ?Sized>(
        &self,
        ctx: &RequestContext,
        task_id: &str,
        rng: &mut R,
    ) -> EngineResult<Option<AnnotationStep>> {
        let (stage_index, task) = self.stage(task_id)?;
        let sets = self.resolve_dependency_sets(ctx, task)?;
        let images = ctx.images(&self.store)?;

        let mut candidates: Vec<&str> = Vec::with_capacity(self.offset_advance.min(images.len()));
        for img in images {
            if !sets.admits(&img.sha256) {
                continue;
            }
            ctx.checkpoint()?;
            if self.store.annotation_exists_at_stage(&img.sha256, stage_index)? {
                continue;
            }
            candidates.push(&img.sha256);
            if candidates.len() >= self.offset_advance {
                break;
            }
        }

        let Some(&selected) = candidates.choose(rng) else {
            log::debug!("task {}: no available images", task_id);
            return Ok(None);
        };

        ctx.checkpoint()?;
        let image = self
            .store
            .get_image(selected)?
            .ok_or_else(|| StoreError::ImageNotFound(selected.to_string()))?;

        Ok(Some(AnnotationStep {
            task_id: task_id.to_string(),
            image_sha256: image.sha256,
            image_filename: image.filename,
        }))
    }
}

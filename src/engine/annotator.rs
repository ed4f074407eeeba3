use serde::Serialize;
use std::sync::Arc;
use crate::engine::{AnnotationStep, EngineError, EngineResult, PhaseProgress, RequestContext};
use crate::models::Annotation;
use crate::repo::{AnnotationStore, StoreError};
use crate::workflow::{Task, TaskGraph};

/// Candidates collected before the random pick
pub const DEFAULT_OFFSET_ADVANCE: usize = 10;

/// Scheduling engine over one task graph and one store.
///
/// The graph is loaded once and shared; the store is whatever the current
/// request owns (for SQLite, a borrowed connection). Every operation takes
/// the request's `RequestContext`.
pub struct Annotator<S> {
    pub(crate) graph: Arc<TaskGraph>,
    pub(crate) store: S,
    pub(crate) offset_advance: usize,
}

/// Where an annotator goes after submitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Advance {
    SameTask(AnnotationStep),
    NextTask(AnnotationStep),
    AllDone,
}

/// Per-task dashboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOverview {
    pub task_id: String,
    pub name: String,
    pub short_name: String,
    pub available: usize,
    pub eligible: usize,
    pub completed: usize,
    pub progress: PhaseProgress,
}

impl<S: AnnotationStore> Annotator<S> {
    pub fn new(graph: Arc<TaskGraph>, store: S) -> Self {
        Self {
            graph,
            store,
            offset_advance: DEFAULT_OFFSET_ADVANCE,
        }
    }

    /// Candidate cap for `next_step`; zero restores the default
    pub fn with_offset_advance(mut self, offset_advance: usize) -> Self {
        self.offset_advance = if offset_advance == 0 {
            DEFAULT_OFFSET_ADVANCE
        } else {
            offset_advance
        };
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn offset_advance(&self) -> usize {
        self.offset_advance
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.graph.get_task(task_id)
    }

    pub(crate) fn stage(&self, task_id: &str) -> EngineResult<(usize, &Task)> {
        self.graph
            .stage(task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    /// Record `username`'s answer for an image at a task's stage.
    /// Resubmitting for the same (image, user, task) overwrites the value.
    pub fn submit_annotation(
        &self,
        ctx: &RequestContext,
        image_sha256: &str,
        task_id: &str,
        username: &str,
        value: &str,
    ) -> EngineResult<Annotation> {
        let (stage_index, _) = self.stage(task_id)?;
        ctx.checkpoint()?;
        let annotation = self
            .store
            .upsert_annotation(image_sha256, username, stage_index, value)?;
        log::debug!(
            "{} answered {}={} for {}",
            username,
            task_id,
            value,
            image_sha256
        );
        Ok(annotation)
    }

    /// Submit, then find the next step: same task first, then any task
    pub fn submit_and_advance(
        &self,
        ctx: &RequestContext,
        image_sha256: &str,
        task_id: &str,
        username: &str,
        value: &str,
    ) -> EngineResult<Advance> {
        self.submit_annotation(ctx, image_sha256, task_id, username, value)?;

        if let Some(step) = self.next_step(ctx, Some(task_id))? {
            return Ok(Advance::SameTask(step));
        }
        match self.next_step(ctx, None)? {
            Some(step) if step.task_id == task_id => Ok(Advance::SameTask(step)),
            Some(step) => Ok(Advance::NextTask(step)),
            None => Ok(Advance::AllDone),
        }
    }

    /// Filename of an ingested image
    pub fn image_filename(&self, ctx: &RequestContext, image_sha256: &str) -> EngineResult<String> {
        ctx.checkpoint()?;
        match self.store.get_image(image_sha256)? {
            Some(image) => Ok(image.filename),
            None => Err(StoreError::ImageNotFound(image_sha256.to_string()).into()),
        }
    }

    /// Counts and progress for every task in stage order.
    ///
    /// Informational: failures degrade to zero and are logged, except
    /// cancellation, which aborts the whole request.
    pub fn dashboard(&self, ctx: &RequestContext) -> EngineResult<Vec<TaskOverview>> {
        let mut rows = Vec::with_capacity(self.graph.len());
        for task in self.graph.tasks() {
            let available = match self.count_available(ctx, &task.id) {
                Ok(count) => count,
                Err(e @ (EngineError::Cancelled | EngineError::DeadlineExceeded)) => return Err(e),
                Err(e) => {
                    log::warn!("counting available images for {} failed: {}", task.id, e);
                    0
                }
            };
            let eligible = match self.count_eligible(ctx, &task.id) {
                Ok(count) => count,
                Err(e @ (EngineError::Cancelled | EngineError::DeadlineExceeded)) => return Err(e),
                Err(e) => {
                    log::warn!("counting eligible images for {} failed: {}", task.id, e);
                    0
                }
            };
            ctx.checkpoint()?;
            let progress = self.phase_progress_or_default(ctx, &task.id);

            rows.push(TaskOverview {
                task_id: task.id.clone(),
                name: task.name.clone(),
                short_name: task.short_name.clone(),
                available,
                eligible,
                completed: eligible.saturating_sub(available),
                progress,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::CountingStore;
    use crate::workflow::ProjectConfig;

    const TWO_STAGE: &str = "tasks:\n  - id: a\n    type: boolean\n  - id: b\n    type: boolean\n    if:\n      a: \"true\"\n";

    fn annotator(images: usize) -> Annotator<CountingStore> {
        let graph = Arc::new(ProjectConfig::parse(TWO_STAGE).unwrap().graph);
        Annotator::new(graph, CountingStore::with_images(images))
    }

    #[test]
    fn test_offset_advance_zero_means_default() {
        let annotator = annotator(1).with_offset_advance(0);
        assert_eq!(annotator.offset_advance(), DEFAULT_OFFSET_ADVANCE);
        let annotator = annotator.with_offset_advance(3);
        assert_eq!(annotator.offset_advance(), 3);
    }

    #[test]
    fn test_submit_unknown_task() {
        let annotator = annotator(1);
        let ctx = RequestContext::new();
        let result = annotator.submit_annotation(&ctx, "img0", "nonexistent", "alice", "true");
        assert!(matches!(result, Err(EngineError::TaskNotFound(id)) if id == "nonexistent"));
    }

    #[test]
    fn test_submit_uses_stage_index() {
        let annotator = annotator(1);
        let ctx = RequestContext::new();
        let annotation = annotator
            .submit_annotation(&ctx, "img0", "b", "alice", "false")
            .unwrap();
        assert_eq!(annotation.stage_index, 1);
    }

    #[test]
    fn test_submit_store_failure_is_surfaced() {
        let annotator = annotator(1);
        annotator.store().fail_queries();
        let ctx = RequestContext::new();
        let result = annotator.submit_annotation(&ctx, "img0", "a", "alice", "true");
        assert!(matches!(result, Err(EngineError::Store(_))));
    }

    #[test]
    fn test_submit_and_advance_moves_to_next_task() {
        let annotator = annotator(1);
        let ctx = RequestContext::new();

        let advance = annotator
            .submit_and_advance(&ctx, "img0", "a", "alice", "true")
            .unwrap();
        match advance {
            Advance::NextTask(step) => {
                assert_eq!(step.task_id, "b");
                assert_eq!(step.image_sha256, "img0");
            }
            other => panic!("expected NextTask, got {:?}", other),
        }

        let done = annotator
            .submit_and_advance(&ctx, "img0", "b", "alice", "true")
            .unwrap();
        assert_eq!(done, Advance::AllDone);
    }

    #[test]
    fn test_submit_and_advance_stays_on_task() {
        let annotator = annotator(2);
        let ctx = RequestContext::new();
        let advance = annotator
            .submit_and_advance(&ctx, "img0", "a", "alice", "false")
            .unwrap();
        assert!(matches!(advance, Advance::SameTask(step) if step.image_sha256 == "img1"));
    }

    #[test]
    fn test_image_filename() {
        let annotator = annotator(1);
        let ctx = RequestContext::new();
        assert_eq!(annotator.image_filename(&ctx, "img0").unwrap(), "img0.png");
        assert!(matches!(
            annotator.image_filename(&ctx, "missing"),
            Err(EngineError::Store(StoreError::ImageNotFound(_)))
        ));
    }

    #[test]
    fn test_dashboard_rows() {
        let annotator = annotator(3);
        annotator.store().annotate("img0", "alice", 0, "true");
        annotator.store().annotate("img1", "alice", 0, "false");
        let ctx = RequestContext::new();

        let rows = annotator.dashboard(&ctx).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].task_id, "a");
        assert_eq!(rows[0].eligible, 3);
        assert_eq!(rows[0].available, 1);
        assert_eq!(rows[0].completed, 2);

        assert_eq!(rows[1].eligible, 1);
        assert_eq!(rows[1].available, 1);
        assert_eq!(rows[1].progress.filtered_wrong_class, 1);
        assert_eq!(rows[1].progress.not_yet_annotated, 1);
    }

    #[test]
    fn test_dashboard_degrades_to_zero_on_store_error() {
        let annotator = annotator(3);
        annotator.store().fail_queries();
        let ctx = RequestContext::new();

        let rows = annotator.dashboard(&ctx).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.available == 0 && r.eligible == 0));
        assert_eq!(rows[0].progress, PhaseProgress::default());
    }

    #[test]
    fn test_dashboard_eligible_failure_is_zero() {
        let annotator = annotator(3);
        annotator.store().annotate("img0", "alice", 0, "true");
        annotator.store().fail_count_images();
        let ctx = RequestContext::new();

        let rows = annotator.dashboard(&ctx).unwrap();
        assert_eq!(rows[0].available, 2);
        assert_eq!(rows[0].eligible, 0);
        assert_eq!(rows[0].completed, 0);
    }

    #[test]
    fn test_dashboard_cancelled_is_error() {
        let annotator = annotator(3);
        let ctx = RequestContext::new();
        ctx.cancel_token().cancel();
        assert!(matches!(annotator.dashboard(&ctx), Err(EngineError::Cancelled)));
    }
}

use std::collections::HashSet;
use crate::engine::{Annotator, EngineResult, RequestContext};
use crate::repo::AnnotationStore;

impl<S: AnnotationStore> Annotator<S> {
    /// Images meeting every dependency condition of the task, whether or
    /// not they have been answered at its stage.
    pub fn count_eligible(&self, ctx: &RequestContext, task_id: &str) -> EngineResult<usize> {
        let (_, task) = self.stage(task_id)?;

        if task.is_unconditional() {
            ctx.checkpoint()?;
            return Ok(self.store.count_images()?);
        }

        let sets = self.resolve_dependency_sets(ctx, task)?;
        let images = ctx.images(&self.store)?;
        Ok(images.iter().filter(|img| sets.admits(&img.sha256)).count())
    }

    /// Eligible images that no annotator has answered at the task's stage
    pub fn count_available(&self, ctx: &RequestContext, task_id: &str) -> EngineResult<usize> {
        let (stage_index, task) = self.stage(task_id)?;

        if task.is_unconditional() {
            ctx.checkpoint()?;
            return Ok(self.store.count_unannotated_at_stage(stage_index)?);
        }

        let sets = self.resolve_dependency_sets(ctx, task)?;
        let images = ctx.images(&self.store)?;
        let answered = self.answered_at_stage(ctx, stage_index)?;
        Ok(images
            .iter()
            .filter(|img| sets.admits(&img.sha256) && !answered.contains(&img.sha256))
            .count())
    }

    /// Images with any answer at the stage, fetched in one query
    pub(crate) fn answered_at_stage(&self, ctx: &RequestContext, stage_index: usize) -> EngineResult<HashSet<String>> {
        ctx.checkpoint()?;
        Ok(self.store.image_hashes_annotated_at_stage(stage_index)?)
    }
}

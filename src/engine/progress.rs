use serde::Serialize;
use std::collections::HashSet;
use crate::engine::{Annotator, EngineResult, RequestContext};
use crate::repo::AnnotationStore;

/// Where every image in the dataset stands relative to one task.
///
/// `completed + pending + filtered_wrong_class + not_yet_annotated == total`.
/// Percentages are of `total` and are all zero for an empty dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseProgress {
    /// Eligible and answered at this stage
    pub completed: usize,
    /// Eligible and not yet answered
    pub pending: usize,
    /// Answered at a dependency stage, but with a disqualifying value
    pub filtered_wrong_class: usize,
    /// No answer yet at any dependency stage
    pub not_yet_annotated: usize,
    pub total: usize,
    pub completed_percent: f64,
    pub pending_percent: f64,
    pub filtered_percent: f64,
    pub not_yet_annotated_percent: f64,
}

impl PhaseProgress {
    fn new(completed: usize, pending: usize, filtered_wrong_class: usize, not_yet_annotated: usize, total: usize) -> Self {
        Self {
            completed,
            pending,
            filtered_wrong_class,
            not_yet_annotated,
            total,
            completed_percent: percent(completed, total),
            pending_percent: percent(pending, total),
            filtered_percent: percent(filtered_wrong_class, total),
            not_yet_annotated_percent: percent(not_yet_annotated, total),
        }
    }

    /// Images not eligible for the task
    pub fn not_eligible(&self) -> usize {
        self.filtered_wrong_class + self.not_yet_annotated
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl<S: AnnotationStore> Annotator<S> {
    /// Split the whole dataset into completed, pending, filtered and
    /// not-yet-reached buckets for a task.
    pub fn phase_progress(&self, ctx: &RequestContext, task_id: &str) -> EngineResult<PhaseProgress> {
        let (stage_index, task) = self.stage(task_id)?;

        if task.is_unconditional() {
            ctx.checkpoint()?;
            let total = self.store.count_images()?;
            ctx.checkpoint()?;
            let pending = self.store.count_unannotated_at_stage(stage_index)?.min(total);
            return Ok(PhaseProgress::new(total - pending, pending, 0, 0, total));
        }

        // Every bucket is derived from one catalog snapshot so they always
        // sum to the total, even if images are ingested mid-request
        let sets = self.resolve_dependency_sets(ctx, task)?;
        let images = ctx.images(&self.store)?;
        let answered = self.answered_at_stage(ctx, stage_index)?;

        let mut gate_answered: Vec<HashSet<String>> = Vec::with_capacity(task.dependencies.len());
        for dep_task_id in task.dependencies.keys() {
            if let Some(dep_stage) = self.graph.find_task_index(dep_task_id) {
                gate_answered.push(self.answered_at_stage(ctx, dep_stage)?);
            }
        }

        let (mut completed, mut pending, mut filtered, mut not_yet) = (0, 0, 0, 0);
        for img in images {
            if sets.admits(&img.sha256) {
                if answered.contains(&img.sha256) {
                    completed += 1;
                } else {
                    pending += 1;
                }
            } else if gate_answered.iter().any(|hashes| hashes.contains(&img.sha256)) {
                filtered += 1;
            } else {
                not_yet += 1;
            }
        }

        Ok(PhaseProgress::new(completed, pending, filtered, not_yet, images.len()))
    }

    /// `phase_progress` for display: any failure is logged and replaced by
    /// an all-zero progress so rendering never blocks annotation
    pub fn phase_progress_or_default(&self, ctx: &RequestContext, task_id: &str) -> PhaseProgress {
        match self.phase_progress(ctx, task_id) {
            Ok(progress) => progress,
            Err(e) => {
                log::warn!("phase progress for {} unavailable: {}", task_id, e);
                PhaseProgress::default()
            }
        }
    }
}

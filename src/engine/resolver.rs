use std::collections::{HashMap, HashSet};
use crate::engine::{Annotator, EngineResult, RequestContext};
use crate::repo::AnnotationStore;
use crate::workflow::Task;

/// Images satisfying each of a task's dependency conditions.
///
/// Built once per task evaluation and then probed per image. A dependency
/// naming an unknown task has no entry, so no image satisfies it.
#[derive(Debug, Clone, Default)]
pub struct DependencySets {
    required: Vec<String>,
    sets: HashMap<String, HashSet<String>>,
}

impl DependencySets {
    /// Whether the image meets every condition of the task
    pub fn admits(&self, image_sha256: &str) -> bool {
        self.required.iter().all(|dep| {
            self.sets
                .get(dep)
                .map_or(false, |hashes| hashes.contains(image_sha256))
        })
    }

    /// Matching images for one dependency, if it resolved
    pub fn get(&self, dep_task_id: &str) -> Option<&HashSet<String>> {
        self.sets.get(dep_task_id)
    }

    pub fn is_unconditional(&self) -> bool {
        self.required.is_empty()
    }
}

impl<S: AnnotationStore> Annotator<S> {
    /// One bulk query per dependency: images whose answer at the
    /// dependency's stage equals the required value, from any annotator.
    pub fn resolve_dependency_sets(&self, ctx: &RequestContext, task: &Task) -> EngineResult<DependencySets> {
        let mut resolved = DependencySets {
            required: task.dependencies.keys().cloned().collect(),
            sets: HashMap::with_capacity(task.dependencies.len()),
        };

        for (dep_task_id, required_value) in &task.dependencies {
            let Some(dep_stage) = self.graph.find_task_index(dep_task_id) else {
                log::debug!("task {}: skipping unknown dependency {}", task.id, dep_task_id);
                continue;
            };

            ctx.checkpoint()?;
            let hashes = self
                .store
                .image_hashes_with_value_at_stage(dep_stage, required_value)?;
            resolved.sets.insert(dep_task_id.clone(), hashes);
        }

        Ok(resolved)
    }
}

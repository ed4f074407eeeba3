use crate::workflow::Task;

/// Ordered, immutable task list loaded once at startup.
///
/// A task's position is its stage index, the key annotation rows are stored
/// under. Lookups are linear; workflows have tens of tasks, not thousands.
/// Share it across requests behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Stage index of a task, or `None` if the id is unknown
    pub fn find_task_index(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == task_id)
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Task and its stage index
    pub fn stage(&self, task_id: &str) -> Option<(usize, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .find(|(_, task)| task.id == task_id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Dependency ids of `task` that name no task in this graph
    pub fn unresolved_dependencies<'a>(&self, task: &'a Task) -> Vec<&'a str> {
        task.dependencies
            .keys()
            .filter(|dep| self.find_task_index(dep).is_none())
            .map(|dep| dep.as_str())
            .collect()
    }
}

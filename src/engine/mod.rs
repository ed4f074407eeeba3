//! Task-dependency resolution and scheduling.
//!
//! Given the ordered task graph and an [`AnnotationStore`](crate::repo::AnnotationStore),
//! the engine decides which images are eligible for a task (every
//! dependency answered with the required value, by any annotator), which of
//! those are still available (no answer yet at the task's stage), how the
//! whole dataset splits into progress buckets, and which image to serve next.
//!
//! Everything runs synchronously inside one request; a [`RequestContext`]
//! carries cancellation, an optional deadline, and the request-scoped
//! image catalog cache.

pub mod annotator;
pub mod context;
pub mod eligibility;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use annotator::*;
pub use context::*;
pub use error::*;
pub use progress::*;
pub use resolver::*;
pub use scheduler::*;

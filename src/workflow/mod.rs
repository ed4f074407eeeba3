// Task workflow: configuration, ordered task graph, stage registry

pub mod config;
pub mod error;
pub mod graph;
pub mod registry;
pub mod task;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use registry::*;
pub use task::*;

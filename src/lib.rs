//! Tagflow - staged image annotation with dependent tasks
//!
//! This library provides:
//! - Project configuration and the ordered task graph
//! - Database operations and migrations for images and annotations
//! - Repository layer for data access
//! - The scheduling engine: dependency resolution, eligibility and
//!   availability counts, phase progress, and next-step selection
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagflow::db::DbConnection;
//! use tagflow::engine::{Annotator, RequestContext};
//! use tagflow::repo::SqliteStore;
//! use tagflow::workflow::ProjectConfig;
//!
//! let config = ProjectConfig::load("config.yaml".as_ref()).unwrap();
//! let graph = Arc::new(config.graph);
//! let conn = DbConnection::connect_in_memory().unwrap();
//!
//! let annotator = Annotator::new(graph, SqliteStore::new(&conn));
//! let ctx = RequestContext::new();
//! match annotator.next_step(&ctx, None).unwrap() {
//!     Some(step) => println!("annotate {} for {}", step.image_filename, step.task_id),
//!     None => println!("All annotations are done!"),
//! }
//! ```

pub mod db;
pub mod models;
pub mod repo;
pub mod workflow;
pub mod engine;
pub mod cli;
pub mod utils;

// Persisted domain entities

pub mod image;
pub mod annotation;

pub use image::*;
pub use annotation::*;

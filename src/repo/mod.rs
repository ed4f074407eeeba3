pub mod error;
pub mod image;
pub mod annotation;
pub mod stage;
pub mod store;

pub use error::*;
pub use image::*;
pub use annotation::*;
pub use stage::*;
pub use store::*;

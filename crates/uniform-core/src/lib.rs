pub mod error;
pub mod model;
pub mod plan;
pub mod planner;
pub mod template;
pub mod transform;

pub use error::{Result, UniformError};

pub mod api;
pub mod config;
pub mod deleter;
pub mod detector;
pub mod error;
pub mod progress;
pub mod retry;
pub mod workflow;

pub use error::{CleanupError, Result};

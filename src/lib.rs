//! Prepares forum participation posts for a static front end.
//!
//! Raw threads are normalized to plain text, annotated with heuristic
//! metrics, linked back to the forum and published as one JSON array.

pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod files;
pub mod link;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod summary;

pub use error::{PipelineError, RecordError};

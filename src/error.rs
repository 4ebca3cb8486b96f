use std::path::PathBuf;

use thiserror::Error;

/// Why a single raw thread could not become a post. Never fatal to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a non-negative integer: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("record is not a JSON object")]
    NotAnObject,
}

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read input {}: {reason}", path.display())]
    MissingInput { path: PathBuf, reason: String },

    #[error("duplicate {field} {value} at input records #{first} and #{second}")]
    DatasetIntegrity {
        field: &'static str,
        value: u64,
        first: usize,
        second: usize,
    },

    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<config::ConfigError> for PipelineError {
    fn from(e: config::ConfigError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

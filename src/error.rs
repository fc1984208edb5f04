//! Error type shared by the pipeline stages and the snapshot cache.

/// Failures raised while reading, transforming or caching turnstile data.
///
/// Every variant is fatal for a run; there is no partial-success mode.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
    #[error("turnstile key needs exactly 4 fields, got {}: {fields:?}", .fields.len())]
    InvalidKey { fields: Vec<String> },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        PipelineError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

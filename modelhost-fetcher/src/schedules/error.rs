use modelhost_spec::spec::FieldErrors;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while building or reading scheduled output.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule output format: {0}")]
    InvalidFormat(FieldErrors),

    #[error("data frame has no 'timestamp' column")]
    MissingTimestampColumn,

    #[error("alias '{0}' has been provided more than once")]
    DuplicateAlias(String),

    #[error("'{0}' is not a valid alias")]
    InvalidAlias(String),

    #[error("timestamp {timestamp} of output alias '{alias}' overflows when shifted by {offset} ms")]
    TimestampOverflow {
        alias: String,
        timestamp: i64,
        offset: i64,
    },

    #[error("timestamps for aliases {0:?} are not aligned")]
    NotAligned(Vec<String>),

    #[error("malformed schedule output JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame error: {0}")]
    Frame(#[from] PolarsError),
}

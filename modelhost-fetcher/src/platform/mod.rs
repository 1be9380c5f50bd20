//! Platform client trait and structured error types.
//!
//! The PlatformClient trait abstracts over where datapoints and files come from
//! (the hosted platform, a local Parquet store, an in-memory fixture) so fetchers
//! never know which one they are talking to.

pub mod memory;
pub mod parquet_store;
pub mod query;

pub use memory::InMemoryPlatform;
pub use parquet_store::ParquetStore;

use modelhost_spec::{Aggregate, Granularity, TimeSeriesSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observation of a time series (or one aggregate bucket).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: i64,
    pub value: f64,
}

impl Datapoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(i64, f64)> for Datapoint {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self { timestamp, value }
    }
}

/// A request for the datapoints of one time series over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatapointsQuery {
    pub id: i64,
    pub start: i64,
    pub end: i64,
    pub aggregate: Option<Aggregate>,
    pub granularity: Option<Granularity>,
    pub include_outside_points: bool,
}

impl From<&TimeSeriesSpec> for DatapointsQuery {
    fn from(spec: &TimeSeriesSpec) -> Self {
        Self {
            id: spec.id(),
            start: spec.start(),
            end: spec.end(),
            aggregate: spec.aggregate(),
            granularity: spec.granularity().cloned(),
            include_outside_points: spec.include_outside_points().unwrap_or(false),
        }
    }
}

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: i64,
    pub name: String,
    pub size: u64,
}

/// Structured error types for platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("time series {id} not found")]
    TimeSeriesNotFound { id: i64 },

    #[error("file {id} not found")]
    FileNotFound { id: i64 },

    #[error("aggregate '{0}' is not supported by this platform client")]
    UnsupportedAggregate(Aggregate),

    #[error("{message} | code: {code} | X-Request-ID: {}", request_id.as_deref().unwrap_or("-"))]
    Api {
        message: String,
        code: u16,
        request_id: Option<String>,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Retrieval capability the fetchers delegate to.
///
/// Implementations return datapoints sorted by timestamp ascending.
pub trait PlatformClient: Send + Sync {
    /// Human-readable name of this client.
    fn name(&self) -> &str;

    fn retrieve_datapoints(&self, query: &DatapointsQuery) -> Result<Vec<Datapoint>, PlatformError>;

    /// Full contents of a file.
    fn download_file(&self, id: i64) -> Result<Vec<u8>, PlatformError>;

    fn file_info(&self, id: i64) -> Result<FileInfo, PlatformError>;
}

//! Model Hosting data fetcher: resolves data specs against a platform client.
//!
//! - `platform`: the [`PlatformClient`] trait plus an in-memory fixture and a
//!   local Parquet store
//! - `frame`: datapoints ↔ polars frames, timestamp alignment
//! - `fetcher`: [`DataFetcher`] with its time series and file sub-fetchers
//! - `schedules`: building and binding the output of scheduled jobs
//! - `config`: TOML configuration

pub mod config;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod platform;
pub mod schedules;

pub use config::{ConfigError, FetcherConfig};
pub use error::FetchError;
pub use fetcher::{DataFetcher, FileFetcher, TimeSeriesFetcher};
pub use platform::{
    Datapoint, DatapointsQuery, FileInfo, InMemoryPlatform, ParquetStore, PlatformClient,
    PlatformError,
};
pub use schedules::{to_output, OutputSeries, ScheduleError, ScheduleOutput};

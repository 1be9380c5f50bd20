//! Model Hosting data specs: declarative descriptions of the time series and
//! files a hosted model reads and writes.
//!
//! This crate contains the spec layer only:
//! - Time expressions (`"5m"`, `"3d-ago"`, datetimes) resolved to epoch milliseconds
//! - Aggregate names and granularities
//! - Validated spec types with a camelCase JSON wire form
//! - Schedule specs that expand into one data spec per window
//!
//! Retrieval lives in `modelhost-fetcher`.

pub mod aggregate;
pub mod granularity;
pub mod spec;
pub mod time;

pub use aggregate::{Aggregate, UnknownAggregate};
pub use granularity::Granularity;
pub use spec::{
    DataSpec, FileSpec, ScheduleDataSpec, ScheduleInputSpec, ScheduleInputTimeSeriesSpec,
    ScheduleOutputSpec, ScheduleOutputTimeSeriesSpec, Spec, SpecDocument, SpecError, SpecRef,
    TimeSeriesSpec,
};
pub use time::{calculate_windows, SpanInput, TimeError, TimeInput};

//! Output side of scheduled jobs.
//!
//! A scheduled model returns frames keyed by a `timestamp` column; each other
//! column names an output alias. [`to_output`] turns those frames into a
//! [`ScheduleOutput`] document, and [`ScheduleOutput::bind`] maps its aliases
//! onto the target series of a [`ScheduleOutputSpec`](modelhost_spec::ScheduleOutputSpec).

pub mod error;
pub mod output;

pub use error::ScheduleError;
pub use output::{OutputSeries, ScheduleOutput};

use crate::frame::{frame_points, has_timestamp_column, value_columns};
use log::warn;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

/// Collect the value columns of `frames` into a schedule output.
///
/// Nulls and non-finite values are dropped.
pub fn to_output(frames: &[DataFrame]) -> Result<ScheduleOutput, ScheduleError> {
    let mut time_series = BTreeMap::new();

    for df in frames {
        if !has_timestamp_column(df) {
            return Err(ScheduleError::MissingTimestampColumn);
        }
        for alias in value_columns(df) {
            if time_series.contains_key(&alias) {
                return Err(ScheduleError::DuplicateAlias(alias));
            }
            let points = frame_points(df, &alias)?;
            let total = points.len();
            let finite: Vec<_> = points.into_iter().filter(|p| p.value.is_finite()).collect();
            if finite.len() < total {
                warn!(
                    "dropped {} non-finite values from output alias '{alias}'",
                    total - finite.len()
                );
            }
            time_series.insert(alias, finite);
        }
    }

    Ok(ScheduleOutput::from_series(time_series))
}

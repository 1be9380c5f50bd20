//! The output document of a scheduled job.
//!
//! Wire form: `{"timeSeries": {"<alias>": [[t0, v0], [t1, v1], ...]}}`. Unknown
//! top-level keys are ignored on load.

use super::error::ScheduleError;
use crate::frame::{align_frames, datapoints_frame};
use crate::platform::Datapoint;
use modelhost_spec::spec::{FieldErrors, ScheduleOutputSpec};
use polars::prelude::DataFrame;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const TIME_SERIES_KEY: &str = "timeSeries";

/// Validated output of one scheduled run: alias → datapoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOutput {
    time_series: BTreeMap<String, Vec<Datapoint>>,
}

/// Output datapoints bound to their target series, shifted by the spec offset.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSeries {
    pub alias: String,
    pub id: i64,
    pub points: Vec<Datapoint>,
}

impl ScheduleOutput {
    pub(crate) fn from_series(time_series: BTreeMap<String, Vec<Datapoint>>) -> Self {
        Self { time_series }
    }

    /// Validate an output document.
    pub fn load(value: Value) -> Result<Self, ScheduleError> {
        let mut errors = FieldErrors::new();

        let Value::Object(mut document) = value else {
            errors.add("_schema", "invalid input type");
            return Err(ScheduleError::InvalidFormat(errors));
        };

        let mut time_series = BTreeMap::new();
        match document.remove(TIME_SERIES_KEY) {
            None => {}
            Some(Value::Object(entries)) => {
                let mut alias_errors = FieldErrors::new();
                for (alias, series) in entries {
                    match parse_series(series) {
                        Ok(points) => {
                            time_series.insert(alias, points);
                        }
                        Err(series_errors) => alias_errors.nest(alias, series_errors),
                    }
                }
                errors.nest(TIME_SERIES_KEY, alias_errors);
            }
            Some(_) => errors.add(TIME_SERIES_KEY, "not a valid mapping type"),
        }

        errors
            .into_result(Self { time_series })
            .map_err(ScheduleError::InvalidFormat)
    }

    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        Self::load(serde_json::from_str(json)?)
    }

    pub fn to_value(&self) -> Result<Value, ScheduleError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.time_series.keys().map(|alias| alias.as_str()).collect()
    }

    pub fn points(&self, alias: &str) -> Result<&[Datapoint], ScheduleError> {
        self.time_series
            .get(alias)
            .map(|points| points.as_slice())
            .ok_or_else(|| ScheduleError::InvalidAlias(alias.to_string()))
    }

    /// `timestamp` plus one column named after the alias.
    pub fn get_datapoints(&self, alias: &str) -> Result<DataFrame, ScheduleError> {
        Ok(datapoints_frame(self.points(alias)?, alias)?)
    }

    pub fn get_datapoints_many<A: AsRef<str>>(
        &self,
        aliases: &[A],
    ) -> Result<BTreeMap<String, DataFrame>, ScheduleError> {
        aliases
            .iter()
            .map(|alias| {
                let alias = alias.as_ref();
                Ok((alias.to_string(), self.get_datapoints(alias)?))
            })
            .collect()
    }

    /// One frame with a column per alias. Every alias must carry exactly the
    /// same timestamps.
    pub fn get_dataframe<A: AsRef<str>>(&self, aliases: &[A]) -> Result<DataFrame, ScheduleError> {
        let series = aliases
            .iter()
            .map(|alias| Ok((alias.as_ref(), self.points(alias.as_ref())?.to_vec())))
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        let timestamps = |points: &[Datapoint]| points.iter().map(|p| p.timestamp).collect::<Vec<_>>();
        if let Some((_, first)) = series.first() {
            let reference = timestamps(first);
            if series.iter().any(|(_, points)| timestamps(points) != reference) {
                return Err(ScheduleError::NotAligned(
                    aliases.iter().map(|a| a.as_ref().to_string()).collect(),
                ));
            }
        }

        Ok(align_frames(&series)?)
    }

    /// Attach every output alias to its target series from `spec`.
    pub fn bind(&self, spec: &ScheduleOutputSpec) -> Result<Vec<OutputSeries>, ScheduleError> {
        self.time_series
            .iter()
            .map(|(alias, points)| {
                let target = spec
                    .get(alias)
                    .ok_or_else(|| ScheduleError::InvalidAlias(alias.clone()))?;
                let offset = target.offset();
                let points = points
                    .iter()
                    .map(|p| {
                        p.timestamp
                            .checked_add(offset)
                            .map(|timestamp| Datapoint::new(timestamp, p.value))
                            .ok_or_else(|| ScheduleError::TimestampOverflow {
                                alias: alias.clone(),
                                timestamp: p.timestamp,
                                offset,
                            })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(OutputSeries {
                    alias: alias.clone(),
                    id: target.id(),
                    points,
                })
            })
            .collect()
    }
}

fn parse_series(series: Value) -> Result<Vec<Datapoint>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let Value::Array(items) = series else {
        errors.add("_schema", "not a valid list");
        return Err(errors);
    };

    let mut points = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_point(item) {
            Ok(point) => points.push(point),
            Err(message) => errors.add(index.to_string(), message),
        }
    }
    errors.into_result(points)
}

fn parse_point(item: &Value) -> Result<Datapoint, &'static str> {
    const NOT_A_PAIR: &str = "must be a [timestamp, value] pair of numbers";

    let [t, v] = item.as_array().map(|pair| pair.as_slice()).ok_or(NOT_A_PAIR)? else {
        return Err(NOT_A_PAIR);
    };
    let value = v.as_f64().ok_or(NOT_A_PAIR)?;
    let timestamp = parse_timestamp(t).ok_or("timestamp is not a number of milliseconds in range")?;
    Ok(Datapoint::new(timestamp, value))
}

/// Whole milliseconds; fractional timestamps are truncated.
fn parse_timestamp(t: &Value) -> Option<i64> {
    if let Some(ms) = t.as_i64() {
        return Some(ms);
    }
    let ms = t.as_f64()?;
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound
    (ms.is_finite() && ms >= i64::MIN as f64 && ms < i64::MAX as f64).then(|| ms.trunc() as i64)
}

impl Serialize for ScheduleOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(rename = "timeSeries")]
            time_series: BTreeMap<&'a str, Vec<(i64, f64)>>,
        }

        let wire = Wire {
            time_series: self
                .time_series
                .iter()
                .map(|(alias, points)| {
                    (
                        alias.as_str(),
                        points.iter().map(|p| (p.timestamp, p.value)).collect(),
                    )
                })
                .collect(),
        };
        wire.serialize(serializer)
    }
}

impl fmt::Display for ScheduleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

//! Time series specs.

use super::error::{FieldErrors, SpecError};
use super::wire::RawTimeSeriesSpec;
use super::SpecDocument;
use crate::aggregate::Aggregate;
use crate::granularity::Granularity;
use crate::time::{now_ms, TimeInput};
use serde::{Deserialize, Serialize};

/// One time series over a fixed `[start, end)` range in epoch milliseconds,
/// optionally aggregated into `granularity` buckets.
///
/// Invariants: `0 <= start < end`; `aggregate` and `granularity` are either both
/// set or both absent; outside points are never requested for aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeriesSpec", into = "RawTimeSeriesSpec")]
pub struct TimeSeriesSpec {
    id: i64,
    start: i64,
    end: i64,
    aggregate: Option<Aggregate>,
    granularity: Option<Granularity>,
    include_outside_points: Option<bool>,
}

impl TimeSeriesSpec {
    /// Raw datapoints for `id` between `start` and `end`.
    pub fn new(
        id: i64,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
    ) -> Result<Self, SpecError> {
        Self::builder(id, start, end).build()
    }

    pub fn builder(
        id: i64,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
    ) -> TimeSeriesSpecBuilder {
        TimeSeriesSpecBuilder {
            id,
            start: start.into(),
            end: end.into(),
            aggregate: None,
            granularity: None,
            include_outside_points: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn aggregate(&self) -> Option<Aggregate> {
        self.aggregate
    }

    pub fn granularity(&self) -> Option<&Granularity> {
        self.granularity.as_ref()
    }

    pub fn include_outside_points(&self) -> Option<bool> {
        self.include_outside_points
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }
}

/// Builder for [`TimeSeriesSpec`]; relative times resolve against one captured "now".
#[derive(Debug, Clone)]
pub struct TimeSeriesSpecBuilder {
    id: i64,
    start: TimeInput,
    end: TimeInput,
    aggregate: Option<String>,
    granularity: Option<String>,
    include_outside_points: Option<bool>,
}

impl TimeSeriesSpecBuilder {
    pub fn aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }

    pub fn granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = Some(granularity.into());
        self
    }

    pub fn include_outside_points(mut self, include: bool) -> Self {
        self.include_outside_points = Some(include);
        self
    }

    pub fn build(self) -> Result<TimeSeriesSpec, SpecError> {
        self.build_at(now_ms())
    }

    /// Build, resolving relative times against `now_ms`.
    pub fn build_at(self, now_ms: i64) -> Result<TimeSeriesSpec, SpecError> {
        let mut errors = FieldErrors::new();
        let start = resolve_field("start", &self.start, now_ms, &mut errors);
        let end = resolve_field("end", &self.end, now_ms, &mut errors);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let raw = RawTimeSeriesSpec {
            id: self.id,
            start,
            end,
            aggregate: self.aggregate,
            granularity: self.granularity,
            include_outside_points: self.include_outside_points,
        };
        Ok(TimeSeriesSpec::from_raw(raw)?)
    }
}

fn resolve_field(field: &str, input: &TimeInput, now_ms: i64, errors: &mut FieldErrors) -> i64 {
    input.resolve(now_ms).unwrap_or_else(|e| {
        errors.add(field, e.to_string());
        0
    })
}

/// Validated sampling options shared by fixed-range and scheduled time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sampling {
    pub aggregate: Option<Aggregate>,
    pub granularity: Option<Granularity>,
    pub include_outside_points: Option<bool>,
}

pub(crate) fn validate_sampling(
    aggregate: Option<String>,
    granularity: Option<String>,
    include_outside_points: Option<bool>,
    errors: &mut FieldErrors,
) -> Sampling {
    let parsed_granularity = granularity.as_deref().and_then(|text| {
        Granularity::parse(text)
            .map_err(|e| errors.add("granularity", e.to_string()))
            .ok()
    });

    let parsed_aggregate = match aggregate.as_deref() {
        Some(text) => {
            if granularity.is_none() {
                errors.add("granularity", "granularity must be specified for aggregates");
            }
            if include_outside_points == Some(true) {
                errors.add(
                    "includeOutsidePoints",
                    "can't include outside points for aggregates",
                );
            }
            text.parse::<Aggregate>()
                .map_err(|e| errors.add("aggregate", e.to_string()))
                .ok()
        }
        None => {
            if granularity.is_some() {
                errors.add("granularity", "granularity can only be specified for aggregates");
            }
            None
        }
    };

    Sampling {
        aggregate: parsed_aggregate,
        granularity: parsed_granularity,
        include_outside_points,
    }
}

impl SpecDocument for TimeSeriesSpec {
    type Raw = RawTimeSeriesSpec;

    fn from_raw(raw: RawTimeSeriesSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        if raw.start < 0 {
            errors.add("start", "timestamps can't be negative");
        }
        if raw.end < 0 {
            errors.add("end", "timestamps can't be negative");
        }
        if raw.end <= raw.start {
            errors.add("end", "end must be after start");
        }

        let sampling = validate_sampling(
            raw.aggregate,
            raw.granularity,
            raw.include_outside_points,
            &mut errors,
        );

        errors.into_result(TimeSeriesSpec {
            id: raw.id,
            start: raw.start,
            end: raw.end,
            aggregate: sampling.aggregate,
            granularity: sampling.granularity,
            include_outside_points: sampling.include_outside_points,
        })
    }

    fn to_raw(&self) -> RawTimeSeriesSpec {
        RawTimeSeriesSpec {
            id: self.id,
            start: self.start,
            end: self.end,
            aggregate: self.aggregate.map(String::from),
            granularity: self.granularity.as_ref().map(|g| g.as_str().to_string()),
            include_outside_points: self.include_outside_points,
        }
    }
}

impl TryFrom<RawTimeSeriesSpec> for TimeSeriesSpec {
    type Error = SpecError;

    fn try_from(raw: RawTimeSeriesSpec) -> Result<Self, Self::Error> {
        Ok(Self::from_raw(raw)?)
    }
}

impl From<TimeSeriesSpec> for RawTimeSeriesSpec {
    fn from(spec: TimeSeriesSpec) -> Self {
        spec.to_raw()
    }
}

//! Schedule specs: recurring input windows and the output series a scheduled
//! job writes back.

use super::data_spec::DataSpec;
use super::error::{FieldErrors, SpecError};
use super::time_series::{validate_sampling, TimeSeriesSpec};
use super::wire::{
    AliasEntries, RawScheduleDataSpec, RawScheduleInputSpec, RawScheduleInputTimeSeriesSpec,
    RawScheduleOutputSpec, RawScheduleOutputTimeSeriesSpec, RawTimeSeriesSpec,
};
use super::{build_alias_map, SpecDocument};
use crate::aggregate::Aggregate;
use crate::granularity::Granularity;
use crate::time::{calculate_windows, now_ms, SpanInput, TimeError, TimeInput};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Input time series ───────────────────────────────────────────────

/// A time series read on every schedule tick. The range comes from the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RawScheduleInputTimeSeriesSpec",
    into = "RawScheduleInputTimeSeriesSpec"
)]
pub struct ScheduleInputTimeSeriesSpec {
    id: i64,
    aggregate: Option<Aggregate>,
    granularity: Option<Granularity>,
    include_outside_points: Option<bool>,
}

impl ScheduleInputTimeSeriesSpec {
    /// Raw datapoints of `id`.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            aggregate: None,
            granularity: None,
            include_outside_points: None,
        }
    }

    pub fn builder(id: i64) -> ScheduleInputTimeSeriesSpecBuilder {
        ScheduleInputTimeSeriesSpecBuilder {
            raw: RawScheduleInputTimeSeriesSpec {
                id,
                aggregate: None,
                granularity: None,
                include_outside_points: None,
            },
        }
    }

    pub fn id(&self) -> i64 {
        self.id
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

    /// This series over the window `[start, end)`.
    pub fn over(&self, start: i64, end: i64) -> Result<TimeSeriesSpec, SpecError> {
        let raw = RawTimeSeriesSpec {
            id: self.id,
            start,
            end,
            aggregate: self.aggregate.map(String::from),
            granularity: self.granularity.as_ref().map(|g| g.as_str().to_string()),
            include_outside_points: self.include_outside_points,
        };
        Ok(TimeSeriesSpec::from_raw(raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleInputTimeSeriesSpecBuilder {
    raw: RawScheduleInputTimeSeriesSpec,
}

impl ScheduleInputTimeSeriesSpecBuilder {
    pub fn aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.raw.aggregate = Some(aggregate.into());
        self
    }

    pub fn granularity(mut self, granularity: impl Into<String>) -> Self {
        self.raw.granularity = Some(granularity.into());
        self
    }

    pub fn include_outside_points(mut self, include: bool) -> Self {
        self.raw.include_outside_points = Some(include);
        self
    }

    pub fn build(self) -> Result<ScheduleInputTimeSeriesSpec, SpecError> {
        Ok(ScheduleInputTimeSeriesSpec::from_raw(self.raw)?)
    }
}

impl SpecDocument for ScheduleInputTimeSeriesSpec {
    type Raw = RawScheduleInputTimeSeriesSpec;

    fn from_raw(raw: RawScheduleInputTimeSeriesSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let sampling = validate_sampling(
            raw.aggregate,
            raw.granularity,
            raw.include_outside_points,
            &mut errors,
        );
        errors.into_result(Self {
            id: raw.id,
            aggregate: sampling.aggregate,
            granularity: sampling.granularity,
            include_outside_points: sampling.include_outside_points,
        })
    }

    fn to_raw(&self) -> RawScheduleInputTimeSeriesSpec {
        RawScheduleInputTimeSeriesSpec {
            id: self.id,
            aggregate: self.aggregate.map(String::from),
            granularity: self.granularity.as_ref().map(|g| g.as_str().to_string()),
            include_outside_points: self.include_outside_points,
        }
    }
}

// ── Input ───────────────────────────────────────────────────────────

/// The input side of a schedule: every `stride` ms, starting from `start`, the
/// job reads each time series over the trailing `window_size` ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleInputSpec", into = "RawScheduleInputSpec")]
pub struct ScheduleInputSpec {
    stride: i64,
    window_size: i64,
    start: i64,
    time_series: BTreeMap<String, ScheduleInputTimeSeriesSpec>,
}

impl ScheduleInputSpec {
    /// Strides and window sizes accept milliseconds, `"5m"`-style text or a
    /// `chrono::Duration`. `start` defaults to now.
    pub fn builder(
        stride: impl Into<SpanInput>,
        window_size: impl Into<SpanInput>,
    ) -> ScheduleInputSpecBuilder {
        ScheduleInputSpecBuilder {
            stride: stride.into(),
            window_size: window_size.into(),
            start: TimeInput::from("now"),
            time_series: Vec::new(),
        }
    }

    pub fn stride(&self) -> i64 {
        self.stride
    }

    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    /// First tick of the schedule.
    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn time_series(&self) -> &BTreeMap<String, ScheduleInputTimeSeriesSpec> {
        &self.time_series
    }

    /// One [`DataSpec`] per window whose end lies in `[start, end)`. `end`
    /// defaults to now.
    pub fn data_specs(
        &self,
        start: impl Into<TimeInput>,
        end: Option<TimeInput>,
    ) -> Result<Vec<DataSpec>, SpecError> {
        let now = now_ms();
        let start = start.into().resolve(now)?;
        let end = match end {
            Some(end) => end.resolve(now)?,
            None => now,
        };
        self.data_specs_between(start, end)
    }

    /// [`data_specs`](Self::data_specs) over resolved milliseconds.
    ///
    /// Fails with [`TimeError::NegativeTimestamp`] when a window would begin
    /// before the epoch.
    pub fn data_specs_between(&self, start: i64, end: i64) -> Result<Vec<DataSpec>, SpecError> {
        calculate_windows(start, end, self.stride, self.window_size, self.start)
            .into_iter()
            .map(|(window_start, window_end)| {
                if window_start < 0 {
                    return Err(TimeError::NegativeTimestamp(window_start).into());
                }
                self.time_series
                    .iter()
                    .try_fold(DataSpec::builder(), |builder, (alias, spec)| {
                        Ok::<_, SpecError>(
                            builder.time_series(alias.clone(), spec.over(window_start, window_end)?),
                        )
                    })?
                    .build()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleInputSpecBuilder {
    stride: SpanInput,
    window_size: SpanInput,
    start: TimeInput,
    time_series: Vec<(String, ScheduleInputTimeSeriesSpec)>,
}

impl ScheduleInputSpecBuilder {
    pub fn start(mut self, start: impl Into<TimeInput>) -> Self {
        self.start = start.into();
        self
    }

    pub fn time_series(mut self, alias: impl Into<String>, spec: ScheduleInputTimeSeriesSpec) -> Self {
        self.time_series.push((alias.into(), spec));
        self
    }

    pub fn build(self) -> Result<ScheduleInputSpec, SpecError> {
        self.build_at(now_ms())
    }

    pub fn build_at(self, now_ms: i64) -> Result<ScheduleInputSpec, SpecError> {
        let mut errors = FieldErrors::new();
        let stride = self
            .stride
            .interval_ms()
            .map_err(|e| errors.add("stride", e.to_string()))
            .unwrap_or(1);
        let window_size = self
            .window_size
            .interval_ms()
            .map_err(|e| errors.add("windowSize", e.to_string()))
            .unwrap_or(1);
        let start = self
            .start
            .resolve(now_ms)
            .map_err(|e| errors.add("start", e.to_string()))
            .unwrap_or(0);

        let mut seen = BTreeSet::new();
        let time_series =
            build_alias_map("timeSeries", self.time_series, &mut seen, &mut errors, Ok);

        Ok(errors.into_result(ScheduleInputSpec {
            stride,
            window_size,
            start,
            time_series,
        })?)
    }
}

impl SpecDocument for ScheduleInputSpec {
    type Raw = RawScheduleInputSpec;

    fn from_raw(raw: RawScheduleInputSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        if raw.stride < 1 {
            errors.add("stride", "must be at least 1");
        }
        if raw.window_size < 1 {
            errors.add("windowSize", "must be at least 1");
        }
        if raw.start < 0 {
            errors.add("start", "timestamps can't be negative");
        }

        let mut seen = BTreeSet::new();
        let time_series = build_alias_map(
            "timeSeries",
            raw.time_series.0,
            &mut seen,
            &mut errors,
            ScheduleInputTimeSeriesSpec::from_raw,
        );

        errors.into_result(Self {
            stride: raw.stride,
            window_size: raw.window_size,
            start: raw.start,
            time_series,
        })
    }

    fn to_raw(&self) -> RawScheduleInputSpec {
        RawScheduleInputSpec {
            stride: self.stride,
            window_size: self.window_size,
            start: self.start,
            time_series: self
                .time_series
                .iter()
                .map(|(alias, spec)| (alias.clone(), spec.to_raw()))
                .collect::<AliasEntries<_>>(),
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────

/// A time series a scheduled job writes, shifted by `offset` ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "RawScheduleOutputTimeSeriesSpec",
    into = "RawScheduleOutputTimeSeriesSpec"
)]
pub struct ScheduleOutputTimeSeriesSpec {
    id: i64,
    offset: i64,
}

impl ScheduleOutputTimeSeriesSpec {
    pub fn new(id: i64) -> Self {
        Self { id, offset: 0 }
    }

    /// Offset as milliseconds, `"-5m"`-style text or a `chrono::Duration`.
    pub fn with_offset(self, offset: impl Into<SpanInput>) -> Result<Self, SpecError> {
        let offset = offset.into().offset_ms()?;
        Ok(Self { offset, ..self })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl SpecDocument for ScheduleOutputTimeSeriesSpec {
    type Raw = RawScheduleOutputTimeSeriesSpec;

    fn from_raw(raw: RawScheduleOutputTimeSeriesSpec) -> Result<Self, FieldErrors> {
        Ok(Self {
            id: raw.id,
            offset: raw.offset,
        })
    }

    fn to_raw(&self) -> RawScheduleOutputTimeSeriesSpec {
        RawScheduleOutputTimeSeriesSpec {
            id: self.id,
            offset: self.offset,
        }
    }
}

/// The output side of a schedule: alias → output time series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleOutputSpec", into = "RawScheduleOutputSpec")]
pub struct ScheduleOutputSpec {
    time_series: BTreeMap<String, ScheduleOutputTimeSeriesSpec>,
}

impl ScheduleOutputSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ScheduleOutputSpecBuilder {
        ScheduleOutputSpecBuilder::default()
    }

    pub fn time_series(&self) -> &BTreeMap<String, ScheduleOutputTimeSeriesSpec> {
        &self.time_series
    }

    pub fn get(&self, alias: &str) -> Option<&ScheduleOutputTimeSeriesSpec> {
        self.time_series.get(alias)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleOutputSpecBuilder {
    time_series: Vec<(String, ScheduleOutputTimeSeriesSpec)>,
}

impl ScheduleOutputSpecBuilder {
    pub fn time_series(mut self, alias: impl Into<String>, spec: ScheduleOutputTimeSeriesSpec) -> Self {
        self.time_series.push((alias.into(), spec));
        self
    }

    pub fn build(self) -> Result<ScheduleOutputSpec, SpecError> {
        let mut errors = FieldErrors::new();
        let mut seen = BTreeSet::new();
        let time_series =
            build_alias_map("timeSeries", self.time_series, &mut seen, &mut errors, Ok);
        Ok(errors.into_result(ScheduleOutputSpec { time_series })?)
    }
}

impl SpecDocument for ScheduleOutputSpec {
    type Raw = RawScheduleOutputSpec;

    fn from_raw(raw: RawScheduleOutputSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut seen = BTreeSet::new();
        let time_series = build_alias_map(
            "timeSeries",
            raw.time_series.0,
            &mut seen,
            &mut errors,
            ScheduleOutputTimeSeriesSpec::from_raw,
        );
        errors.into_result(Self { time_series })
    }

    fn to_raw(&self) -> RawScheduleOutputSpec {
        RawScheduleOutputSpec {
            time_series: self
                .time_series
                .iter()
                .map(|(alias, spec)| (alias.clone(), spec.to_raw()))
                .collect::<AliasEntries<_>>(),
        }
    }
}

// ── Schedule ────────────────────────────────────────────────────────

/// Input and output bindings of one scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleDataSpec", into = "RawScheduleDataSpec")]
pub struct ScheduleDataSpec {
    input: ScheduleInputSpec,
    output: ScheduleOutputSpec,
}

impl ScheduleDataSpec {
    pub fn new(input: ScheduleInputSpec, output: ScheduleOutputSpec) -> Self {
        Self { input, output }
    }

    pub fn input(&self) -> &ScheduleInputSpec {
        &self.input
    }

    pub fn output(&self) -> &ScheduleOutputSpec {
        &self.output
    }
}

impl SpecDocument for ScheduleDataSpec {
    type Raw = RawScheduleDataSpec;

    fn from_raw(raw: RawScheduleDataSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = ScheduleInputSpec::from_raw(raw.input)
            .map_err(|e| errors.nest("input", e))
            .ok();
        let output = ScheduleOutputSpec::from_raw(raw.output)
            .map_err(|e| errors.nest("output", e))
            .ok();

        match (input, output) {
            (Some(input), Some(output)) => Ok(Self { input, output }),
            _ => Err(errors),
        }
    }

    fn to_raw(&self) -> RawScheduleDataSpec {
        RawScheduleDataSpec {
            input: self.input.to_raw(),
            output: self.output.to_raw(),
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────────

macro_rules! impl_raw_conversions {
    ($($spec:ty => $raw:ty),* $(,)?) => {
        $(
            impl TryFrom<$raw> for $spec {
                type Error = SpecError;

                fn try_from(raw: $raw) -> Result<Self, Self::Error> {
                    Ok(<$spec as SpecDocument>::from_raw(raw)?)
                }
            }

            impl From<$spec> for $raw {
                fn from(spec: $spec) -> Self {
                    spec.to_raw()
                }
            }
        )*
    };
}

impl_raw_conversions! {
    ScheduleInputTimeSeriesSpec => RawScheduleInputTimeSeriesSpec,
    ScheduleInputSpec => RawScheduleInputSpec,
    ScheduleOutputTimeSeriesSpec => RawScheduleOutputTimeSeriesSpec,
    ScheduleOutputSpec => RawScheduleOutputSpec,
    ScheduleDataSpec => RawScheduleDataSpec,
}

//! Data specs: declarative, validated descriptions of the data a model needs.
//!
//! Every spec type is an immutable value built either through its constructor or
//! builder, or by loading a JSON document. Both paths run the same validation and
//! fail with [`SpecError`] before a spec value exists, so anything holding a spec
//! may rely on its invariants.

pub mod data_spec;
pub mod error;
pub mod file;
pub mod schedule;
pub mod time_series;
pub mod wire;

pub use data_spec::{DataSpec, DataSpecBuilder, SpecRef};
pub use error::{FieldError, FieldErrors, SpecError};
pub use file::FileSpec;
pub use schedule::{
    ScheduleDataSpec, ScheduleInputSpec, ScheduleInputSpecBuilder, ScheduleInputTimeSeriesSpec,
    ScheduleInputTimeSeriesSpecBuilder, ScheduleOutputSpec, ScheduleOutputSpecBuilder, ScheduleOutputTimeSeriesSpec,
};
pub use time_series::{TimeSeriesSpec, TimeSeriesSpecBuilder};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Load, dump and validate operations shared by every spec type.
pub trait SpecDocument: Sized {
    /// Unvalidated wire form.
    type Raw: Serialize + DeserializeOwned;

    /// Validate a wire document, collecting every violation.
    fn from_raw(raw: Self::Raw) -> Result<Self, FieldErrors>;

    fn to_raw(&self) -> Self::Raw;

    /// Build from an already-parsed JSON value.
    ///
    /// Duplicate keys cannot be detected here since `serde_json::Value` has already
    /// collapsed them; use [`from_json`](Self::from_json) for untrusted text.
    fn load(value: serde_json::Value) -> Result<Self, SpecError> {
        let raw: Self::Raw = serde_json::from_value(value)?;
        Ok(Self::from_raw(raw)?)
    }

    fn from_json(json: &str) -> Result<Self, SpecError> {
        let raw: Self::Raw = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw)?)
    }

    /// JSON value with absent optionals and empty alias maps omitted.
    fn dump(&self) -> Result<serde_json::Value, SpecError> {
        Ok(serde_json::to_value(self.to_raw())?)
    }

    /// Pretty JSON with sorted keys.
    fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(&self.dump()?)?)
    }

    /// Re-run validation over the wire form.
    fn validate(&self) -> Result<(), SpecError> {
        Self::from_raw(self.to_raw())?;
        Ok(())
    }
}

/// Any spec document, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Spec {
    TimeSeries(TimeSeriesSpec),
    File(FileSpec),
    Data(DataSpec),
    ScheduleInput(ScheduleInputSpec),
    ScheduleOutput(ScheduleOutputSpec),
    Schedule(ScheduleDataSpec),
}

impl Spec {
    pub fn kind(&self) -> &'static str {
        match self {
            Spec::TimeSeries(_) => "timeSeries",
            Spec::File(_) => "file",
            Spec::Data(_) => "data",
            Spec::ScheduleInput(_) => "scheduleInput",
            Spec::ScheduleOutput(_) => "scheduleOutput",
            Spec::Schedule(_) => "schedule",
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SpecError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

macro_rules! impl_from_for_spec {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Spec {
                fn from(spec: $ty) -> Self {
                    Spec::$variant(spec)
                }
            }
        )*
    };
}

impl_from_for_spec! {
    TimeSeries => TimeSeriesSpec,
    File => FileSpec,
    Data => DataSpec,
    ScheduleInput => ScheduleInputSpec,
    ScheduleOutput => ScheduleOutputSpec,
    Schedule => ScheduleDataSpec,
}

/// Build an alias map from document entries.
///
/// Each alias must be non-empty and unused in `seen` (which spans every map of
/// the enclosing spec). Violations and child errors are recorded under `field`.
pub(crate) fn build_alias_map<R, T>(
    field: &str,
    entries: Vec<(String, R)>,
    seen: &mut BTreeSet<String>,
    errors: &mut FieldErrors,
    convert: impl Fn(R) -> Result<T, FieldErrors>,
) -> BTreeMap<String, T> {
    let mut map = BTreeMap::new();
    let mut alias_errors = FieldErrors::new();

    for (alias, raw) in entries {
        if alias.trim().is_empty() {
            alias_errors.add(alias, "alias must not be empty");
            continue;
        }
        if !seen.insert(alias.clone()) {
            let message = format!("alias `{alias}` is declared more than once");
            alias_errors.add(alias, message);
            continue;
        }
        match convert(raw) {
            Ok(spec) => {
                map.insert(alias, spec);
            }
            Err(child) => alias_errors.nest(alias, child),
        }
    }

    errors.nest(field, alias_errors);
    map
}

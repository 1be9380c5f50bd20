//! The grouped spec: aliases bound to time series and files.

use super::error::{FieldErrors, SpecError};
use super::file::FileSpec;
use super::time_series::TimeSeriesSpec;
use super::wire::{AliasEntries, RawDataSpec};
use super::{build_alias_map, SpecDocument};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Named collection of the time series and files a model consumes.
///
/// Aliases are non-empty and unique across both maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDataSpec", into = "RawDataSpec")]
pub struct DataSpec {
    time_series: BTreeMap<String, TimeSeriesSpec>,
    files: BTreeMap<String, FileSpec>,
}

/// A borrowed entry of a [`DataSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecRef<'a> {
    TimeSeries(&'a TimeSeriesSpec),
    File(&'a FileSpec),
}

impl DataSpec {
    /// A spec with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DataSpecBuilder {
        DataSpecBuilder::default()
    }

    pub fn time_series(&self) -> &BTreeMap<String, TimeSeriesSpec> {
        &self.time_series
    }

    pub fn files(&self) -> &BTreeMap<String, FileSpec> {
        &self.files
    }

    pub fn get(&self, alias: &str) -> Option<SpecRef<'_>> {
        self.time_series
            .get(alias)
            .map(SpecRef::TimeSeries)
            .or_else(|| self.files.get(alias).map(SpecRef::File))
    }

    /// All aliases, time series first, each group sorted.
    pub fn aliases(&self) -> Vec<&str> {
        self.time_series
            .keys()
            .chain(self.files.keys())
            .map(|alias| alias.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, SpecRef<'_>)> {
        let time_series = self
            .time_series
            .iter()
            .map(|(alias, spec)| (alias.as_str(), SpecRef::TimeSeries(spec)));
        let files = self
            .files
            .iter()
            .map(|(alias, spec)| (alias.as_str(), SpecRef::File(spec)));
        time_series.chain(files)
    }

    pub fn is_empty(&self) -> bool {
        self.time_series.is_empty() && self.files.is_empty()
    }

    /// Content hash of the canonical JSON form. Equal specs share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, SpecError> {
        let canonical = serde_json::to_vec(&self.dump()?)?;
        Ok(blake3::hash(&canonical).to_hex().to_string())
    }
}

/// Accumulates entries for a [`DataSpec`]; duplicates surface at [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct DataSpecBuilder {
    time_series: Vec<(String, TimeSeriesSpec)>,
    files: Vec<(String, FileSpec)>,
}

impl DataSpecBuilder {
    pub fn time_series(mut self, alias: impl Into<String>, spec: TimeSeriesSpec) -> Self {
        self.time_series.push((alias.into(), spec));
        self
    }

    pub fn file(mut self, alias: impl Into<String>, spec: FileSpec) -> Self {
        self.files.push((alias.into(), spec));
        self
    }

    pub fn build(self) -> Result<DataSpec, SpecError> {
        let mut errors = FieldErrors::new();
        let mut seen = BTreeSet::new();
        let time_series =
            build_alias_map("timeSeries", self.time_series, &mut seen, &mut errors, Ok);
        let files = build_alias_map("files", self.files, &mut seen, &mut errors, Ok);
        Ok(errors.into_result(DataSpec { time_series, files })?)
    }
}

impl SpecDocument for DataSpec {
    type Raw = RawDataSpec;

    fn from_raw(raw: RawDataSpec) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut seen = BTreeSet::new();
        let time_series = build_alias_map(
            "timeSeries",
            raw.time_series.0,
            &mut seen,
            &mut errors,
            TimeSeriesSpec::from_raw,
        );
        let files = build_alias_map(
            "files",
            raw.files.0,
            &mut seen,
            &mut errors,
            FileSpec::from_raw,
        );
        errors.into_result(DataSpec { time_series, files })
    }

    fn to_raw(&self) -> RawDataSpec {
        RawDataSpec {
            time_series: self
                .time_series
                .iter()
                .map(|(alias, spec)| (alias.clone(), spec.to_raw()))
                .collect::<AliasEntries<_>>(),
            files: self
                .files
                .iter()
                .map(|(alias, spec)| (alias.clone(), spec.to_raw()))
                .collect::<AliasEntries<_>>(),
        }
    }
}

impl TryFrom<RawDataSpec> for DataSpec {
    type Error = SpecError;

    fn try_from(raw: RawDataSpec) -> Result<Self, Self::Error> {
        Ok(Self::from_raw(raw)?)
    }
}

impl From<DataSpec> for RawDataSpec {
    fn from(spec: DataSpec) -> Self {
        spec.to_raw()
    }
}

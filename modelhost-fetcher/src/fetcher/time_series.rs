//! Time series retrieval into polars frames.

use super::{check_aliases, fan_out};
use crate::error::FetchError;
use crate::frame::{align_frames, datapoints_frame, VALUE_COLUMN};
use crate::platform::{Datapoint, DatapointsQuery, PlatformClient};
use log::debug;
use modelhost_spec::TimeSeriesSpec;
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Fetches the time series of a data spec by alias.
pub struct TimeSeriesFetcher {
    specs: BTreeMap<String, TimeSeriesSpec>,
    client: Arc<dyn PlatformClient>,
    parallel: bool,
}

impl TimeSeriesFetcher {
    pub fn new(specs: BTreeMap<String, TimeSeriesSpec>, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            specs,
            client,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.specs.keys().map(|alias| alias.as_str()).collect()
    }

    /// A copy of the spec bound to `alias`.
    pub fn get_spec(&self, alias: &str) -> Result<TimeSeriesSpec, FetchError> {
        self.spec(alias).cloned()
    }

    fn spec(&self, alias: &str) -> Result<&TimeSeriesSpec, FetchError> {
        self.specs
            .get(alias)
            .ok_or_else(|| FetchError::InvalidAlias(alias.to_string()))
    }

    fn retrieve(&self, alias: &str) -> Result<Vec<Datapoint>, FetchError> {
        let spec = self.spec(alias)?;
        debug!(
            "fetching '{alias}' (id={}) from '{}'",
            spec.id(),
            self.client.name()
        );
        Ok(self.client.retrieve_datapoints(&DatapointsQuery::from(spec))?)
    }

    /// Datapoints of one alias: `timestamp` plus `value`, or the aggregate name
    /// for aggregated series.
    pub fn fetch_datapoints(&self, alias: &str) -> Result<DataFrame, FetchError> {
        let spec = self.spec(alias)?;
        let points = self.retrieve(alias)?;
        Ok(datapoints_frame(&points, value_column(spec))?)
    }

    /// [`fetch_datapoints`](Self::fetch_datapoints) for several aliases, keyed by alias.
    ///
    /// Every alias is checked before any request is issued.
    pub fn fetch_datapoints_many<A>(&self, aliases: &[A]) -> Result<BTreeMap<String, DataFrame>, FetchError>
    where
        A: AsRef<str> + Sync,
    {
        check_aliases(aliases, &self.specs)?;
        let frames = fan_out(self.parallel, aliases, |alias| {
            self.fetch_datapoints(alias.as_ref())
        })?;
        Ok(aliases
            .iter()
            .map(|alias| alias.as_ref().to_string())
            .zip(frames)
            .collect())
    }

    /// One frame with `timestamp` and a column per alias, aligned on timestamps.
    ///
    /// All aliases must be aggregates sharing start, end and granularity.
    pub fn fetch_dataframe<A>(&self, aliases: &[A]) -> Result<DataFrame, FetchError>
    where
        A: AsRef<str> + Sync,
    {
        if aliases.is_empty() {
            return Err(FetchError::InvalidFetchRequest(
                "at least one alias is required for a data frame".into(),
            ));
        }
        check_aliases(aliases, &self.specs)?;

        let mut seen = BTreeSet::new();
        if let Some(dup) = aliases.iter().map(|a| a.as_ref()).find(|a| !seen.insert(*a)) {
            return Err(FetchError::InvalidFetchRequest(format!(
                "alias '{dup}' was requested more than once"
            )));
        }

        let specs = aliases
            .iter()
            .map(|alias| self.spec(alias.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        check_frame_compatible(&specs)?;

        let points = fan_out(self.parallel, aliases, |alias| self.retrieve(alias.as_ref()))?;
        let series: Vec<(&str, Vec<Datapoint>)> = aliases
            .iter()
            .map(|alias| alias.as_ref())
            .zip(points)
            .collect();
        Ok(align_frames(&series)?)
    }
}

fn value_column(spec: &TimeSeriesSpec) -> &'static str {
    spec.aggregate().map(|a| a.name()).unwrap_or(VALUE_COLUMN)
}

fn check_frame_compatible(specs: &[&TimeSeriesSpec]) -> Result<(), FetchError> {
    if specs.iter().any(|spec| !spec.is_aggregate()) {
        return Err(FetchError::InvalidFetchRequest(
            "all time series of a data frame need to be aggregates".into(),
        ));
    }

    let first = specs[0];
    if specs
        .iter()
        .any(|spec| spec.start() != first.start() || spec.end() != first.end())
    {
        return Err(FetchError::InvalidFetchRequest(
            "the time series are not aligned. They need to have same start and end to be part of the same data frame".into(),
        ));
    }

    let granularity_ms = |spec: &TimeSeriesSpec| spec.granularity().map(|g| g.as_ms());
    if specs
        .iter()
        .any(|spec| granularity_ms(*spec) != granularity_ms(first))
    {
        return Err(FetchError::InvalidFetchRequest(
            "granularity mismatch. All time series must have same granularity to be part of the same data frame".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{value_columns, TIMESTAMP_COLUMN};
    use crate::platform::InMemoryPlatform;

    fn agg(id: i64, aggregate: &str, granularity: &str) -> TimeSeriesSpec {
        TimeSeriesSpec::builder(id, 0, 3000)
            .aggregate(aggregate)
            .granularity(granularity)
            .build()
            .unwrap()
    }

    fn fetcher(specs: Vec<(&str, TimeSeriesSpec)>) -> (TimeSeriesFetcher, Arc<InMemoryPlatform>) {
        let platform = Arc::new(
            InMemoryPlatform::new()
                .with_time_series(1, (0..30).map(|i| Datapoint::new(i * 100, i as f64)))
                .with_time_series(2, (0..3).map(|i| Datapoint::new(i * 1000, 10.0))),
        );
        let specs = specs.into_iter().map(|(a, s)| (a.to_string(), s)).collect();
        (TimeSeriesFetcher::new(specs, platform.clone()), platform)
    }

    #[test]
    fn raw_series_use_value_column() {
        let (fetcher, _) = fetcher(vec![("raw", TimeSeriesSpec::new(1, 0, 500).unwrap())]);
        let df = fetcher.fetch_datapoints("raw").unwrap();
        assert_eq!(value_columns(&df), ["value"]);
        assert_eq!(df.height(), 5);
    }

    #[test]
    fn aggregate_series_use_aggregate_name() {
        let (fetcher, _) = fetcher(vec![("avg", agg(1, "avg", "1s"))]);
        let df = fetcher.fetch_datapoints("avg").unwrap();
        assert_eq!(value_columns(&df), ["average"]);
        assert_eq!(df.height(), 3);
        let first = df.column("average").unwrap().f64().unwrap().get(0);
        assert_eq!(first, Some(4.5));
    }

    #[test]
    fn unknown_alias_is_rejected_before_any_request() {
        let (fetcher, platform) = fetcher(vec![("a", agg(1, "avg", "1s"))]);
        let result = fetcher.fetch_datapoints_many(&["a", "nope"]);
        assert!(matches!(result, Err(FetchError::InvalidAlias(alias)) if alias == "nope"));
        assert_eq!(platform.request_count(), 0);
    }

    #[test]
    fn many_keys_frames_by_alias() {
        let (fetcher, platform) = fetcher(vec![
            ("a", agg(1, "max", "1s")),
            ("b", TimeSeriesSpec::new(2, 0, 3000).unwrap()),
        ]);
        let frames = fetcher.fetch_datapoints_many(&["a", "b"]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(value_columns(&frames["a"]), ["max"]);
        assert_eq!(value_columns(&frames["b"]), ["value"]);
        assert_eq!(platform.request_count(), 2);
    }

    #[test]
    fn dataframe_aligns_aliases() {
        let (fetcher, _) = fetcher(vec![("a", agg(1, "avg", "1s")), ("b", agg(2, "sum", "1s"))]);
        let df = fetcher.fetch_dataframe(&["b", "a"]).unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(value_columns(&df), ["b", "a"]);
        assert!(df.column(TIMESTAMP_COLUMN).is_ok());
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn dataframe_requires_aggregates() {
        let (fetcher, _) = fetcher(vec![
            ("a", agg(1, "avg", "1s")),
            ("raw", TimeSeriesSpec::new(2, 0, 3000).unwrap()),
        ]);
        assert!(matches!(
            fetcher.fetch_dataframe(&["a", "raw"]),
            Err(FetchError::InvalidFetchRequest(_))
        ));
    }

    #[test]
    fn dataframe_requires_same_range() {
        let shifted = TimeSeriesSpec::builder(2, 0, 2000)
            .aggregate("avg")
            .granularity("1s")
            .build()
            .unwrap();
        let (fetcher, _) = fetcher(vec![("a", agg(1, "avg", "1s")), ("b", shifted)]);
        let err = fetcher.fetch_dataframe(&["a", "b"]).unwrap_err();
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn dataframe_requires_same_granularity() {
        let (fetcher, _) = fetcher(vec![("a", agg(1, "avg", "1s")), ("b", agg(2, "avg", "2s"))]);
        let err = fetcher.fetch_dataframe(&["a", "b"]).unwrap_err();
        assert!(err.to_string().contains("granularity mismatch"));
    }

    #[test]
    fn dataframe_rejects_empty_and_repeated_aliases() {
        let (fetcher, _) = fetcher(vec![("a", agg(1, "avg", "1s"))]);
        let none: [&str; 0] = [];
        assert!(matches!(
            fetcher.fetch_dataframe(&none),
            Err(FetchError::InvalidFetchRequest(_))
        ));
        assert!(matches!(
            fetcher.fetch_dataframe(&["a", "a"]),
            Err(FetchError::InvalidFetchRequest(_))
        ));
    }

    #[test]
    fn get_spec_returns_a_copy() {
        let (fetcher, _) = fetcher(vec![("a", agg(1, "avg", "1s"))]);
        assert_eq!(fetcher.get_spec("a").unwrap(), agg(1, "avg", "1s"));
        assert!(matches!(fetcher.get_spec("b"), Err(FetchError::InvalidAlias(_))));
    }
}

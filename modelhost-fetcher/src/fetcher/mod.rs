//! The data fetcher: resolves the aliases of a [`DataSpec`] against a platform client.
//!
//! `DataFetcher` owns a validated spec and hands out two sub-fetchers, one for
//! time series and one for files. Multi-alias requests check every alias before
//! issuing any request, then fan out on the rayon pool unless parallelism is off.

pub mod files;
pub mod time_series;

pub use files::FileFetcher;
pub use time_series::TimeSeriesFetcher;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::platform::PlatformClient;
use log::debug;
use modelhost_spec::{DataSpec, SpecDocument};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Entry point for retrieving the data described by a [`DataSpec`].
pub struct DataFetcher {
    data_spec: DataSpec,
    time_series: TimeSeriesFetcher,
    files: FileFetcher,
}

impl DataFetcher {
    pub fn new(data_spec: DataSpec, client: Arc<dyn PlatformClient>) -> Self {
        debug!(
            "data fetcher: {} time series, {} files via '{}'",
            data_spec.time_series().len(),
            data_spec.files().len(),
            client.name()
        );
        let time_series = TimeSeriesFetcher::new(data_spec.time_series().clone(), Arc::clone(&client));
        let files = FileFetcher::new(data_spec.files().clone(), client);
        Self {
            data_spec,
            time_series,
            files,
        }
    }

    /// Build from a JSON data spec document.
    pub fn from_json(json: &str, client: Arc<dyn PlatformClient>) -> Result<Self, FetchError> {
        Ok(Self::new(DataSpec::from_json(json)?, client))
    }

    /// Build from an already-parsed data spec document.
    pub fn from_value(value: serde_json::Value, client: Arc<dyn PlatformClient>) -> Result<Self, FetchError> {
        Ok(Self::new(DataSpec::load(value)?, client))
    }

    /// Build with the client, parallelism and download directory from `config`.
    pub fn from_config(data_spec: DataSpec, config: &FetcherConfig) -> Self {
        let mut fetcher = Self::new(data_spec, config.build_client()).with_parallel(config.fetch.parallel);
        fetcher.files = fetcher.files.with_download_dir(&config.fetch.download_dir);
        fetcher
    }

    /// [`from_config`](Self::from_config) with the configuration read from a TOML file.
    pub fn from_config_file(data_spec: DataSpec, path: &Path) -> Result<Self, FetchError> {
        let config = FetcherConfig::from_file(path)?;
        Ok(Self::from_config(data_spec, &config))
    }

    /// Enables or disables parallel fan-out of multi-alias requests.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.time_series = self.time_series.with_parallel(parallel);
        self.files = self.files.with_parallel(parallel);
        self
    }

    /// A copy of the spec this fetcher serves.
    pub fn data_spec(&self) -> DataSpec {
        self.data_spec.clone()
    }

    pub fn time_series(&self) -> &TimeSeriesFetcher {
        &self.time_series
    }

    pub fn files(&self) -> &FileFetcher {
        &self.files
    }
}

/// Run `f` over `items`, on the rayon pool when `parallel`. Results keep input order.
pub(crate) fn fan_out<T, R, F>(parallel: bool, items: &[T], f: F) -> Result<Vec<R>, FetchError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, FetchError> + Sync + Send,
{
    if parallel && items.len() > 1 {
        items.par_iter().map(&f).collect()
    } else {
        items.iter().map(&f).collect()
    }
}

/// Fail with the first alias not in `known`.
pub(crate) fn check_aliases<A, V>(
    aliases: &[A],
    known: &BTreeMap<String, V>,
) -> Result<(), FetchError>
where
    A: AsRef<str>,
{
    match aliases
        .iter()
        .map(|alias| alias.as_ref())
        .find(|alias| !known.contains_key(*alias))
    {
        Some(alias) => Err(FetchError::InvalidAlias(alias.to_string())),
        None => Ok(()),
    }
}

//! In-memory platform client.
//!
//! Holds series and files in process. Used as the test double for fetchers and
//! for embedding small fixed datasets; every request is counted.

use super::query;
use super::{Datapoint, DatapointsQuery, FileInfo, PlatformClient, PlatformError};
use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct StoredFile {
    name: String,
    bytes: Vec<u8>,
}

/// A platform client backed by maps of series and files.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    series: BTreeMap<i64, Vec<Datapoint>>,
    files: BTreeMap<i64, StoredFile>,
    requests: AtomicU64,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a series. Points are sorted by timestamp.
    pub fn with_time_series(mut self, id: i64, points: impl IntoIterator<Item = Datapoint>) -> Self {
        let mut points: Vec<Datapoint> = points.into_iter().collect();
        points.sort_by_key(|p| p.timestamp);
        self.series.insert(id, points);
        self
    }

    pub fn with_file(mut self, id: i64, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(
            id,
            StoredFile {
                name: name.into(),
                bytes: bytes.into(),
            },
        );
        self
    }

    /// Number of requests served so far, successful or not.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn file(&self, id: i64) -> Result<&StoredFile, PlatformError> {
        self.files.get(&id).ok_or(PlatformError::FileNotFound { id })
    }
}

impl PlatformClient for InMemoryPlatform {
    fn name(&self) -> &str {
        "memory"
    }

    fn retrieve_datapoints(&self, query: &DatapointsQuery) -> Result<Vec<Datapoint>, PlatformError> {
        self.count_request();
        debug!(
            "memory: datapoints id={} [{}, {}) aggregate={:?}",
            query.id, query.start, query.end, query.aggregate
        );
        let points = self
            .series
            .get(&query.id)
            .ok_or(PlatformError::TimeSeriesNotFound { id: query.id })?;
        query::select(points, query)
    }

    fn download_file(&self, id: i64) -> Result<Vec<u8>, PlatformError> {
        self.count_request();
        debug!("memory: download file id={id}");
        Ok(self.file(id)?.bytes.clone())
    }

    fn file_info(&self, id: i64) -> Result<FileInfo, PlatformError> {
        self.count_request();
        let file = self.file(id)?;
        Ok(FileInfo {
            id,
            name: file.name.clone(),
            size: file.bytes.len() as u64,
        })
    }
}

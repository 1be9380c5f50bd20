//! Local Parquet store: an offline platform client over a directory tree.
//!
//! Layout:
//! - `{root}/timeseries/id={ID}.parquet` with `timestamp` (i64 ms) and `value` (f64)
//! - `{root}/files/{ID}/{NAME}` holding the raw bytes of one file
//!
//! Writes are atomic (write to .tmp, rename into place). A series file that fails
//! validation on load is renamed to `{file}.quarantined` and reported as a
//! storage error.

use super::query;
use super::{Datapoint, DatapointsQuery, FileInfo, PlatformClient, PlatformError};
use crate::frame::{datapoints_frame, frame_points, TIMESTAMP_COLUMN, VALUE_COLUMN};
use log::{debug, info, warn};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// A platform client reading series and files from disk.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn series_path(&self, id: i64) -> PathBuf {
        self.root.join("timeseries").join(format!("id={id}.parquet"))
    }

    fn file_dir(&self, id: i64) -> PathBuf {
        self.root.join("files").join(id.to_string())
    }

    /// Store a series, replacing any previous one. Points are sorted first.
    pub fn write_time_series(&self, id: i64, points: &[Datapoint]) -> Result<(), PlatformError> {
        if points.is_empty() {
            return Err(PlatformError::Storage(format!(
                "no datapoints to store for time series {id}"
            )));
        }

        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.timestamp);

        let path = self.series_path(id);
        create_parent(&path)?;

        let mut df = datapoints_frame(&sorted, VALUE_COLUMN)
            .map_err(|e| PlatformError::Storage(format!("dataframe creation: {e}")))?;
        let tmp_path = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|e| PlatformError::Storage(format!("create file: {e}")))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| PlatformError::Storage(format!("write parquet: {e}")))?;
        rename_into_place(&tmp_path, &path)?;

        info!("parquet store: wrote {} points for time series {id}", sorted.len());
        Ok(())
    }

    /// Store a file under `name`, replacing whatever file `id` held before.
    pub fn write_file(&self, id: i64, name: &str, bytes: &[u8]) -> Result<(), PlatformError> {
        if name.is_empty() || Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(PlatformError::Storage(format!("invalid file name '{name}'")));
        }

        let dir = self.file_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| PlatformError::Storage(format!("clear file dir: {e}")))?;
        }
        fs::create_dir_all(&dir)
            .map_err(|e| PlatformError::Storage(format!("failed to create dir: {e}")))?;

        let path = dir.join(name);
        let tmp_path = dir.join(format!("{name}.tmp"));
        fs::write(&tmp_path, bytes).map_err(|e| PlatformError::Storage(format!("write file: {e}")))?;
        rename_into_place(&tmp_path, &path)?;

        info!("parquet store: wrote file {id} ({} bytes)", bytes.len());
        Ok(())
    }

    /// All stored points of a series, sorted by timestamp.
    pub fn load_time_series(&self, id: i64) -> Result<Vec<Datapoint>, PlatformError> {
        let path = self.series_path(id);
        if !path.exists() {
            return Err(PlatformError::TimeSeriesNotFound { id });
        }

        match load_and_validate(&path) {
            Ok(mut points) => {
                points.sort_by_key(|p| p.timestamp);
                Ok(points)
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!("quarantining corrupt series file {}: {e}", path.display());
                let _ = fs::rename(&path, &quarantine);
                Err(e)
            }
        }
    }

    fn stored_file(&self, id: i64) -> Result<PathBuf, PlatformError> {
        let dir = self.file_dir(id);
        let entries = fs::read_dir(&dir).map_err(|_| PlatformError::FileNotFound { id })?;

        for entry in entries {
            let entry = entry.map_err(|e| PlatformError::Storage(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) != Some("tmp") {
                return Ok(path);
            }
        }
        Err(PlatformError::FileNotFound { id })
    }
}

impl PlatformClient for ParquetStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn retrieve_datapoints(&self, query: &DatapointsQuery) -> Result<Vec<Datapoint>, PlatformError> {
        debug!(
            "parquet store: datapoints id={} [{}, {}) aggregate={:?}",
            query.id, query.start, query.end, query.aggregate
        );
        let points = self.load_time_series(query.id)?;
        query::select(&points, query)
    }

    fn download_file(&self, id: i64) -> Result<Vec<u8>, PlatformError> {
        let path = self.stored_file(id)?;
        debug!("parquet store: reading file {}", path.display());
        fs::read(&path).map_err(|e| PlatformError::Storage(format!("read file: {e}")))
    }

    fn file_info(&self, id: i64) -> Result<FileInfo, PlatformError> {
        let path = self.stored_file(id)?;
        let size = fs::metadata(&path)
            .map_err(|e| PlatformError::Storage(format!("file metadata: {e}")))?
            .len();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(FileInfo { id, name, size })
    }
}

// ── I/O helpers ─────────────────────────────────────────────────────

fn create_parent(path: &Path) -> Result<(), PlatformError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| PlatformError::Storage(format!("failed to create dir: {e}")))?;
    }
    Ok(())
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), PlatformError> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        PlatformError::Storage(format!("atomic rename failed: {e}"))
    })
}

/// Load a series file and check its integrity.
fn load_and_validate(path: &Path) -> Result<Vec<Datapoint>, PlatformError> {
    let file = fs::File::open(path).map_err(|e| PlatformError::Storage(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| PlatformError::Storage(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(PlatformError::Storage("empty parquet file".into()));
    }
    for column in [TIMESTAMP_COLUMN, VALUE_COLUMN] {
        if df.column(column).is_err() {
            return Err(PlatformError::Storage(format!("missing column '{column}'")));
        }
    }

    frame_points(&df, VALUE_COLUMN).map_err(|e| PlatformError::Storage(format!("column read: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelhost_spec::{Aggregate, Granularity};

    fn sample_points() -> Vec<Datapoint> {
        vec![
            Datapoint::new(2_000, 2.0),
            Datapoint::new(0, 1.0),
            Datapoint::new(1_000, 4.0),
        ]
    }

    fn query(id: i64) -> DatapointsQuery {
        DatapointsQuery {
            id,
            start: 0,
            end: 10_000,
            aggregate: None,
            granularity: None,
            include_outside_points: false,
        }
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.write_time_series(7, &sample_points()).unwrap();
        let loaded = store.load_time_series(7).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], Datapoint::new(0, 1.0));
        assert_eq!(loaded[2], Datapoint::new(2_000, 2.0));
        assert!(dir.path().join("timeseries/id=7.parquet").exists());
    }

    #[test]
    fn queries_go_through_selection() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write_time_series(7, &sample_points()).unwrap();

        let raw = store
            .retrieve_datapoints(&DatapointsQuery {
                start: 1_000,
                ..query(7)
            })
            .unwrap();
        assert_eq!(raw.len(), 2);

        let summed = store
            .retrieve_datapoints(&DatapointsQuery {
                aggregate: Some(Aggregate::Sum),
                granularity: Some(Granularity::parse("1h").unwrap()),
                ..query(7)
            })
            .unwrap();
        assert_eq!(summed, vec![Datapoint::new(0, 7.0)]);
    }

    #[test]
    fn missing_series_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(matches!(
            store.retrieve_datapoints(&query(1)),
            Err(PlatformError::TimeSeriesNotFound { id: 1 })
        ));
    }

    #[test]
    fn empty_series_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(store.write_time_series(1, &[]).is_err());
    }

    #[test]
    fn corrupt_series_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        let path = dir.path().join("timeseries/id=3.parquet");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not parquet").unwrap();

        assert!(matches!(
            store.load_time_series(3),
            Err(PlatformError::Storage(_))
        ));
        assert!(!path.exists());
        assert!(path.with_extension("parquet.quarantined").exists());
    }

    #[test]
    fn files_roundtrip_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.write_file(4, "old.csv", b"a,b").unwrap();
        store.write_file(4, "model.pkl", b"weights").unwrap();

        assert_eq!(store.download_file(4).unwrap(), b"weights");
        let info = store.file_info(4).unwrap();
        assert_eq!(info.name, "model.pkl");
        assert_eq!(info.size, 7);
    }

    #[test]
    fn file_names_cannot_escape_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(store.write_file(4, "../evil", b"x").is_err());
        assert!(store.write_file(4, "", b"x").is_err());
        assert!(matches!(
            store.download_file(4),
            Err(PlatformError::FileNotFound { id: 4 })
        ));
    }
}

//! Fetcher configuration loaded from TOML.
//!
//! ```toml
//! [platform]
//! kind = "parquet"   # or "memory"
//! root = "data"
//!
//! [fetch]
//! parallel = true
//! download_dir = "downloads"
//! ```
//!
//! `MODELHOST_DATA_ROOT`, when set, replaces the Parquet root.

use crate::platform::{InMemoryPlatform, ParquetStore, PlatformClient};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Environment variable overriding `platform.root`.
pub const DATA_ROOT_ENV: &str = "MODELHOST_DATA_ROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which platform client to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum PlatformConfig {
    /// An empty in-memory store. Configuration cannot seed it, so every
    /// series and file lookup fails as not found. Only useful for checking
    /// that a fetcher is wired up.
    Memory,
    /// A [`ParquetStore`] rooted at `root`.
    Parquet { root: PathBuf },
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig::Parquet {
            root: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Fan multi-alias requests out on the rayon pool.
    pub parallel: bool,
    /// Where file downloads land when no directory is given.
    pub download_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            download_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetcherConfig {
    pub platform: PlatformConfig,
    pub fetch: FetchConfig,
}

impl FetcherConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        Ok(config.with_data_root_override(std::env::var(DATA_ROOT_ENV).ok()))
    }

    /// Parse from a TOML string. Environment overrides are not applied.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Replace the Parquet root when `root` is set and non-empty.
    pub fn with_data_root_override(mut self, root: Option<String>) -> Self {
        if let (PlatformConfig::Parquet { root: current }, Some(root)) = (&mut self.platform, root) {
            if !root.is_empty() {
                *current = PathBuf::from(root);
            }
        }
        self
    }

    /// The configured platform client. A `memory` platform is always empty.
    pub fn build_client(&self) -> Arc<dyn PlatformClient> {
        match &self.platform {
            PlatformConfig::Memory => Arc::new(InMemoryPlatform::new()),
            PlatformConfig::Parquet { root } => Arc::new(ParquetStore::new(root)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DatapointsQuery, PlatformError};

    #[test]
    fn defaults_when_empty() {
        let config = FetcherConfig::from_toml("").unwrap();
        assert_eq!(config, FetcherConfig::default());
        assert!(config.fetch.parallel);
        assert_eq!(config.build_client().name(), "parquet");
    }

    #[test]
    fn parses_full_document() {
        let config = FetcherConfig::from_toml(
            r#"
            [platform]
            kind = "parquet"
            root = "/srv/modelhost"

            [fetch]
            parallel = false
            download_dir = "downloads"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.platform,
            PlatformConfig::Parquet {
                root: PathBuf::from("/srv/modelhost")
            }
        );
        assert!(!config.fetch.parallel);
        assert_eq!(config.fetch.download_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn memory_platform_is_empty() {
        let config = FetcherConfig::from_toml("[platform]\nkind = \"memory\"\n").unwrap();
        let client = config.build_client();
        assert_eq!(client.name(), "memory");
        assert!(matches!(
            client.download_file(1),
            Err(PlatformError::FileNotFound { id: 1 })
        ));
        let query = DatapointsQuery {
            id: 1,
            start: 0,
            end: 10,
            aggregate: None,
            granularity: None,
            include_outside_points: false,
        };
        assert!(matches!(
            client.retrieve_datapoints(&query),
            Err(PlatformError::TimeSeriesNotFound { id: 1 })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FetcherConfig::from_toml("[fetch]\nretries = 3\n").is_err());
        assert!(FetcherConfig::from_toml("[platform]\nkind = \"http\"\n").is_err());
    }

    #[test]
    fn data_root_override() {
        let config = FetcherConfig::default().with_data_root_override(Some("/tmp/x".into()));
        assert_eq!(
            config.platform,
            PlatformConfig::Parquet {
                root: PathBuf::from("/tmp/x")
            }
        );

        let unchanged = FetcherConfig::default().with_data_root_override(Some(String::new()));
        assert_eq!(unchanged, FetcherConfig::default());

        let memory = FetcherConfig {
            platform: PlatformConfig::Memory,
            ..FetcherConfig::default()
        };
        assert_eq!(
            memory.clone().with_data_root_override(Some("/tmp/x".into())),
            memory
        );
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = FetcherConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

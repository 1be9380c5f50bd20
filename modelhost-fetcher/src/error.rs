//! Fetch-layer errors.

use crate::config::ConfigError;
use crate::platform::PlatformError;
use modelhost_spec::SpecError;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("alias '{0}' does not exist")]
    InvalidAlias(String),

    #[error("invalid fetch request: {0}")]
    InvalidFetchRequest(String),

    #[error("'{}' is not a directory", .0.display())]
    DirectoryDoesNotExist(PathBuf),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("frame error: {0}")]
    Frame(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! File retrieval to disk or memory.

use super::{check_aliases, fan_out};
use crate::error::FetchError;
use crate::platform::PlatformClient;
use log::debug;
use modelhost_spec::FileSpec;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Fetches the files of a data spec by alias.
///
/// Downloads land at `{dir}/{alias}`, where `dir` falls back to the configured
/// download directory (the current directory unless set).
pub struct FileFetcher {
    specs: BTreeMap<String, FileSpec>,
    client: Arc<dyn PlatformClient>,
    parallel: bool,
    download_dir: PathBuf,
}

impl FileFetcher {
    pub fn new(specs: BTreeMap<String, FileSpec>, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            specs,
            client,
            parallel: true,
            download_dir: PathBuf::from("."),
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Directory used when a fetch names none.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.specs.keys().map(|alias| alias.as_str()).collect()
    }

    pub fn get_spec(&self, alias: &str) -> Result<FileSpec, FetchError> {
        self.specs
            .get(alias)
            .copied()
            .ok_or_else(|| FetchError::InvalidAlias(alias.to_string()))
    }

    /// Download one file to `{dir}/{alias}` and return that path.
    pub fn fetch(&self, alias: &str, dir: Option<&Path>) -> Result<PathBuf, FetchError> {
        let dir = existing_dir(dir.unwrap_or(&self.download_dir))?;
        self.download_to(alias, dir)
    }

    /// Download several files into `dir`. Paths follow the order of `aliases`.
    pub fn fetch_many<A>(&self, aliases: &[A], dir: Option<&Path>) -> Result<Vec<PathBuf>, FetchError>
    where
        A: AsRef<str> + Sync,
    {
        let dir = existing_dir(dir.unwrap_or(&self.download_dir))?;
        check_aliases(aliases, &self.specs)?;
        fan_out(self.parallel, aliases, |alias| self.download_to(alias.as_ref(), dir))
    }

    pub fn fetch_to_memory(&self, alias: &str) -> Result<Vec<u8>, FetchError> {
        let spec = self.get_spec(alias)?;
        debug!("downloading '{alias}' (id={}) into memory", spec.id());
        Ok(self.client.download_file(spec.id())?)
    }

    pub fn fetch_many_to_memory<A>(&self, aliases: &[A]) -> Result<BTreeMap<String, Vec<u8>>, FetchError>
    where
        A: AsRef<str> + Sync,
    {
        check_aliases(aliases, &self.specs)?;
        let contents = fan_out(self.parallel, aliases, |alias| self.fetch_to_memory(alias.as_ref()))?;
        Ok(aliases
            .iter()
            .map(|alias| alias.as_ref().to_string())
            .zip(contents)
            .collect())
    }

    fn download_to(&self, alias: &str, dir: &Path) -> Result<PathBuf, FetchError> {
        let spec = self.get_spec(alias)?;
        if !is_plain_file_name(alias) {
            return Err(FetchError::InvalidFetchRequest(format!(
                "alias '{alias}' cannot be used as a file name"
            )));
        }

        let path = dir.join(alias);
        debug!("downloading '{alias}' (id={}) to {}", spec.id(), path.display());
        let bytes = self.client.download_file(spec.id())?;
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

fn existing_dir(dir: &Path) -> Result<&Path, FetchError> {
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(FetchError::DirectoryDoesNotExist(dir.to_path_buf()))
    }
}

fn is_plain_file_name(alias: &str) -> bool {
    let mut components = Path::new(alias).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

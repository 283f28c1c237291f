//! Retrieval of remote documents into local scratch storage.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;

/// Downloads documents into a scratch directory.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Retrieves `url` into `scratch_dir` and returns the local path.
    ///
    /// The caller owns the returned file and is responsible for deleting it.
    async fn fetch(&self, url: &Url, scratch_dir: &Path) -> Result<PathBuf, FetchError>;
}

/// Builds a collision-free scratch file name that keeps the original base
/// name, so the attachment shows up under a recognizable name.
pub fn scratch_file_name(url: &Url) -> String {
    let base = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("attachment");
    format!("{}-{}", uuid::Uuid::new_v4().simple(), base)
}

/// Writes a downloaded document to `path`.
///
/// On failure the file is removed, since the caller never receives a path to
/// a partially written document.
pub(crate) async fn write_scratch(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    let Err(e) = tokio::fs::write(path, bytes).await else {
        return Ok(());
    };

    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => {}
        Err(cleanup) => {
            tracing::warn!(
                path = %path.display(),
                error = %cleanup,
                "failed to remove partial scratch file"
            );
        }
    }
    Err(e.into())
}

/// File fetcher using HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpFileFetcher {
    http: reqwest::Client,
}

impl HttpFileFetcher {
    /// Creates a fetcher whose downloads are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url, scratch_dir: &Path) -> Result<PathBuf, FetchError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let path = scratch_dir.join(scratch_file_name(url));
        write_scratch(&path, &bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "downloaded file");
        Ok(path)
    }
}

#[derive(Debug, Default)]
struct InMemoryFetchState {
    fetched: Vec<Url>,
    fail_on_fetch: bool,
}

/// In-memory file fetcher for testing.
///
/// Writes a small placeholder document into the scratch directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileFetcher {
    state: Arc<RwLock<InMemoryFetchState>>,
}

impl InMemoryFileFetcher {
    /// Creates a new in-memory file fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures fetches to fail.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    /// Returns every URL requested so far.
    pub fn fetched(&self) -> Vec<Url> {
        self.state.read().unwrap().fetched.clone()
    }
}

#[async_trait]
impl FileFetcher for InMemoryFileFetcher {
    async fn fetch(&self, url: &Url, scratch_dir: &Path) -> Result<PathBuf, FetchError> {
        {
            let mut state = self.state.write().unwrap();
            state.fetched.push(url.clone());
            if state.fail_on_fetch {
                return Err(FetchError::Unavailable(url.to_string()));
            }
        }

        let path = scratch_dir.join(scratch_file_name(url));
        write_scratch(&path, b"%PDF-1.4 placeholder").await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_name_keeps_base_name() {
        let url = Url::parse("https://files.example.com/forms/release.pdf").unwrap();
        let name = scratch_file_name(&url);
        assert!(name.ends_with("-release.pdf"));
    }

    #[test]
    fn scratch_names_are_unique() {
        let url = Url::parse("https://files.example.com/forms/release.pdf").unwrap();
        assert_ne!(scratch_file_name(&url), scratch_file_name(&url));
    }

    #[test]
    fn scratch_name_falls_back_for_bare_host() {
        let url = Url::parse("https://files.example.com/").unwrap();
        assert!(scratch_file_name(&url).ends_with("-attachment"));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("release.pdf");

        let result = write_scratch(&path, b"%PDF-1.4").await;
        assert!(matches!(result, Err(FetchError::Io(_))));
        assert!(!path.exists());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn in_memory_fetch_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = InMemoryFileFetcher::new();
        let url = Url::parse("https://files.example.com/a.pdf").unwrap();

        let path = fetcher.fetch(&url, dir.path()).await.unwrap();
        assert!(path.exists());
        assert_eq!(fetcher.fetched(), vec![url]);
    }
}

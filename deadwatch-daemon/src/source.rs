//! Local filesystem implementation of [`FileSource`].
//!
//! Reads the game log directly from `endpoint.log_path`. The killfeed
//! path points at a directory of CSV files; the most recently modified
//! regular file is read. Transient read failures are retried with
//! exponential backoff (1s, 2s, 4s) and each attempt is bounded by a
//! timeout. A missing file is not an error: it returns `Ok(None)` so
//! the caller can skip the cycle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use deadwatch_core::config::SourceConfig;
use deadwatch_core::error::{DeadwatchError, SourceError};
use deadwatch_core::pipeline::FileSource;
use deadwatch_core::types::{FeedKind, ServerEndpoint};

/// File source backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    retries: u32,
    timeout: Duration,
}

impl LocalFileSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            retries: config.fetch_retries.max(1),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    async fn read_with_retry(&self, path: &Path) -> Result<Option<String>, DeadwatchError> {
        let mut last_error = String::new();
        for attempt in 1..=self.retries {
            match tokio::time::timeout(self.timeout, tokio::fs::read_to_string(path)).await {
                Ok(Ok(content)) => return Ok(Some(content)),
                Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(None);
                }
                Ok(Err(err)) => {
                    last_error = err.to_string();
                }
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.timeout);
                }
            }

            if attempt < self.retries {
                let backoff = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(
                    path = %path.display(),
                    attempt,
                    error = %last_error,
                    backoff_secs = backoff.as_secs(),
                    "file fetch failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        tracing::error!(path = %path.display(), error = %last_error, "file fetch retries exhausted");
        Err(DeadwatchError::Source(SourceError::RetriesExhausted {
            path: path.display().to_string(),
            attempts: self.retries,
        }))
    }

    /// Pick the most recently modified regular file in a directory.
    async fn latest_file_in(dir: &Path) -> Result<Option<PathBuf>, std::io::Error> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified()?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, entry.path()));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

impl FileSource for LocalFileSource {
    async fn fetch(
        &self,
        endpoint: &ServerEndpoint,
        kind: FeedKind,
    ) -> Result<Option<String>, DeadwatchError> {
        match kind {
            FeedKind::GameLog => {
                self.read_with_retry(Path::new(&endpoint.log_path)).await
            }
            FeedKind::Killfeed => {
                let dir = Path::new(&endpoint.killfeed_path);
                let latest = match Self::latest_file_in(dir).await {
                    Ok(latest) => latest,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(err) => return Err(DeadwatchError::Io(err)),
                };
                match latest {
                    Some(path) => self.read_with_retry(&path).await,
                    None => Ok(None),
                }
            }
        }
    }
}

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use gover_backend::{CatalogEntry, GoverError};
use log::{debug, warn};

use crate::atomic::write_atomic;

/// On-disk copy of the last successful catalog fetch.
///
/// The file modification time is the fetch timestamp.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    path: PathBuf,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the cache was last written, if it exists.
    #[must_use]
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        let modified = std::fs::metadata(&self.path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.fetched_at()
            .is_some_and(|fetched_at| now.signed_duration_since(fetched_at) < self.ttl)
    }

    /// Entries from a cache younger than the TTL.
    ///
    /// # Errors
    /// Returns `Corrupt` if a fresh cache file cannot be parsed.
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Result<Option<Vec<CatalogEntry>>, GoverError> {
        if !self.is_fresh(now) {
            debug!("Catalog cache at {} is missing or expired", self.path.display());
            return Ok(None);
        }
        self.read().map(Some)
    }

    /// Entries regardless of age, for use when a fetch has failed.
    ///
    /// # Errors
    /// Returns `Corrupt` if the file exists but cannot be parsed.
    pub fn load_stale(&self) -> Result<Option<Vec<CatalogEntry>>, GoverError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        self.read().map(Some)
    }

    fn read(&self) -> Result<Vec<CatalogEntry>, GoverError> {
        let data = std::fs::read(&self.path).map_err(|e| GoverError::io_at(&self.path, &e))?;
        serde_json::from_slice(&data)
            .map_err(|e| GoverError::corrupt("catalog cache", &self.path, e.to_string()))
    }

    /// Persist `entries`. Advisory: failures are logged and otherwise ignored.
    pub fn save(&self, entries: &[CatalogEntry]) {
        let data = match serde_json::to_vec(entries) {
            Ok(data) => data,
            Err(error) => {
                warn!("Failed to serialize catalog cache: {error}");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match write_atomic(&self.path, &data) {
            Ok(()) => debug!(
                "Cached {} catalog entries at {}",
                entries.len(),
                self.path.display()
            ),
            Err(error) => warn!(
                "Failed to write catalog cache {}: {error}",
                self.path.display()
            ),
        }
    }
}

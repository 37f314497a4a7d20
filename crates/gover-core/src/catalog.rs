use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gover_backend::{
    BuildVariant, CatalogEntry, CatalogSource, GoverError, MinorLine, RemoteRelease, VersionId,
};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::cache::CatalogCache;

pub const DEFAULT_CATALOG_URL: &str = "https://go.dev/dl/?mode=json&include=all";
pub const CATALOG_URL_ENV_VAR: &str = "GOVER_CATALOG_URL";

/// Which build variants are offered downstream.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub unsupported_os: Vec<String>,
    /// When set, entries without a variant for this `(os, arch)` are dropped.
    pub host: Option<(String, String)>,
}

impl CatalogFilter {
    fn keeps_variant(&self, os: &str, kind_is_source: bool) -> bool {
        !kind_is_source && !self.unsupported_os.iter().any(|u| u.eq_ignore_ascii_case(os))
    }

    fn keeps_entry(&self, entry: &CatalogEntry) -> bool {
        if entry.variants.is_empty() {
            return false;
        }
        match &self.host {
            Some((os, arch)) => entry.supports(os, arch),
            None => true,
        }
    }
}

/// Short fingerprint of a catalog URL together with the filter applied to
/// it. OS names compare case-insensitively and in any order.
#[must_use]
pub fn cache_key(url: &str, filter: &CatalogFilter) -> String {
    let mut unsupported: Vec<String> = filter
        .unsupported_os
        .iter()
        .map(|os| os.to_ascii_lowercase())
        .collect();
    unsupported.sort();
    unsupported.dedup();

    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    for os in &unsupported {
        hasher.update(b"\0skip:");
        hasher.update(os.as_bytes());
    }
    if let Some((os, arch)) = &filter.host {
        hasher.update(b"\0host:");
        hasher.update(format!("{os}/{arch}").as_bytes());
    }

    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Turn raw releases into catalog entries: drop source and unsupported-OS
/// variants, drop entries with nothing left, and merge duplicate versions.
#[must_use]
pub fn filter_releases(releases: Vec<RemoteRelease>, filter: &CatalogFilter) -> Vec<CatalogEntry> {
    let mut merged: BTreeMap<VersionId, CatalogEntry> = BTreeMap::new();

    for release in releases {
        let version: VersionId = match release.version.parse() {
            Ok(version) => version,
            Err(error) => {
                debug!("Skipping catalog release {}: {error}", release.version);
                continue;
            }
        };

        let variants = release
            .files
            .iter()
            .filter(|file| filter.keeps_variant(&file.os, file.is_source()))
            .filter(|file| !file.os.is_empty() && !file.arch.is_empty())
            .map(|file| BuildVariant::new(&file.os, &file.arch));

        let entry = merged.entry(version.clone()).or_insert_with(|| CatalogEntry {
            version,
            stable: release.stable,
            variants: Vec::new(),
        });
        entry.stable |= release.stable;
        for variant in variants {
            if !entry.variants.contains(&variant) {
                entry.variants.push(variant);
            }
        }
    }

    merged
        .into_values()
        .filter(|entry| filter.keeps_entry(entry))
        .map(|mut entry| {
            entry.variants.sort();
            entry
        })
        .collect()
}

/// The newest stable entry. Catalog order is not trusted.
///
/// # Errors
/// Returns `NoStableVersion` when the catalog has no stable entry.
pub fn latest_stable(entries: &[CatalogEntry]) -> Result<&CatalogEntry, GoverError> {
    entries
        .iter()
        .filter(|entry| entry.stable)
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or(GoverError::NoStableVersion)
}

/// Every entry on one `major.minor` line, ascending.
#[must_use]
pub fn patch_releases(entries: &[CatalogEntry], line: MinorLine) -> Vec<&CatalogEntry> {
    let mut releases: Vec<&CatalogEntry> = entries
        .iter()
        .filter(|entry| entry.version.line() == line)
        .collect();
    releases.sort_by(|a, b| a.version.cmp(&b.version));
    releases
}

/// Cached view of a remote catalog with stale-on-failure fallback.
pub struct VersionCatalog<S> {
    source: S,
    cache: CatalogCache,
    filter: CatalogFilter,
}

impl<S: CatalogSource> VersionCatalog<S> {
    pub fn new(source: S, cache: CatalogCache, filter: CatalogFilter) -> Self {
        Self {
            source,
            cache,
            filter,
        }
    }

    /// # Errors
    /// See [`VersionCatalog::fetch_at`].
    pub async fn fetch(&self) -> Result<Vec<CatalogEntry>, GoverError> {
        self.fetch_at(Utc::now()).await
    }

    /// Fresh cache, else remote fetch (saved to cache), else stale cache.
    ///
    /// # Errors
    /// Returns the remote fetch error when the fetch fails and no readable
    /// cache exists.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> Result<Vec<CatalogEntry>, GoverError> {
        match self.cache.load_fresh(now) {
            Ok(Some(entries)) => {
                debug!("Using fresh catalog cache ({} entries)", entries.len());
                return Ok(entries);
            }
            Ok(None) => {}
            Err(error) => warn!("Ignoring unreadable catalog cache: {error}"),
        }

        let fetch_error = match self.source.fetch().await {
            Ok(releases) => {
                let entries = filter_releases(releases, &self.filter);
                info!(
                    "Fetched {} catalog entries from {}",
                    entries.len(),
                    self.source.describe()
                );
                self.cache.save(&entries);
                return Ok(entries);
            }
            Err(error) => error,
        };

        warn!(
            "Catalog fetch from {} failed: {fetch_error}",
            self.source.describe()
        );
        match self.cache.load_stale() {
            Ok(Some(entries)) => {
                warn!("Using stale catalog cache ({} entries)", entries.len());
                Ok(entries)
            }
            Ok(None) => Err(fetch_error),
            Err(cache_error) => {
                debug!("Stale catalog cache unusable: {cache_error}");
                Err(fetch_error)
            }
        }
    }
}

/// Fetches the catalog as JSON over HTTP.
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl HttpCatalogSource {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, GoverError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("gover/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GoverError::network_request_from("client setup", e))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout_secs,
        })
    }

    fn map_error(&self, error: &reqwest::Error, parse: bool) -> GoverError {
        if error.is_timeout() {
            GoverError::Timeout {
                operation: "catalog fetch",
                seconds: self.timeout_secs,
            }
        } else if parse {
            GoverError::network_parse_from("catalog fetch", error)
        } else {
            GoverError::network_request_from("catalog fetch", error)
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<RemoteRelease>, GoverError> {
        debug!("GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_error(&e, false))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoverError::network_status(
                "catalog fetch",
                format!("HTTP {status}"),
            ));
        }

        response
            .json::<Vec<RemoteRelease>>()
            .await
            .map_err(|e| self.map_error(&e, true))
    }
}

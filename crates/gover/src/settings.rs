use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gover_backend::VersionPolicy;
use gover_core::{CATALOG_URL_ENV_VAR, CatalogFilter, DEFAULT_CATALOG_URL, cache_key};
use gover_platform::{GoverPaths, HostPlatform};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    #[serde(default)]
    pub policy: VersionPolicy,

    #[serde(default = "default_unsupported_os")]
    pub unsupported_os: Vec<String>,

    /// Argv template; `{version}` and `{dest}` are substituted.
    #[serde(default)]
    pub installer_command: Vec<String>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_install_timeout() -> u64 {
    600
}

fn default_unsupported_os() -> Vec<String> {
    vec!["windows".to_string()]
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            cache_ttl_secs: default_cache_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            install_timeout_secs: default_install_timeout(),
            cache_file: None,
            policy: VersionPolicy::default(),
            unsupported_os: default_unsupported_os(),
            installer_command: Vec::new(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl Settings {
    /// Missing or unreadable settings fall back to defaults.
    pub fn load(paths: &GoverPaths) -> Self {
        let mut settings = Self::load_from(&paths.settings_file());
        if let Ok(url) = std::env::var(CATALOG_URL_ENV_VAR) {
            settings.apply_catalog_override(Some(url));
        }
        settings
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                log::warn!("Ignoring invalid settings {}: {error}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn apply_catalog_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            self.catalog_url = url;
        }
    }

    /// An explicit `cache_file` is used as is; otherwise the file name is
    /// keyed by the catalog URL and `filter`.
    pub fn cache_path(&self, filter: &CatalogFilter) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(|| {
            GoverPaths::cache_file_for(&cache_key(&self.catalog_url, filter))
        })
    }

    pub fn catalog_filter(&self, host: &HostPlatform) -> CatalogFilter {
        CatalogFilter {
            unsupported_os: self.unsupported_os.clone(),
            host: Some((host.os.clone(), host.arch.clone())),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Overrides the default `~/.gover` root.
pub const ROOT_ENV_VAR: &str = "GOVER_ROOT";

const DEFAULT_ROOT_DIR: &str = ".gover";
const CACHE_FILE_PREFIX: &str = "gover-remote-versions-cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GoverPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

/// On-disk layout of a gover installation.
///
/// ```text
/// <root>/
///   current -> versions/<v>/go
///   versions/<v>/go/bin/go
///   env/<v>.env
///   settings.json
///   gover.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoverPaths {
    pub root: PathBuf,
}

impl GoverPaths {
    /// Resolve the root from `$GOVER_ROOT`, falling back to `~/.gover`.
    ///
    /// # Errors
    /// Returns an error when the variable is unset and the home directory
    /// cannot be determined.
    pub fn new() -> Result<Self, GoverPathsError> {
        Self::from_env_value(std::env::var_os(ROOT_ENV_VAR).map(PathBuf::from))
    }

    fn from_env_value(value: Option<PathBuf>) -> Result<Self, GoverPathsError> {
        if let Some(root) = value.filter(|root| !root.as_os_str().is_empty()) {
            log::debug!("Using root from {ROOT_ENV_VAR}: {}", root.display());
            return Ok(Self { root });
        }

        let home = dirs::home_dir().ok_or(GoverPathsError::HomeDirUnavailable)?;
        Ok(Self {
            root: home.join(DEFAULT_ROOT_DIR),
        })
    }

    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[must_use]
    pub fn version_dir(&self, name: &str) -> PathBuf {
        self.versions_dir().join(name)
    }

    #[must_use]
    pub fn active_pointer(&self) -> PathBuf {
        self.root.join("current")
    }

    #[must_use]
    pub fn env_dir(&self) -> PathBuf {
        self.root.join("env")
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.root.join("gover.log")
    }

    /// Shared across roots; `key` identifies the catalog source and filter
    /// so differently configured catalogs never share a file.
    #[must_use]
    pub fn cache_file_for(key: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{CACHE_FILE_PREFIX}-{key}.json"))
    }

    /// Entry point directory the active pointer targets for `name`.
    #[must_use]
    pub fn pointer_target(&self, name: &str) -> PathBuf {
        self.version_dir(name).join("go")
    }

    /// Ensure the root and its managed directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.versions_dir())?;
        std::fs::create_dir_all(self.env_dir())?;
        Ok(())
    }
}

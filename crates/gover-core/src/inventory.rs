use std::path::{Path, PathBuf};

use gover_backend::{GoverError, InstalledVersion, VersionId, VersionPolicy};
use log::{debug, info, warn};

/// Reject names that could escape the versions directory.
///
/// # Errors
/// Returns `InvalidVersionName` for empty names, `.`/`..`, and names that
/// contain a path separator or NUL.
pub fn validate_version_name(name: &str) -> Result<(), GoverError> {
    let reason = if name.is_empty() {
        "is empty"
    } else if name == "." || name == ".." {
        "is a relative path component"
    } else if name.contains(['/', '\\']) {
        "contains a path separator"
    } else if name.contains('\0') {
        "contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(GoverError::InvalidVersionName {
        name: name.to_string(),
        reason,
    })
}

/// Live view of the versions directory. Every call rescans the filesystem.
#[derive(Debug, Clone)]
pub struct LocalInventory {
    versions_dir: PathBuf,
}

impl LocalInventory {
    pub fn new(versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
        }
    }

    #[must_use]
    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    /// Installed versions in ascending version order.
    ///
    /// A missing versions directory is an empty inventory. Entries whose
    /// name is not a version are skipped with a warning.
    ///
    /// # Errors
    /// Returns an IO error when the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<InstalledVersion>, GoverError> {
        let entries = match std::fs::read_dir(&self.versions_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Versions directory {} does not exist yet",
                    self.versions_dir.display()
                );
                return Ok(Vec::new());
            }
            Err(error) => return Err(GoverError::io_at(&self.versions_dir, &error)),
        };

        let mut installed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| GoverError::io_at(&self.versions_dir, &error))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 entry in {}", self.versions_dir.display());
                continue;
            };
            match name.parse::<VersionId>() {
                Ok(version) => installed.push(InstalledVersion { name, version }),
                Err(error) => warn!("Skipping {name}: {error}"),
            }
        }

        installed.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
        debug!("Found {} installed versions", installed.len());
        Ok(installed)
    }

    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        validate_version_name(name).is_ok() && self.versions_dir.join(name).is_dir()
    }

    /// Delete one installed version directory.
    ///
    /// # Errors
    /// Fails for invalid names, for the currently active version, for names
    /// that are not installed, and when the directory cannot be removed.
    pub fn remove(&self, name: &str, active: Option<&str>) -> Result<(), GoverError> {
        validate_version_name(name)?;

        if active == Some(name) {
            return Err(GoverError::ActiveVersion {
                version: name.to_string(),
            });
        }

        let dir = self.versions_dir.join(name);
        if !dir.is_dir() {
            return Err(GoverError::NotInstalled {
                version: name.to_string(),
            });
        }

        std::fs::remove_dir_all(&dir).map_err(|error| GoverError::io_at(&dir, &error))?;
        info!("Removed {name}");
        Ok(())
    }
}

/// Expand an uninstall selector into installed directory names.
///
/// An exact directory name selects itself. A `major.minor` selector such as
/// `1.22` selects every installed release on that line. Anything else is
/// matched by version equality.
///
/// # Errors
/// Returns `NotInstalled` when nothing matches, or a parse error when the
/// selector is neither an installed name nor a version.
pub fn expand_selector(
    selector: &str,
    installed: &[InstalledVersion],
    policy: &VersionPolicy,
) -> Result<Vec<String>, GoverError> {
    let selector = selector.trim();
    if let Some(exact) = installed.iter().find(|v| v.name == selector) {
        return Ok(vec![exact.name.clone()]);
    }

    let requested: VersionId = selector.parse()?;
    let matches: Vec<String> = if requested.patch.is_none() && requested.pre.is_none() {
        installed
            .iter()
            .filter(|v| v.version.line() == requested.line())
            .map(|v| v.name.clone())
            .collect()
    } else {
        let requested = policy.normalize(&requested);
        installed
            .iter()
            .filter(|v| v.version == requested)
            .map(|v| v.name.clone())
            .collect()
    };

    if matches.is_empty() {
        return Err(GoverError::NotInstalled {
            version: selector.to_string(),
        });
    }
    Ok(matches)
}

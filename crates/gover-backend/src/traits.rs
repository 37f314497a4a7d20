use async_trait::async_trait;
use std::path::Path;

use crate::error::GoverError;
use crate::types::{RemoteRelease, VersionId};

/// Where the list of published releases comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human readable origin, used in log lines.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<RemoteRelease>, GoverError>;
}

/// Materializes a distribution into a version directory.
#[async_trait]
pub trait Installer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn install(&self, version: &VersionId, destination: &Path) -> Result<(), GoverError>;

    /// Install unless `entry_point` (relative to `destination`) already exists,
    /// then confirm the installer actually produced it.
    ///
    /// A failed or incomplete install removes `destination`, so a leftover
    /// directory never looks installed.
    async fn ensure_installed(
        &self,
        version: &VersionId,
        destination: &Path,
        entry_point: &Path,
    ) -> Result<bool, GoverError> {
        let binary = destination.join(entry_point);
        if binary.exists() {
            return Ok(false);
        }

        let error = match self.install(version, destination).await {
            Ok(()) if binary.exists() => return Ok(true),
            Ok(()) => GoverError::IncompleteInstall {
                version: version.to_string(),
                missing: entry_point.display().to_string(),
            },
            Err(error) => error,
        };

        match std::fs::remove_dir_all(destination) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GoverError::install_failed(
                    "cleanup",
                    format!("{error}; could not remove {}: {e}", destination.display()),
                ));
            }
        }
        Err(error)
    }
}

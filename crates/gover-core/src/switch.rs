use std::path::{Path, PathBuf};

use gover_backend::GoverError;
use gover_platform::GoverPaths;
use log::{debug, info};

use crate::atomic::{commit, stage};
use crate::inventory::validate_version_name;

/// Directory inside a version directory that the pointer resolves to.
pub const DISTRIBUTION_DIR: &str = "go";
/// Executable that must exist before a version can become active.
pub const ENTRY_POINT: &str = "go/bin/go";

/// The single `current` symlink naming the active version.
///
/// Switching stages a new symlink next to the pointer and renames it into
/// place, so readers observe either the old target or the new one.
#[derive(Debug, Clone)]
pub struct ActivePointer {
    versions_dir: PathBuf,
    pointer: PathBuf,
}

impl ActivePointer {
    pub fn new(versions_dir: impl Into<PathBuf>, pointer: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
            pointer: pointer.into(),
        }
    }

    #[must_use]
    pub fn from_paths(paths: &GoverPaths) -> Self {
        Self::new(paths.versions_dir(), paths.active_pointer())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.pointer
    }

    /// Make `name` the active version.
    ///
    /// # Errors
    /// Fails before touching the pointer when the name is invalid, the
    /// version or its entry point is missing, or the pointer path holds
    /// something other than a symlink. Fails after staging when the rename
    /// does not go through; the previous pointer is then left as it was.
    pub fn switch_to(&self, name: &str) -> Result<(), GoverError> {
        validate_version_name(name)?;

        let version_dir = self.versions_dir.join(name);
        if !version_dir.is_dir() {
            return Err(GoverError::NotInstalled {
                version: name.to_string(),
            });
        }
        if !version_dir.join(ENTRY_POINT).is_file() {
            return Err(GoverError::IncompleteInstall {
                version: name.to_string(),
                missing: ENTRY_POINT.to_string(),
            });
        }

        self.ensure_replaceable()?;

        if let Some(parent) = self.pointer.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GoverError::io_at(parent, &e))?;
        }

        let target = version_dir.join(DISTRIBUTION_DIR);
        let (staged, ()) = stage(&self.pointer, |candidate| create_symlink(&target, candidate))
            .map_err(|e| GoverError::io_at(&self.pointer, &e))?;
        debug!("Staged {} -> {}", staged.display(), target.display());

        commit(&staged, &self.pointer).map_err(|e| GoverError::io_at(&self.pointer, &e))?;
        info!("Switched to {name}");
        Ok(())
    }

    fn ensure_replaceable(&self) -> Result<(), GoverError> {
        match std::fs::symlink_metadata(&self.pointer) {
            Ok(metadata) if metadata.file_type().is_symlink() => Ok(()),
            Ok(_) => Err(GoverError::PointerNotSymlink {
                path: self.pointer.display().to_string(),
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(GoverError::io_at(&self.pointer, &error)),
        }
    }

    /// Name of the active version, or `None` when no pointer exists yet.
    ///
    /// # Errors
    /// Returns `PointerNotSymlink` when the pointer path is not a symlink,
    /// or an IO error when it cannot be read.
    pub fn current(&self) -> Result<Option<String>, GoverError> {
        self.ensure_replaceable()?;

        let target = match std::fs::read_link(&self.pointer) {
            Ok(target) => target,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(GoverError::io_at(&self.pointer, &error)),
        };

        let name = target
            .parent()
            .and_then(Path::file_name)
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_string);
        Ok(name)
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "switching the active version requires symlink support",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;

    use gover_backend::{ErrorKind, GoverError};
    use gover_platform::GoverPaths;

    use super::{ActivePointer, ENTRY_POINT};

    fn install(paths: &GoverPaths, name: &str) {
        let binary = paths.version_dir(name).join(ENTRY_POINT);
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(binary, b"#!/bin/sh\n").unwrap();
    }

    fn setup(names: &[&str]) -> (tempfile::TempDir, GoverPaths, ActivePointer) {
        let temp = tempfile::tempdir().unwrap();
        let paths = GoverPaths::with_root(temp.path());
        paths.ensure_dirs().unwrap();
        for name in names {
            install(&paths, name);
        }
        let pointer = ActivePointer::from_paths(&paths);
        (temp, paths, pointer)
    }

    fn leftovers(root: &Path) -> Vec<String> {
        std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn first_switch_creates_pointer() {
        let (_temp, paths, pointer) = setup(&["go1.22.3"]);

        assert_eq!(pointer.current().unwrap(), None);
        pointer.switch_to("go1.22.3").unwrap();

        assert_eq!(pointer.current().unwrap().as_deref(), Some("go1.22.3"));
        assert_eq!(
            std::fs::read_link(paths.active_pointer()).unwrap(),
            paths.pointer_target("go1.22.3")
        );
        assert!(paths.active_pointer().join("bin/go").is_file());
    }

    #[test]
    fn switch_replaces_existing_pointer() {
        let (temp, _paths, pointer) = setup(&["go1.21.0", "go1.22.3"]);

        pointer.switch_to("go1.21.0").unwrap();
        pointer.switch_to("go1.22.3").unwrap();

        assert_eq!(pointer.current().unwrap().as_deref(), Some("go1.22.3"));
        assert!(leftovers(temp.path()).is_empty());
    }

    #[test]
    fn missing_version_leaves_pointer_untouched() {
        let (_temp, _paths, pointer) = setup(&["go1.21.0"]);
        pointer.switch_to("go1.21.0").unwrap();

        let err = pointer.switch_to("go1.99.0").unwrap_err();

        assert!(matches!(err, GoverError::NotInstalled { .. }));
        assert_eq!(pointer.current().unwrap().as_deref(), Some("go1.21.0"));
    }

    #[test]
    fn incomplete_version_is_rejected() {
        let (_temp, paths, pointer) = setup(&[]);
        std::fs::create_dir_all(paths.version_dir("go1.22.0").join("go")).unwrap();

        let err = pointer.switch_to("go1.22.0").unwrap_err();

        assert!(matches!(err, GoverError::IncompleteInstall { .. }));
        assert_eq!(pointer.current().unwrap(), None);
    }

    #[test]
    fn path_separators_are_rejected() {
        let (_temp, _paths, pointer) = setup(&["go1.22.0"]);

        let err = pointer.switch_to("../versions/go1.22.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn regular_file_at_pointer_is_not_overwritten() {
        let (_temp, paths, pointer) = setup(&["go1.22.0"]);
        std::fs::write(paths.active_pointer(), b"user data").unwrap();

        let err = pointer.switch_to("go1.22.0").unwrap_err();

        assert!(matches!(err, GoverError::PointerNotSymlink { .. }));
        assert_eq!(err.kind(), ErrorKind::Guard);
        assert_eq!(std::fs::read(paths.active_pointer()).unwrap(), b"user data");
    }

    #[test]
    fn directory_at_pointer_is_not_overwritten() {
        let (_temp, paths, pointer) = setup(&["go1.22.0"]);
        std::fs::create_dir(paths.active_pointer()).unwrap();

        let err = pointer.switch_to("go1.22.0").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Guard);
        assert!(paths.active_pointer().is_dir());
    }

    #[test]
    fn dangling_pointer_is_replaced() {
        let (_temp, paths, pointer) = setup(&["go1.22.0"]);
        std::os::unix::fs::symlink(paths.pointer_target("go1.10"), paths.active_pointer())
            .unwrap();

        pointer.switch_to("go1.22.0").unwrap();

        assert_eq!(pointer.current().unwrap().as_deref(), Some("go1.22.0"));
    }
}

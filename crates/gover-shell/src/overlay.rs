use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use gover_backend::ErrorKind;
use log::{debug, info};
use thiserror::Error;

use crate::names::{is_protected, validate_name};

/// Variables for one version, ordered by name.
pub type EnvOverlay = BTreeMap<String, String>;

const FILE_SUFFIX: &str = "env";

#[derive(Error, Debug)]
pub enum EnvError {
    #[error(
        "invalid environment variable name {name:?}: must start with a letter or underscore and contain only letters, digits and underscores"
    )]
    InvalidName { name: String },

    #[error("environment variable {name} is protected and cannot be modified")]
    Protected { name: String },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: &'static str },

    #[error("invalid version name {version:?}")]
    InvalidVersion { version: String },

    #[error("environment variable {name} not found for version {version}")]
    NotFound { name: String, version: String },

    #[error("malformed environment file {path} at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("environment file path {0} exists but is not a regular file")]
    NotAFile(PathBuf),

    #[error("failed to load existing variables: {0}")]
    LoadExisting(#[source] Box<EnvError>),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnvError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. }
            | Self::Protected { .. }
            | Self::InvalidValue { .. }
            | Self::InvalidVersion { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corrupt { .. } => ErrorKind::Corruption,
            Self::NotAFile(_) | Self::Io { .. } => ErrorKind::Io,
            Self::LoadExisting(inner) => inner.kind(),
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Per-version environment files under one directory.
///
/// Every mutation rewrites the whole file. Concurrent writers to the same
/// version may lose updates.
#[derive(Debug, Clone)]
pub struct EnvStore {
    dir: PathBuf,
}

impl EnvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, version: &str) -> Result<PathBuf, EnvError> {
        if version.is_empty()
            || version == "."
            || version == ".."
            || version.contains(['/', '\\', '\0'])
        {
            return Err(EnvError::InvalidVersion {
                version: version.to_string(),
            });
        }
        Ok(self.dir.join(format!("{version}.{FILE_SUFFIX}")))
    }

    /// Variables for `version`; empty when no file exists.
    pub fn load(&self, version: &str) -> Result<EnvOverlay, EnvError> {
        let path = self.file_path(version)?;
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(EnvOverlay::new());
            }
            Err(error) => return Err(EnvError::io(&path, error)),
        };
        if !metadata.is_file() {
            return Err(EnvError::NotAFile(path));
        }

        let content = fs::read_to_string(&path).map_err(|e| EnvError::io(&path, e))?;
        parse(&path, &content)
    }

    pub fn set(&self, version: &str, name: &str, value: &str) -> Result<(), EnvError> {
        validate_name(name)?;
        if is_protected(name) {
            return Err(EnvError::Protected {
                name: name.to_string(),
            });
        }
        if value.contains(['\n', '\r']) {
            return Err(EnvError::InvalidValue {
                name: name.to_string(),
                reason: "line breaks are not supported",
            });
        }

        let mut vars = self
            .load(version)
            .map_err(|e| EnvError::LoadExisting(Box::new(e)))?;
        vars.insert(name.to_string(), value.to_string());
        self.save(version, &vars)?;
        info!("Set {name} for {version}");
        Ok(())
    }

    pub fn unset(&self, version: &str, name: &str) -> Result<(), EnvError> {
        validate_name(name)?;
        if is_protected(name) {
            return Err(EnvError::Protected {
                name: name.to_string(),
            });
        }

        let mut vars = self
            .load(version)
            .map_err(|e| EnvError::LoadExisting(Box::new(e)))?;
        if vars.remove(name).is_none() {
            return Err(EnvError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        self.save(version, &vars)?;
        info!("Unset {name} for {version}");
        Ok(())
    }

    /// Remove every variable for `version`. Missing files are fine.
    pub fn clear_all(&self, version: &str) -> Result<(), EnvError> {
        let path = self.file_path(version)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Cleared environment for {version}");
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(EnvError::io(&path, error)),
        }
    }

    /// Overlays for every version that has a file, keyed by version.
    pub fn load_all(&self) -> Result<BTreeMap<String, EnvOverlay>, EnvError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(error) => return Err(EnvError::io(&self.dir, error)),
        };

        let mut all = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|e| EnvError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_SUFFIX) {
                continue;
            }
            let Some(version) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            all.insert(version.to_string(), self.load(version)?);
        }
        debug!("Loaded environment overlays for {} versions", all.len());
        Ok(all)
    }

    fn save(&self, version: &str, vars: &EnvOverlay) -> Result<(), EnvError> {
        let path = self.file_path(version)?;
        fs::create_dir_all(&self.dir).map_err(|e| EnvError::io(&self.dir, e))?;
        fs::write(&path, render(version, vars)).map_err(|e| EnvError::io(&path, e))
    }
}

fn render(version: &str, vars: &EnvOverlay) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Environment variables for Go version {version}");
    let _ = writeln!(out, "# Generated by gover - do not edit manually");
    out.push('\n');
    for (name, value) in vars {
        let _ = writeln!(out, "{name}={value}");
    }
    out
}

fn parse(path: &Path, content: &str) -> Result<EnvOverlay, EnvError> {
    let mut vars = EnvOverlay::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let corrupt = |reason: String| EnvError::Corrupt {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };
        let Some((name, value)) = line.split_once('=') else {
            return Err(corrupt("expected KEY=VALUE".to_string()));
        };
        let name = name.trim();
        validate_name(name).map_err(|e| corrupt(e.to_string()))?;
        vars.insert(name.to_string(), value.to_string());
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use gover_backend::ErrorKind;

    use super::{EnvError, EnvStore};

    const VERSION: &str = "go1.21.0";

    fn store() -> (tempfile::TempDir, EnvStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = EnvStore::new(temp.path().join("env"));
        (temp, store)
    }

    #[test]
    fn load_without_file_is_empty() {
        let (_temp, store) = store();
        assert!(store.load(VERSION).unwrap().is_empty());
        assert!(store.load("nonexistent").unwrap().is_empty());
    }

    #[test]
    fn set_then_load_and_overwrite() {
        let (_temp, store) = store();

        store.set(VERSION, "TEST_VAR", "test_value").unwrap();
        store.set(VERSION, "ANOTHER_VAR", "another_value").unwrap();
        store.set(VERSION, "TEST_VAR", "new_value").unwrap();

        let vars = store.load(VERSION).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["TEST_VAR"], "new_value");
        assert_eq!(vars["ANOTHER_VAR"], "another_value");
    }

    #[test]
    fn unset_removes_only_that_variable() {
        let (_temp, store) = store();
        store.set(VERSION, "TEST_VAR", "a").unwrap();
        store.set(VERSION, "ANOTHER_VAR", "b").unwrap();

        store.unset(VERSION, "TEST_VAR").unwrap();

        let vars = store.load(VERSION).unwrap();
        assert!(!vars.contains_key("TEST_VAR"));
        assert_eq!(vars["ANOTHER_VAR"], "b");
    }

    #[test]
    fn unset_missing_variable_is_not_found_and_leaves_file() {
        let (_temp, store) = store();
        store.set(VERSION, "KEEP", "1").unwrap();
        let path = store.file_path(VERSION).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store.unset(VERSION, "NONEXISTENT").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("NONEXISTENT"));
        assert!(err.to_string().contains("not found"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn protected_variables_are_rejected_by_set_and_unset() {
        let (_temp, store) = store();
        for name in ["GOROOT", "GOPATH", "GOPROXY", "GOSUMDB", "GOOS", "GOARCH", "goroot"] {
            let err = store.set(VERSION, name, "some_value").unwrap_err();
            assert!(matches!(err, EnvError::Protected { .. }));
            assert!(err.to_string().contains("protected"));
            assert!(err.to_string().contains(name));

            let err = store.unset(VERSION, name).unwrap_err();
            assert!(err.to_string().contains("protected"));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(!store.file_path(VERSION).unwrap().exists());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (_temp, store) = store();
        for name in ["123VAR", "VAR-NAME", "VAR NAME", "", "VAR.NAME"] {
            assert!(store.set(VERSION, name, "value").is_err(), "{name:?}");
            assert!(store.unset(VERSION, name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn special_values_round_trip() {
        let (_temp, store) = store();
        let long = "a".repeat(1000);
        let cases = [
            ("EMPTY_VAR", ""),
            ("SPACE_VAR", "value with spaces"),
            ("QUOTE_VAR", "value with 'single' and \"double\" quotes"),
            ("SPECIAL_VAR", "value@#$%^&*()"),
            ("UNICODE_VAR", "值包含中文"),
            ("EQUALS_VAR", "a=b=c"),
            ("LONG_VAR", long.as_str()),
        ];

        for (name, value) in cases {
            store.set(VERSION, name, value).unwrap();
            assert_eq!(store.load(VERSION).unwrap()[name], value, "{name}");
        }
    }

    #[test]
    fn values_with_line_breaks_are_rejected() {
        let (_temp, store) = store();

        let err = store.set(VERSION, "NEWLINE_VAR", "line1\nline2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn versions_are_isolated() {
        let (_temp, store) = store();
        store.set("go1.20.0", "SHARED_VAR", "value_for_1.20").unwrap();
        store.set("go1.21.0", "SHARED_VAR", "value_for_1.21").unwrap();

        assert_eq!(store.load("go1.20.0").unwrap()["SHARED_VAR"], "value_for_1.20");
        assert_eq!(store.load("go1.21.0").unwrap()["SHARED_VAR"], "value_for_1.21");
    }

    #[test]
    fn file_has_header_and_sorted_lines() {
        let (_temp, store) = store();
        store.set(VERSION, "ZEBRA", "last").unwrap();
        store.set(VERSION, "ALPHA", "first").unwrap();
        store.set(VERSION, "BETA", "second").unwrap();

        let path = store.file_path(VERSION).unwrap();
        assert!(path.ends_with("go1.21.0.env"));
        let content = std::fs::read_to_string(path).unwrap();

        assert!(content.contains("# Environment variables for Go version go1.21.0"));
        assert!(content.contains("# Generated by gover - do not edit manually"));
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| line.contains('=') && !line.starts_with('#'))
            .collect();
        assert_eq!(lines, vec!["ALPHA=first", "BETA=second", "ZEBRA=last"]);
    }

    #[test]
    fn load_accepts_comments_blank_lines_and_equals_in_values() {
        let (_temp, store) = store();
        let path = store.file_path(VERSION).unwrap();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            &path,
            "# comment\n\nVAR1=value=with=equals\n# another\nVAR2=value2\n\n",
        )
        .unwrap();

        let vars = store.load(VERSION).unwrap();
        assert_eq!(vars["VAR1"], "value=with=equals");
        assert_eq!(vars["VAR2"], "value2");
    }

    #[test]
    fn malformed_lines_fail_the_whole_load() {
        let (_temp, store) = store();
        let path = store.file_path(VERSION).unwrap();
        std::fs::create_dir_all(store.dir()).unwrap();

        for content in [
            "VAR1=value1\nINVALID_LINE\nVAR2=value2\n",
            "VAR1=value1\n123INVALID=value2\n",
        ] {
            std::fs::write(&path, content).unwrap();

            let err = store.load(VERSION).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Corruption);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
        }
    }

    #[test]
    fn directory_in_place_of_file_fails_mutations() {
        let (_temp, store) = store();
        let path = store.file_path(VERSION).unwrap();
        std::fs::create_dir_all(&path).unwrap();

        assert!(matches!(store.load(VERSION), Err(EnvError::NotAFile(_))));

        let err = store.set(VERSION, "TEST_VAR", "value").unwrap_err();
        assert!(err.to_string().contains("failed to load existing variables"));

        let err = store.unset(VERSION, "TEST_VAR").unwrap_err();
        assert!(err.to_string().contains("failed to load existing variables"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, store) = store();
        let path = store.file_path(VERSION).unwrap();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(&path, "TEST_VAR=value\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read regardless of mode bits.
        if std::fs::read(&path).is_err() {
            assert_eq!(store.load(VERSION).unwrap_err().kind(), ErrorKind::Io);
        }
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn clear_all_removes_file_and_tolerates_missing() {
        let (_temp, store) = store();
        store.set(VERSION, "A", "1").unwrap();

        store.clear_all(VERSION).unwrap();
        store.clear_all(VERSION).unwrap();

        assert!(store.load(VERSION).unwrap().is_empty());
    }

    #[test]
    fn load_all_collects_every_version() {
        let (_temp, store) = store();
        assert!(store.load_all().unwrap().is_empty());

        store.set("go1.20.0", "A", "1").unwrap();
        store.set("go1.21.0", "B", "2").unwrap();
        std::fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["go1.20.0"]["A"], "1");
        assert_eq!(all["go1.21.0"]["B"], "2");
    }

    #[test]
    fn version_names_cannot_escape_the_directory() {
        let (_temp, store) = store();
        for version in ["", "..", "../x", "a/b"] {
            let err = store.set(version, "A", "1").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{version:?}");
        }
    }
}

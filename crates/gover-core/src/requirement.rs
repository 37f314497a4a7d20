use std::path::Path;

use gover_backend::{GoverError, Requirement, VersionId, VersionPolicy};
use log::debug;
use regex::Regex;

pub const PROJECT_FILE: &str = "go.mod";

const BASE_DIRECTIVE: &str = r"^go\s+(\d+\.\d+(?:\.\d+)?)";
const TOOLCHAIN_DIRECTIVE: &str = r"^toolchain\s+go(\d+\.\d+(?:\.\d+)?)";

/// What a project directory says about the version it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRequirement {
    /// No project file in the directory.
    NoFile,
    /// A project file without a version directive.
    Unspecified,
    Declared(Requirement),
}

impl ProjectRequirement {
    #[must_use]
    pub fn declared(&self) -> Option<&Requirement> {
        match self {
            Self::Declared(requirement) => Some(requirement),
            Self::NoFile | Self::Unspecified => None,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, GoverError> {
    Regex::new(pattern).map_err(|e| GoverError::InvalidPattern {
        details: e.to_string(),
    })
}

/// Extract the base and toolchain directives from project file contents.
/// The last matching line of each kind wins.
///
/// # Errors
/// Returns an error if a captured version does not parse.
pub fn parse_requirement(
    contents: &str,
    policy: &VersionPolicy,
) -> Result<Option<Requirement>, GoverError> {
    let base_re = compile(BASE_DIRECTIVE)?;
    let toolchain_re = compile(TOOLCHAIN_DIRECTIVE)?;

    let mut base: Option<VersionId> = None;
    let mut toolchain: Option<VersionId> = None;

    for line in contents.lines().map(str::trim) {
        if let Some(captures) = base_re.captures(line) {
            base = Some(captures[1].parse()?);
        } else if let Some(captures) = toolchain_re.captures(line) {
            toolchain = Some(captures[1].parse()?);
        }
    }

    Ok(Requirement::from_directives(base, toolchain, policy))
}

/// Read the project requirement declared in `dir`.
///
/// # Errors
/// Returns an IO error if the project file exists but cannot be read, or a
/// parse error for an invalid directive.
pub fn read_project_requirement(
    dir: &Path,
    policy: &VersionPolicy,
) -> Result<ProjectRequirement, GoverError> {
    let path = dir.join(PROJECT_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {PROJECT_FILE} in {}", dir.display());
            return Ok(ProjectRequirement::NoFile);
        }
        Err(error) => return Err(GoverError::io_at(&path, &error)),
    };

    match parse_requirement(&contents, policy)? {
        Some(requirement) => {
            debug!(
                "{} requires {}",
                path.display(),
                requirement.effective
            );
            Ok(ProjectRequirement::Declared(requirement))
        }
        None => Ok(ProjectRequirement::Unspecified),
    }
}

#[cfg(test)]
mod tests {
    use gover_backend::{ErrorKind, VersionPolicy};

    use super::{ProjectRequirement, parse_requirement, read_project_requirement};

    fn effective(contents: &str) -> Option<String> {
        parse_requirement(contents, &VersionPolicy::default())
            .unwrap()
            .map(|r| r.effective.to_string())
    }

    #[test]
    fn base_directive_is_normalized() {
        assert_eq!(
            effective("module example.com/app\n\ngo 1.21\n").as_deref(),
            Some("go1.21.0")
        );
        assert_eq!(effective("go 1.20\n").as_deref(), Some("go1.20"));
        assert_eq!(effective("go 1.22.4\n").as_deref(), Some("go1.22.4"));
    }

    #[test]
    fn toolchain_overrides_only_when_greater() {
        assert_eq!(
            effective("go 1.21\ntoolchain go1.22.1\n").as_deref(),
            Some("go1.22.1")
        );
        assert_eq!(
            effective("go 1.22.3\ntoolchain go1.21.0\n").as_deref(),
            Some("go1.22.3")
        );
        assert_eq!(effective("toolchain go1.23.0\n").as_deref(), Some("go1.23.0"));
    }

    #[test]
    fn last_matching_line_wins() {
        assert_eq!(effective("go 1.19\ngo 1.21.5\n").as_deref(), Some("go1.21.5"));
    }

    #[test]
    fn trailing_text_and_indentation_are_tolerated() {
        assert_eq!(
            effective("  go 1.22.0 // pinned\n").as_deref(),
            Some("go1.22.0")
        );
    }

    #[test]
    fn unrelated_lines_do_not_match() {
        assert_eq!(effective("module go\nrequire golang.org/x/mod v0.14.0\n"), None);
        assert_eq!(effective("gopher 1.21\n"), None);
    }

    #[test]
    fn missing_file_and_unspecified_are_distinct() {
        let temp = tempfile::tempdir().unwrap();
        let policy = VersionPolicy::default();

        assert_eq!(
            read_project_requirement(temp.path(), &policy).unwrap(),
            ProjectRequirement::NoFile
        );

        std::fs::write(temp.path().join("go.mod"), "module example.com/app\n").unwrap();
        assert_eq!(
            read_project_requirement(temp.path(), &policy).unwrap(),
            ProjectRequirement::Unspecified
        );

        std::fs::write(
            temp.path().join("go.mod"),
            "module example.com/app\n\ngo 1.22.1\n",
        )
        .unwrap();
        let declared = read_project_requirement(temp.path(), &policy).unwrap();
        assert_eq!(
            declared.declared().unwrap().effective.to_string(),
            "go1.22.1"
        );
    }

    #[test]
    fn unreadable_project_file_is_an_io_error() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("go.mod")).unwrap();

        let err = read_project_requirement(temp.path(), &VersionPolicy::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}

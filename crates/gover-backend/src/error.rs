use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoverError {
    #[error(transparent)]
    ParseError(#[from] crate::types::VersionParseError),

    #[error("Invalid version name {name:?}: {reason}")]
    InvalidVersionName { name: String, reason: &'static str },

    #[error("Version {version} is not supported (minimum supported is {minimum})")]
    UnsupportedVersion { version: String, minimum: String },

    #[error("Version not installed: {version}")]
    NotInstalled { version: String },

    #[error("Installation of {version} is incomplete: missing {missing}")]
    IncompleteInstall { version: String, missing: String },

    #[error("No installed or available version satisfies requirement {requirement}")]
    NoCandidate { requirement: String },

    #[error("No stable version found in catalog")]
    NoStableVersion,

    #[error("Refusing to replace {path}: it exists and is not a symbolic link")]
    PointerNotSymlink { path: String },

    #[error("Refusing to remove {version}: it is the active version")]
    ActiveVersion { version: String },

    #[error("Installation failed during {phase}: {details}")]
    InstallFailed {
        phase: &'static str,
        details: String,
    },

    #[error("Network error during {operation} ({stage}): {details}")]
    NetworkError {
        operation: &'static str,
        stage: NetworkStage,
        details: String,
    },

    #[error("Timed out after {seconds}s during {operation}")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Corrupt {what} at {path}: {details}")]
    Corrupt {
        what: &'static str,
        path: String,
        details: String,
    },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Invalid pattern: {details}")]
    InvalidPattern { details: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response status")]
    Status,
    #[error("response parse")]
    ResponseParse,
}

/// Coarse classification shared by every gover error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; never worth retrying.
    Validation,
    NotFound,
    Io,
    Transport,
    Corruption,
    /// A mutation was refused to protect existing state.
    Guard,
    Unsupported,
}

impl GoverError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ParseError(_)
            | Self::InvalidVersionName { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidPattern { .. } => ErrorKind::Validation,
            Self::NotInstalled { .. }
            | Self::IncompleteInstall { .. }
            | Self::NoCandidate { .. }
            | Self::NoStableVersion => ErrorKind::NotFound,
            Self::PointerNotSymlink { .. } | Self::ActiveVersion { .. } => ErrorKind::Guard,
            Self::InstallFailed { .. } | Self::IoError { .. } => ErrorKind::Io,
            Self::NetworkError { .. } | Self::Timeout { .. } => ErrorKind::Transport,
            Self::Corrupt { .. } => ErrorKind::Corruption,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    pub fn install_failed(phase: &'static str, details: impl Into<String>) -> Self {
        Self::InstallFailed {
            phase,
            details: details.into(),
        }
    }

    pub fn network_request(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn network_request_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_request(operation, error.to_string())
    }

    pub fn network_status(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Status,
            details: details.into(),
        }
    }

    pub fn network_parse_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::NetworkError {
            operation,
            stage: NetworkStage::ResponseParse,
            details: error.to_string(),
        }
    }

    pub fn corrupt(what: &'static str, path: &Path, details: impl Into<String>) -> Self {
        Self::Corrupt {
            what,
            path: path.display().to_string(),
            details: details.into(),
        }
    }

    /// Wraps an IO error with the path it happened on.
    #[must_use]
    pub fn io_at(path: &Path, err: &std::io::Error) -> Self {
        Self::IoError {
            kind: err.kind(),
            message: format!("{}: {err}", path.display()),
        }
    }
}

impl From<std::io::Error> for GoverError {
    fn from(err: std::io::Error) -> Self {
        GoverError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

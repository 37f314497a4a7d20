use gover_backend::{ErrorKind, GoverError};
use gover_platform::GoverPathsError;
use gover_shell::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] GoverError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Paths(#[from] GoverPathsError),

    #[error("no active Go version; run `gover use <version>` first")]
    NoActiveVersion,

    #[error("{0}")]
    Usage(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(error) => error.kind(),
            Self::Env(error) => error.kind(),
            Self::Paths(_) | Self::Output(_) => ErrorKind::Io,
            Self::NoActiveVersion => ErrorKind::NotFound,
            Self::Usage(_) => ErrorKind::Validation,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use gover_backend::{ErrorKind, GoverError, NetworkStage};
    use gover_shell::EnvError;

    use super::CliError;

    #[test]
    fn kinds_follow_wrapped_errors() {
        let not_installed: CliError = GoverError::NotInstalled {
            version: "go1.22.3".to_string(),
        }
        .into();
        assert_eq!(not_installed.kind(), ErrorKind::NotFound);

        let protected: CliError = EnvError::Protected {
            name: "GOROOT".to_string(),
        }
        .into();
        assert_eq!(protected.kind(), ErrorKind::Validation);

        assert_eq!(CliError::NoActiveVersion.kind(), ErrorKind::NotFound);
        assert_eq!(CliError::usage("bad flag").kind(), ErrorKind::Validation);
    }

    #[test]
    fn exit_codes_distinguish_validation_and_not_found() {
        assert_eq!(CliError::usage("x").exit_code(), 2);
        assert_eq!(CliError::NoActiveVersion.exit_code(), 3);
        assert_eq!(
            CliError::from(GoverError::NetworkError {
                operation: "catalog fetch",
                stage: NetworkStage::Request,
                details: "refused".to_string(),
            })
            .exit_code(),
            1
        );
    }

    #[test]
    fn transparent_errors_keep_their_message() {
        let error: CliError = GoverError::ActiveVersion {
            version: "go1.22.3".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            GoverError::ActiveVersion {
                version: "go1.22.3".to_string(),
            }
            .to_string()
        );
    }
}

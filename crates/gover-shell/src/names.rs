use crate::overlay::EnvError;

/// Variables that control where the toolchain lives, how modules are
/// fetched and verified, and which platform is targeted.
pub const PROTECTED_VARIABLES: &[&str] = &[
    "GOROOT",
    "GOPATH",
    "GOPROXY",
    "GOSUMDB",
    "GONOPROXY",
    "GONOSUMDB",
    "GOPRIVATE",
    "GO111MODULE",
    "GOOS",
    "GOARCH",
    "CGO_ENABLED",
];

/// Case-insensitive membership in [`PROTECTED_VARIABLES`].
#[must_use]
pub fn is_protected(name: &str) -> bool {
    PROTECTED_VARIABLES
        .iter()
        .any(|protected| protected.eq_ignore_ascii_case(name))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_name(name: &str) -> Result<(), EnvError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(EnvError::InvalidName {
            name: name.to_string(),
        })
    }
}

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    Rc,
}

impl PreReleaseKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u32,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.number)
    }
}

/// A distribution identifier such as `go1.21.0`, `go1.20` or `go1.22rc1`.
///
/// Ordering and equality are semantic: the prefix is ignored, a missing
/// patch counts as zero, and a pre-release sorts before its release.
#[derive(Debug, Clone)]
pub struct VersionId {
    pub prefix: String,
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub pre: Option<PreRelease>,
}

impl VersionId {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            prefix: String::new(),
            major,
            minor,
            patch: Some(patch),
            pre: None,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    #[must_use]
    pub fn line(&self) -> MinorLine {
        MinorLine::new(self.major, self.minor)
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Always-three-component rendering, e.g. `go1.20` becomes `go1.20.0`.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = format!(
            "{}{}.{}.{}",
            self.prefix,
            self.major,
            self.minor,
            self.patch.unwrap_or(0)
        );
        if let Some(pre) = self.pre {
            out.push_str(&pre.to_string());
        }
        out
    }

    fn sort_key(&self) -> (u32, u32, u32, bool, Option<PreRelease>) {
        (
            self.major,
            self.minor,
            self.patch.unwrap_or(0),
            self.pre.is_none(),
            self.pre,
        )
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionId {}

impl Hash for VersionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.prefix, self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        if let Some(pre) = self.pre {
            write!(f, "{pre}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
    PreRelease,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::PreRelease => write!(f, "pre-release"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected [prefix]X.Y[.Z][rcN] format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version in {input}: {value:?}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
        input: String,
    },
}

fn parse_number(
    value: Option<&str>,
    component: VersionComponent,
    input: &str,
) -> Result<u32, VersionParseError> {
    let value = value.ok_or_else(|| VersionParseError::InvalidFormat {
        input: input.to_string(),
    })?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::InvalidComponent {
            component,
            value: value.to_string(),
            input: input.to_string(),
        });
    }
    value
        .parse()
        .map_err(|_| VersionParseError::InvalidComponent {
            component,
            value: value.to_string(),
            input: input.to_string(),
        })
}

fn parse_pre_release(value: &str, input: &str) -> Result<PreRelease, VersionParseError> {
    let invalid = || VersionParseError::InvalidComponent {
        component: VersionComponent::PreRelease,
        value: value.to_string(),
        input: input.to_string(),
    };

    let (kind, number) = if let Some(rest) = value.strip_prefix("alpha") {
        (PreReleaseKind::Alpha, rest)
    } else if let Some(rest) = value.strip_prefix("beta") {
        (PreReleaseKind::Beta, rest)
    } else if let Some(rest) = value.strip_prefix("rc") {
        (PreReleaseKind::Rc, rest)
    } else {
        return Err(invalid());
    };

    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let number = number.parse().map_err(|_| invalid())?;
    Ok(PreRelease { kind, number })
}

impl FromStr for VersionId {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let digits_at = input
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| VersionParseError::InvalidFormat {
                input: input.to_string(),
            })?;
        let (prefix, rest) = input.split_at(digits_at);
        if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(VersionParseError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let (numbers, pre) = match rest.find(|c: char| c.is_ascii_alphabetic()) {
            Some(at) => (&rest[..at], Some(parse_pre_release(&rest[at..], input)?)),
            None => (rest, None),
        };

        let mut parts = numbers.split('.');
        let major = parse_number(parts.next(), VersionComponent::Major, input)?;
        let minor = parse_number(parts.next(), VersionComponent::Minor, input)?;
        let patch = match parts.next() {
            Some(value) => Some(parse_number(Some(value), VersionComponent::Patch, input)?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(VersionId {
            prefix: prefix.to_string(),
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A `major.minor` release line such as `1.21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinorLine {
    pub major: u32,
    pub minor: u32,
}

impl MinorLine {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for MinorLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for MinorLine {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version: VersionId = s.parse()?;
        if version.patch.is_some() || version.pre.is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: s.trim().to_string(),
            });
        }
        Ok(version.line())
    }
}

impl TryFrom<String> for MinorLine {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MinorLine> for String {
    fn from(line: MinorLine) -> Self {
        line.to_string()
    }
}

/// Ecosystem rules applied to version strings, kept as data so that the
/// numbering convention of one toolchain is not baked into the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Two-component versions on or after this line gain an implicit `.0`.
    #[serde(default = "default_three_component_from")]
    pub three_component_from: MinorLine,

    #[serde(default = "default_minimum_supported")]
    pub minimum_supported: MinorLine,
}

fn default_prefix() -> String {
    "go".to_string()
}

fn default_three_component_from() -> MinorLine {
    MinorLine::new(1, 21)
}

fn default_minimum_supported() -> MinorLine {
    MinorLine::new(1, 13)
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            three_component_from: default_three_component_from(),
            minimum_supported: default_minimum_supported(),
        }
    }
}

impl VersionPolicy {
    #[must_use]
    pub fn normalize(&self, version: &VersionId) -> VersionId {
        let mut normalized = version.clone();
        if normalized.prefix.is_empty() {
            normalized.prefix.clone_from(&self.prefix);
        }
        if normalized.patch.is_none()
            && normalized.pre.is_none()
            && normalized.line() >= self.three_component_from
        {
            normalized.patch = Some(0);
        }
        normalized
    }

    /// Parse user or project input (`1.21`, `go1.22.3`) into normalized form.
    ///
    /// # Errors
    /// Returns an error if the input is not a valid version string.
    pub fn parse(&self, input: &str) -> Result<VersionId, VersionParseError> {
        let version: VersionId = input.parse()?;
        Ok(self.normalize(&version))
    }

    #[must_use]
    pub fn is_supported(&self, version: &VersionId) -> bool {
        version.line() >= self.minimum_supported
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildVariant {
    pub os: String,
    pub arch: String,
}

impl BuildVariant {
    #[must_use]
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub version: VersionId,
    pub stable: bool,
    pub variants: Vec<BuildVariant>,
}

impl CatalogEntry {
    #[must_use]
    pub fn supports(&self, os: &str, arch: &str) -> bool {
        self.variants.iter().any(|v| v.os == os && v.arch == arch)
    }
}

/// One release as published by the remote catalog, before filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRelease {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub kind: String,
}

impl RemoteFile {
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.kind == "source"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    /// Directory name under the versions root.
    pub name: String,
    pub version: VersionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Local,
    Remote,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Name to install under or switch to.
    pub name: String,
    pub version: VersionId,
    pub source: Source,
}

/// The minimum version a project declares it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub base: Option<VersionId>,
    pub toolchain: Option<VersionId>,
    pub effective: VersionId,
}

impl Requirement {
    /// Combine a base directive with an optional toolchain override. The
    /// override only wins when strictly greater than the base.
    #[must_use]
    pub fn from_directives(
        base: Option<VersionId>,
        toolchain: Option<VersionId>,
        policy: &VersionPolicy,
    ) -> Option<Self> {
        let base = base.map(|v| policy.normalize(&v));
        let toolchain = toolchain.map(|v| policy.normalize(&v));

        let effective = match (&base, &toolchain) {
            (Some(base), Some(toolchain)) if toolchain > base => toolchain.clone(),
            (Some(base), _) => base.clone(),
            (None, Some(toolchain)) => toolchain.clone(),
            (None, None) => return None,
        };

        Some(Self {
            base,
            toolchain,
            effective,
        })
    }
}

mod error;
mod traits;
mod types;

pub use error::{ErrorKind, GoverError, NetworkStage};
pub use traits::{CatalogSource, Installer};
pub use types::{
    BuildVariant, CatalogEntry, InstalledVersion, MinorLine, PreRelease, PreReleaseKind,
    RemoteFile, RemoteRelease, Requirement, Resolution, Source, VersionComponent, VersionId,
    VersionParseError, VersionPolicy,
};

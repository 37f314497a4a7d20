mod host;
mod paths;

pub use host::HostPlatform;
pub use paths::{GoverPaths, GoverPathsError, ROOT_ENV_VAR};

//! Toolchain management logic independent of the command-line surface:
//! - Scanning installed versions and removing them.
//! - Fetching and caching the remote release catalog.
//! - Reading project requirements and resolving them to a version.
//! - Atomically switching the active version.
//! - Installing through an external command.

mod atomic;
mod cache;
mod catalog;
mod installer;
mod inventory;
mod requirement;
mod resolver;
mod switch;

pub use cache::CatalogCache;
pub use catalog::{
    CATALOG_URL_ENV_VAR, CatalogFilter, DEFAULT_CATALOG_URL, HttpCatalogSource, VersionCatalog,
    cache_key, filter_releases, latest_stable, patch_releases,
};
pub use installer::CommandInstaller;
pub use inventory::{LocalInventory, expand_selector, validate_version_name};
pub use requirement::{PROJECT_FILE, ProjectRequirement, parse_requirement, read_project_requirement};
pub use resolver::{reconcile, resolve};
pub use switch::{ActivePointer, DISTRIBUTION_DIR, ENTRY_POINT};

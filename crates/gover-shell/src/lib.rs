#![allow(clippy::missing_errors_doc)]

mod names;
mod overlay;
mod script;

pub use names::{PROTECTED_VARIABLES, is_protected, validate_name};
pub use overlay::{EnvError, EnvOverlay, EnvStore};
pub use script::{render_exports, shell_quote};

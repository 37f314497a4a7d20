use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::names::is_protected;
use crate::overlay::EnvOverlay;

/// Wrap `value` in single quotes for POSIX shells.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Shell lines that apply `current`. With `clean`, variables set by any of
/// `others` but absent from `current` are unset first.
#[must_use]
pub fn render_exports(current: &EnvOverlay, others: &[&EnvOverlay], clean: bool) -> String {
    let mut out = String::new();

    if clean {
        let stale: BTreeSet<&str> = others
            .iter()
            .flat_map(|overlay| overlay.keys())
            .map(String::as_str)
            .filter(|name| !is_protected(name) && !current.contains_key(*name))
            .collect();
        for name in stale {
            let _ = writeln!(out, "unset {name}");
        }
    }

    for (name, value) in current {
        let _ = writeln!(out, "export {name}={}", shell_quote(value));
    }
    out
}

//! Pure selection logic. Nothing here touches the filesystem or network;
//! callers pass in the installed set and the catalog they already hold.

use gover_backend::{
    CatalogEntry, GoverError, InstalledVersion, Requirement, Resolution, Source, VersionId,
    VersionPolicy,
};
use log::debug;

fn ensure_supported(version: &VersionId, policy: &VersionPolicy) -> Result<(), GoverError> {
    if policy.is_supported(version) {
        Ok(())
    } else {
        Err(GoverError::UnsupportedVersion {
            version: version.to_string(),
            minimum: policy.minimum_supported.to_string(),
        })
    }
}

fn min_installed<'a>(
    minimum: &VersionId,
    installed: &'a [InstalledVersion],
    policy: &VersionPolicy,
) -> Option<&'a InstalledVersion> {
    installed
        .iter()
        .filter(|v| policy.is_supported(&v.version) && v.version >= *minimum)
        .min_by(|a, b| a.version.cmp(&b.version))
}

/// Pick the smallest version that satisfies `requirement`, preferring
/// installed versions over catalog entries.
///
/// # Errors
/// Returns `UnsupportedVersion` when the requirement is below the policy
/// floor and `NoCandidate` when nothing satisfies it.
pub fn resolve(
    requirement: &VersionId,
    installed: &[InstalledVersion],
    catalog: &[CatalogEntry],
    policy: &VersionPolicy,
) -> Result<Resolution, GoverError> {
    let requirement = policy.normalize(requirement);
    ensure_supported(&requirement, policy)?;

    if let Some(local) = min_installed(&requirement, installed, policy) {
        debug!("{requirement} satisfied locally by {}", local.name);
        return Ok(Resolution {
            name: local.name.clone(),
            version: local.version.clone(),
            source: Source::Local,
        });
    }

    let remote = catalog
        .iter()
        .filter(|entry| entry.stable)
        .filter(|entry| policy.is_supported(&entry.version) && entry.version >= requirement)
        .min_by(|a, b| a.version.cmp(&b.version));

    match remote {
        Some(entry) => {
            debug!("{requirement} satisfied remotely by {}", entry.version);
            Ok(Resolution {
                name: entry.version.to_string(),
                version: entry.version.clone(),
                source: Source::Remote,
            })
        }
        None => Err(GoverError::NoCandidate {
            requirement: requirement.to_string(),
        }),
    }
}

/// Decide what an explicit request should switch to given the project's
/// declared requirement.
///
/// A request that satisfies the requirement is honored as is. A request
/// below it is replaced by the smallest installed version that does.
///
/// # Errors
/// Returns `UnsupportedVersion` for a request below the floor and
/// `NoCandidate` when the request is too low and nothing installed
/// satisfies the requirement.
pub fn reconcile(
    requested: &VersionId,
    requirement: Option<&Requirement>,
    installed: &[InstalledVersion],
    policy: &VersionPolicy,
) -> Result<Resolution, GoverError> {
    let requested = policy.normalize(requested);
    ensure_supported(&requested, policy)?;

    if let Some(requirement) = requirement
        && requested < requirement.effective
    {
        debug!(
            "Requested {requested} is below project requirement {}",
            requirement.effective
        );
        return min_installed(&requirement.effective, installed, policy)
            .map(|local| Resolution {
                name: local.name.clone(),
                version: local.version.clone(),
                source: Source::Local,
            })
            .ok_or_else(|| GoverError::NoCandidate {
                requirement: requirement.effective.to_string(),
            });
    }

    let resolution = match installed.iter().find(|v| v.version == requested) {
        Some(local) => Resolution {
            name: local.name.clone(),
            version: local.version.clone(),
            source: Source::Local,
        },
        None => Resolution {
            name: requested.to_string(),
            version: requested,
            source: Source::Remote,
        },
    };
    Ok(resolution)
}

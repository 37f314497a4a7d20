use std::io::Write;
use std::path::{Path, PathBuf};

const STAGING_ATTEMPTS: u8 = 16;

/// Create a uniquely named sibling of `target` with `create`, retrying on
/// name collisions. The name carries the pid and a nanosecond timestamp so
/// concurrent processes never stage onto the same path.
pub(crate) fn stage<T>(
    target: &Path,
    mut create: impl FnMut(&Path) -> std::io::Result<T>,
) -> std::io::Result<(PathBuf, T)> {
    let parent = target.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "target path has no parent")
    })?;

    let file_name = target
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("gover");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    for attempt in 0..STAGING_ATTEMPTS {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match create(&candidate) {
            Ok(value) => return Ok((candidate, value)),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "failed to create unique temp path",
    ))
}

/// Rename `staged` over `target`, removing `staged` if the rename fails.
pub(crate) fn commit(staged: &Path, target: &Path) -> std::io::Result<()> {
    if let Err(error) = std::fs::rename(staged, target) {
        let _ = std::fs::remove_file(staged);
        return Err(error);
    }
    Ok(())
}

/// Replace `path` with `data` so readers see either the old or the new file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let (tmp_path, ()) = stage(path, |candidate| {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(candidate)?;
        file.write_all(data)
            .and_then(|()| file.sync_all())
            .inspect_err(|_| {
                let _ = std::fs::remove_file(candidate);
            })
    })?;

    commit(&tmp_path, path)
}

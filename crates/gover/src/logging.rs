use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// `gover.log` rotates to `gover.log.old`, replacing any earlier rotation.
fn rotated_path(log_path: &Path) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(".old");
    PathBuf::from(name)
}

fn rotate_if_oversized(log_path: &Path, max_log_size: u64) -> io::Result<bool> {
    match std::fs::metadata(log_path) {
        Ok(metadata) if metadata.len() > max_log_size => {
            std::fs::rename(log_path, rotated_path(log_path))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

fn open_log_file(log_path: &Path) -> io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

fn terminal_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Warnings go to stderr; `verbose` raises the terminal to debug. With
/// `file_logging`, debug output is also appended to `log_path`.
pub fn init_logging(log_path: &Path, verbose: bool, file_logging: bool, max_log_size: u64) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("gover")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        terminal_level(verbose),
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    let mut rotated = false;
    if file_logging {
        match rotate_if_oversized(log_path, max_log_size).and_then(|r| {
            rotated = r;
            open_log_file(log_path)
        }) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config, file)),
            Err(error) => eprintln!("warning: cannot open {}: {error}", log_path.display()),
        }
    }

    let _ = CombinedLogger::init(loggers);

    if rotated {
        log::debug!("Rotated log to {}", rotated_path(log_path).display());
    }
}

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use gover_backend::{GoverError, Installer, VersionId};
use log::{debug, error, info, trace};
use tokio::process::Command;

/// Runs a user-configured command to materialize a version.
///
/// Each argument may contain `{version}` and `{dest}`, replaced by the
/// version string and the destination directory.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandInstaller {
    #[must_use]
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    fn render(&self, version: &VersionId, destination: &Path) -> Vec<String> {
        let version = version.to_string();
        let destination = destination.display().to_string();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{version}", &version)
                    .replace("{dest}", &destination)
            })
            .collect()
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn install(&self, version: &VersionId, destination: &Path) -> Result<(), GoverError> {
        let argv = self.render(version, destination);
        let Some((program, args)) = argv.split_first() else {
            return Err(GoverError::Unsupported {
                operation: "install (no installer_command configured)",
            });
        };

        std::fs::create_dir_all(destination).map_err(|e| GoverError::io_at(destination, &e))?;

        info!("Executing installer: {}", argv.join(" "));
        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| GoverError::Timeout {
                operation: "install",
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| GoverError::install_failed("spawn", format!("{program}: {e}")))?;

        debug!("Installer exit status: {:?}", output.status);
        trace!("Installer stdout: {}", String::from_utf8_lossy(&output.stdout));

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Installer failed for {version}: stderr='{stderr}'");
        Err(GoverError::install_failed(
            "install",
            if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        ))
    }
}

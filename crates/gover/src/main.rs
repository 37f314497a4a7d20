mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use gover_platform::GoverPaths;

use crate::cli::Cli;
use crate::commands::Context;
use crate::error::CliError;
use crate::settings::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let paths = GoverPaths::new()?;
    let settings = Settings::load(&paths);

    logging::init_logging(
        &paths.log_file(),
        cli.verbose,
        cli.verbose || settings.debug_logging,
        settings.max_log_size_bytes,
    );
    log::debug!("Using root {}", paths.root.display());

    let project_dir = std::env::current_dir().map_err(gover_backend::GoverError::from)?;
    let context = Context::from_settings(paths, &settings, project_dir)?;

    let mut stdout = std::io::stdout().lock();
    context.execute(cli.command, &mut stdout).await
}

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Switch between installed Go toolchains.
#[derive(Debug, Parser)]
#[command(
    name = "gover",
    version,
    about = "Go toolchain version manager",
    after_help = "\
ENVIRONMENT VARIABLES:
    GOVER_ROOT           Installation root (default: ~/.gover)
    GOVER_CATALOG_URL    Release catalog URL (default: https://go.dev/dl/?mode=json&include=all)"
)]
pub struct Cli {
    /// Print debug output to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch to a version, installing it first if needed.
    ///
    /// A request older than the project's go.mod requirement is replaced by
    /// the oldest installed version that satisfies it.
    Use {
        /// Version such as `1.22.3`, `go1.22.3` or `1.22rc1`.
        version: String,
    },

    /// Switch to the version required by go.mod in the current directory.
    Auto,

    /// Print the active version.
    Current,

    /// List installed versions.
    List,

    /// List versions published in the release catalog.
    #[command(name = "list-remote")]
    ListRemote,

    /// Switch to the latest stable release.
    Latest,

    /// List patch releases of one minor line.
    Sub {
        /// Minor line such as `1.22`.
        line: String,
    },

    /// Remove installed versions.
    Uninstall {
        /// Installed names, versions, or minor lines (`1.22` removes every 1.22.x).
        #[arg(required = true)]
        selectors: Vec<String>,
    },

    /// Show or edit per-version environment variables.
    Env(EnvArgs),
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("action")
        .args(["write", "unset", "clear", "shell"])
        .multiple(false)
))]
pub struct EnvArgs {
    /// Set a variable for the active version.
    #[arg(long, value_name = "KEY=VALUE")]
    pub write: Option<String>,

    /// Remove a variable from the active version.
    #[arg(long, value_name = "KEY")]
    pub unset: Option<String>,

    /// Remove every variable of the active version.
    #[arg(long)]
    pub clear: bool,

    /// Print shell export lines for the active version.
    #[arg(long)]
    pub shell: bool,

    /// With --shell, also unset variables other versions define.
    #[arg(long, requires = "shell")]
    pub clean: bool,

    /// Target this version instead of the active one.
    #[arg(long = "for", value_name = "VERSION")]
    pub target: Option<String>,
}

//! Command-line interface for appxinst

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::installer::Action;

/// Install, upgrade or remove .appx and .appxbundle packages
///
/// Associate this program with the .appx and .appxbundle file extensions
/// to get an install prompt when opening a package.
#[derive(Parser, Debug)]
#[command(name = "appxinst")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Package to install when no subcommand is given
    pub package: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "APPXINST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not wait for a key press after a failure
    #[arg(long, global = true)]
    pub no_pause: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a package, or upgrade/replace/remove it if already installed
    Install(InstallArgs),

    /// Remove the installed package matching a package file
    Remove(RemoveArgs),

    /// Show information about a package
    Info(InfoArgs),

    /// List a package's dependencies and where they resolve from
    Deps(DepsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    /// Package file (.appx or .appxbundle)
    #[arg(required = true)]
    pub package: PathBuf,

    /// Action to take if the package is already installed
    #[arg(short, long, value_enum)]
    pub action: Option<Action>,

    /// Skip the prompt and use the configured default action
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Extra directory to search for framework packages
    #[arg(short = 'd', long = "deps-dir")]
    pub deps_dirs: Vec<PathBuf>,

    /// Shut down running instances of the package first
    #[arg(long)]
    pub force_shutdown: bool,
}

impl InstallArgs {
    /// Arguments for the bare `appxinst <PACKAGE>` form
    pub fn for_package(package: PathBuf) -> Self {
        Self {
            package,
            action: None,
            yes: false,
            deps_dirs: Vec::new(),
            force_shutdown: false,
        }
    }
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Package file whose identity should be removed
    #[arg(required = true)]
    pub package: PathBuf,

    /// Keep application data
    #[arg(long)]
    pub preserve_data: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Package file to inspect
    #[arg(required = true)]
    pub package: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = InfoFormat::Pretty)]
    pub format: InfoFormat,
}

/// Info output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    /// Human-readable pretty output
    Pretty,
    /// JSON output
    Json,
    /// TOML output
    Toml,
}

/// Arguments for the deps command
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Package file to inspect
    #[arg(required = true)]
    pub package: PathBuf,

    /// Extra directory to search for framework packages
    #[arg(short = 'd', long = "deps-dir")]
    pub deps_dirs: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Reset configuration to defaults
    Reset,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

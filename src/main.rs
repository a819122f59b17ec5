//! Appxinst - install Windows app packages from the command line
//!
//! Main entry point for the appxinst CLI application.

use std::process::ExitCode;

use anyhow::Context;
use console::{style, Term};
use tracing_subscriber::EnvFilter;

use appxinst::cli::{self, Cli, Commands, InstallArgs};
use appxinst::config::Config;

/// Set up logging based on CLI arguments and configuration
fn setup_logging(cli: &Cli, config: &Config) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.logging.color)
        .without_time()
        .init();
}

/// Wait for a key press so a console opened by a file association stays visible
fn pause() {
    let term = Term::stdout();
    if term.is_term() {
        println!("Press any key to continue...");
        let _ = term.read_key();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let config_path = match cli.config.clone().map_or_else(Config::config_path, Ok) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    let config = Config::load_from(&config_path);

    // Set up logging
    setup_logging(&cli, config.as_ref().unwrap_or(&Config::default()));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    console::set_colors_enabled(config.logging.color);

    let pause_on_error = config.general.pause_on_error && !cli.no_pause;

    // Run the application
    let success = match run(cli, &config, &config_path).await {
        Ok(success) => success,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            false
        }
    };

    if success {
        ExitCode::SUCCESS
    } else {
        if pause_on_error {
            pause();
        }
        ExitCode::FAILURE
    }
}

/// Main application logic
///
/// Returns whether every requested operation succeeded.
async fn run(cli: Cli, config: &Config, config_path: &std::path::Path) -> anyhow::Result<bool> {
    let command = match (cli.command, cli.package) {
        (Some(command), _) => command,
        (None, Some(package)) => Commands::Install(InstallArgs::for_package(package)),
        (None, None) => {
            println!("{}", cli::USAGE_HINT);
            return Ok(true);
        }
    };

    // Dispatch to appropriate command handler
    match command {
        Commands::Install(args) => {
            if !cli.quiet {
                println!("{} v{}\n", style(appxinst::NAME).bold(), style(appxinst::VERSION).dim());
            }
            cli::execute_install(&args, config)
                .await
                .with_context(|| format!("failed to deploy {}", args.package.display()))
        }
        Commands::Remove(args) => cli::execute_remove(&args, config)
            .await
            .with_context(|| format!("failed to remove {}", args.package.display())),
        Commands::Info(args) => {
            cli::execute_info(&args).await?;
            Ok(true)
        }
        Commands::Deps(args) => Ok(cli::execute_deps(&args, config).await?),
        Commands::Config(args) => {
            cli::execute_config(&args, config_path).await?;
            Ok(true)
        }
    }
}

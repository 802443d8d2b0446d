//! Reqscan - parse, check and rewrite pip requirements manifests
//!
//! Main entry point for the reqscan CLI application.

use std::process::ExitCode;

use console::style;
use tracing_subscriber::EnvFilter;

use reqscan::cli::{self, Cli, Commands};
use reqscan::config::Config;
use reqscan::error::Result;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Run the application
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

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
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Main application logic; `Ok(false)` means the command found problems
fn run(cli: Cli) -> Result<bool> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    setup_logging(&cli, &config);

    if !config.output.color {
        console::set_colors_enabled(false);
    }

    // Set number of parallel jobs
    if let Some(jobs) = cli.jobs.or(config.general.jobs) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Parse(args) => {
            cli::execute_parse(&args, &config)?;
            Ok(true)
        }
        Commands::Check(args) => {
            cli::execute_check(&args, &config)
        }
        Commands::Fmt(args) => {
            cli::execute_fmt(&args, &config)
        }
        Commands::Verify(args) => {
            cli::execute_verify(&args, &config)
        }
        Commands::Config(args) => {
            cli::execute_config(&args, &config_path)?;
            Ok(true)
        }
    }
}

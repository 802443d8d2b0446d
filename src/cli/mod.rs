//! Command-line interface for reqscan

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Reqscan - parse, check and rewrite pip requirements manifests
///
/// Reads requirements files, reports problems in them and writes them
/// back out in canonical form, JSON or TOML.
#[derive(Parser, Debug)]
#[command(name = "reqscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REQSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of parallel jobs (default: number of CPUs)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse manifests and print their contents
    Parse(ParseArgs),

    /// Check manifests for problems
    Check(CheckArgs),

    /// Rewrite a manifest in canonical form or another format
    Fmt(FmtArgs),

    /// Verify a local artifact against a requirement's pinned hashes
    Verify(VerifyArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the parse command
#[derive(Parser, Debug, Clone)]
pub struct ParseArgs {
    /// Manifest files or directories to scan
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = InfoFormat::Pretty)]
    pub format: InfoFormat,

    /// Fail on malformed lines instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the check command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Manifest files or directories to scan
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Fail on malformed lines instead of reporting them
    #[arg(long)]
    pub strict: bool,

    /// Require every requirement to be pinned with ==
    #[arg(long)]
    pub require_pins: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = InfoFormat::Pretty)]
    pub format: InfoFormat,
}

/// Arguments for the fmt command
#[derive(Parser, Debug, Clone)]
pub struct FmtArgs {
    /// Manifest file to rewrite
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long, conflicts_with = "check")]
    pub output: Option<PathBuf>,

    /// Output format (default: from configuration)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Only report whether the file is already canonical
    #[arg(long)]
    pub check: bool,

    /// Fail on malformed lines instead of dropping them
    #[arg(long)]
    pub strict: bool,

    /// Allow --output to drop lines that cannot be rewritten
    #[arg(long, requires = "output")]
    pub drop_skipped: bool,
}

/// Arguments for the verify command
#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    /// Manifest declaring the hashes
    #[arg(required = true)]
    pub manifest: PathBuf,

    /// Package whose hashes to check
    #[arg(short, long)]
    pub package: String,

    /// Downloaded artifact (wheel or sdist) to verify
    #[arg(short, long)]
    pub artifact: PathBuf,
}

/// Output format for rewritten manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Canonical requirements.txt text
    Requirements,
    /// JSON document
    Json,
    /// TOML document
    Toml,
}

impl OutputFormat {
    /// Look up a format by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "requirements" | "txt" => Some(Self::Requirements),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Configuration name of the format
    pub fn name(&self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    /// Human-readable pretty output
    Pretty,
    /// JSON output
    Json,
    /// TOML output
    Toml,
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
    /// Print the configuration file path
    Path,
    /// Reset configuration to defaults
    Reset {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
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

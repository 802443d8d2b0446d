//! Reqscan - parse, check and rewrite pip requirements manifests
//!
//! Reqscan reads `requirements.txt`-style dependency manifests into typed
//! values, checks them for common mistakes, and writes them back out as
//! canonical requirements text, JSON or TOML. It never resolves, downloads
//! or installs packages; that is left to the package installer.
//!
//! # Quick Start
//!
//! ```bash
//! # Show what a manifest declares
//! reqscan parse requirements.txt
//!
//! # Check every requirements file under a directory
//! reqscan check --require-pins .
//!
//! # Rewrite a manifest in canonical form
//! reqscan fmt requirements.txt -o requirements.txt
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod models;
pub mod parsers;

// Re-export commonly used types
pub use error::{ReqscanError, Result};
pub use models::{Constraint, IndexOverride, Manifest, Requirement, Version, VersionOp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Parse manifest text with the default lenient parser
///
/// # Example
///
/// ```
/// let manifest = reqscan::parse("--index-url https://pypi.python.org/simple/\ntqdm>=4.19.8\n").unwrap();
///
/// assert_eq!(manifest.index_url(), Some("https://pypi.python.org/simple/"));
/// assert_eq!(manifest.requirements[0].to_string(), "tqdm>=4.19.8");
/// ```
pub fn parse(text: &str) -> Result<Manifest> {
    parsers::RequirementsParser::new().parse_str(text)
}

/// Parse a manifest file, following `-r` includes
pub fn parse_file(path: &std::path::Path) -> Result<Manifest> {
    parsers::RequirementsParser::new().parse_file(path)
}

/// Check a manifest with default analysis settings
///
/// # Arguments
///
/// * `manifest` - Parsed manifest to check
///
/// # Returns
///
/// Analysis report on success
pub fn check(manifest: &Manifest) -> Result<analyzer::AnalysisReport> {
    let config = config::AnalysisConfig::default();
    analyzer::ManifestAnalyzer::new(manifest, &config).analyze()
}

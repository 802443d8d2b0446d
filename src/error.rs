//! Error types for reqscan

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for reqscan operations
#[derive(Error, Debug)]
pub enum ReqscanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: unsupported option {option}")]
    UnsupportedOption { line: usize, option: String },

    #[error("Requirement include cycle: {}", .chain.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHash(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for reqscan operations
pub type Result<T> = std::result::Result<T, ReqscanError>;

impl ReqscanError {
    /// Create a new parse error at the given line
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Line number the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } | Self::UnsupportedOption { line, .. } => Some(*line),
            _ => None,
        }
    }
}

//! Pinned artifact hashes (`--hash=<algorithm>:<digest>`)

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{ReqscanError, Result};

/// A hash attached to a requirement line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    /// Hash algorithm name, lowercase
    pub algorithm: String,
    /// Lowercase hex digest
    pub digest: String,
}

impl FileHash {
    /// Parse the value of a `--hash` option, e.g. `sha256:9f86d0...`
    pub fn parse(s: &str) -> Option<Self> {
        let (algorithm, digest) = s.trim().split_once(':')?;
        let algorithm = algorithm.trim().to_ascii_lowercase();
        let digest = digest.trim().to_ascii_lowercase();

        if algorithm.is_empty() || hex::decode(&digest).is_err() {
            return None;
        }

        Some(Self { algorithm, digest })
    }

    /// Check a local artifact against this hash
    pub fn verify(&self, path: &Path) -> Result<bool> {
        if self.algorithm != "sha256" {
            return Err(ReqscanError::UnsupportedHash(self.algorithm.clone()));
        }
        if !path.exists() {
            return Err(ReqscanError::file_not_found(path));
        }

        let actual = sha256_file(path)?;
        tracing::debug!("sha256 of {}: {}", path.display(), actual);
        Ok(actual == self.digest)
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

/// Compute the hex SHA-256 digest of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;

    Ok(hex::encode(hasher.finalize()))
}

//! Requirement representation and parsing

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::{Constraint, FileHash, Version, VersionOp};
use crate::error::{ReqscanError, Result};

/// Normalize a package name for comparison (PEP 503)
///
/// Lowercases and collapses runs of `-`, `_` and `.` into a single `-`,
/// so `Scikit_Learn` and `scikit-learn` compare equal.
pub fn normalize_name(name: &str) -> String {
    lazy_static::lazy_static! {
        static ref SEPARATORS: Regex = Regex::new(r"[-_.]+").unwrap();
    }

    SEPARATORS.replace_all(name.trim(), "-").to_ascii_lowercase()
}

/// A single dependency declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as written
    pub name: String,
    /// Optional extras (`pkg[extra1,extra2]`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    /// 1-based line number in the source manifest
    pub line: usize,
    /// Included manifest the requirement came from, if not the top-level one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Environment marker after `;`, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Version constraints, in declaration order
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Pinned artifact hashes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<FileHash>,
}

impl Requirement {
    /// Create an unconstrained requirement
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extras: Vec::new(),
            constraints: Vec::new(),
            marker: None,
            hashes: Vec::new(),
            line: 0,
            source: None,
        }
    }

    /// Create a requirement with a single constraint
    pub fn with_constraint(name: impl Into<String>, op: VersionOp, version: impl Into<String>) -> Self {
        let mut req = Self::new(name);
        req.constraints.push(Constraint::new(op, version));
        req
    }

    /// PEP 503 normalized name
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether the requirement has no version constraint at all
    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The exact version this requirement pins, if any
    pub fn pinned_version(&self) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.op.is_pin() && !c.version.ends_with(".*"))
            .map(|c| c.version.as_str())
    }

    /// Where the requirement was declared: `line 3`, or `base.txt:3` for included files
    pub fn location(&self) -> String {
        match &self.source {
            Some(path) => format!("{}:{}", path.display(), self.line),
            None => format!("line {}", self.line),
        }
    }

    /// Check a candidate version against every constraint
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Parse a requirement specifier such as `scikit-learn==0.21.3`
    ///
    /// The input must already be stripped of comments and `--hash` options.
    pub fn parse(s: &str, line: usize) -> Result<Self> {
        lazy_static::lazy_static! {
            static ref REQ_RE: Regex = Regex::new(
                r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?\s*(.*)$"
            ).unwrap();
            static ref CONSTRAINT_RE: Regex = Regex::new(
                r"^(===|==|!=|>=|<=|~=|>|<)\s*([A-Za-z0-9._+!*-]+)$"
            ).unwrap();
        }

        let (spec, marker) = match s.split_once(';') {
            Some((spec, marker)) => {
                let marker = marker.trim();
                if marker.is_empty() {
                    return Err(ReqscanError::parse(line, "empty environment marker"));
                }
                (spec.trim(), Some(marker.to_string()))
            }
            None => (s.trim(), None),
        };

        if spec.is_empty() {
            return Err(ReqscanError::parse(line, "empty requirement"));
        }

        let caps = REQ_RE
            .captures(spec)
            .ok_or_else(|| ReqscanError::parse(line, format!("invalid requirement: {}", spec)))?;

        let name = caps[1].to_string();

        let extras = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut rest = caps.get(3).map_or("", |m| m.as_str()).trim();
        // Legacy parenthesized form: `pkg (>=1.0)`
        if rest.starts_with('(') && rest.ends_with(')') {
            rest = rest[1..rest.len() - 1].trim();
        }

        let mut constraints = Vec::new();
        if !rest.is_empty() {
            for clause in rest.split(',') {
                let clause = clause.trim();
                let c = CONSTRAINT_RE.captures(clause).ok_or_else(|| {
                    ReqscanError::parse(line, format!("invalid version constraint '{}' for {}", clause, name))
                })?;
                let op = VersionOp::from_token(&c[1])
                    .ok_or_else(|| ReqscanError::parse(line, format!("unknown operator '{}'", &c[1])))?;
                constraints.push(Constraint::new(op, &c[2]));
            }
        }

        Ok(Self {
            name,
            extras,
            constraints,
            marker,
            hashes: Vec::new(),
            line,
            source: None,
        })
    }

    /// Format as a canonical requirements line
    pub fn to_requirement_string(&self) -> String {
        let mut out = self.name.clone();

        if !self.extras.is_empty() {
            out.push('[');
            out.push_str(&self.extras.join(","));
            out.push(']');
        }

        let constraints: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        out.push_str(&constraints.join(","));

        if let Some(ref marker) = self.marker {
            out.push_str("; ");
            out.push_str(marker);
        }

        for hash in &self.hashes {
            out.push_str(" --hash=");
            out.push_str(&hash.to_string());
        }

        out
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_requirement_string())
    }
}

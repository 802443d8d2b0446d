//! Parsed manifest representation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Requirement;

/// Which index option produced an override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    /// `--index-url` / `-i`: replaces the default index
    Primary,
    /// `--extra-index-url`: consulted in addition to the primary index
    Extra,
}

impl IndexKind {
    /// The long option name for this kind
    pub fn option(&self) -> &'static str {
        match self {
            Self::Primary => "--index-url",
            Self::Extra => "--extra-index-url",
        }
    }
}

/// A package index URL override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOverride {
    /// Override kind
    pub kind: IndexKind,
    /// Index URL as written
    pub url: String,
    /// 1-based line number
    pub line: usize,
}

impl IndexOverride {
    /// Create a new override
    pub fn new(kind: IndexKind, url: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            url: url.into(),
            line,
        }
    }

    /// Whether the URL uses plain HTTP
    pub fn is_insecure(&self) -> bool {
        self.url.to_ascii_lowercase().starts_with("http://")
    }
}

/// A nested manifest reference (`-r other.txt`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    /// Path as written in the manifest
    pub path: String,
    /// 1-based line number
    pub line: usize,
}

/// A line the lenient parser could not use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number
    pub line: usize,
    /// Included manifest the line came from, if not the top-level one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Line content after comment stripping
    pub content: String,
    /// Why the line was skipped
    pub reason: String,
}

/// A parsed requirements manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// File the manifest was read from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Number of comment lines
    #[serde(default)]
    pub comment_lines: usize,
    /// Number of blank lines
    #[serde(default)]
    pub blank_lines: usize,
    /// Primary index override (last one wins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_url: Option<IndexOverride>,
    /// Extra index URLs, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_index_urls: Vec<IndexOverride>,
    /// Dependency declarations, in declaration order
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Nested manifest references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Include>,
    /// Lines skipped in lenient mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedLine>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dependency declarations
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the manifest declares no dependencies
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Look up a requirement by name, comparing normalized names
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = super::normalize_name(name);
        self.requirements.iter().find(|r| r.normalized_name() == wanted)
    }

    /// The effective primary index URL, if overridden
    pub fn index_url(&self) -> Option<&str> {
        self.index_url.as_ref().map(|i| i.url.as_str())
    }

    /// Group requirements by normalized name
    pub fn by_normalized_name(&self) -> BTreeMap<String, Vec<&Requirement>> {
        let mut groups: BTreeMap<String, Vec<&Requirement>> = BTreeMap::new();
        for req in &self.requirements {
            groups.entry(req.normalized_name()).or_default().push(req);
        }
        groups
    }

    /// Attribute every requirement and skipped line without a source to `path`
    pub fn attribute_to(&mut self, path: &Path) {
        for req in self.requirements.iter_mut().filter(|r| r.source.is_none()) {
            req.source = Some(path.to_path_buf());
        }
        for skipped in self.skipped.iter_mut().filter(|s| s.source.is_none()) {
            skipped.source = Some(path.to_path_buf());
        }
    }

    /// Append another manifest's declarations (used for `-r` includes)
    ///
    /// Index overrides of the included manifest apply unless this manifest
    /// already set its own primary index.
    pub fn merge(&mut self, other: Manifest) {
        if self.index_url.is_none() {
            self.index_url = other.index_url;
        }
        self.extra_index_urls.extend(other.extra_index_urls);
        self.requirements.extend(other.requirements);
        self.includes.extend(other.includes);
        self.skipped.extend(other.skipped);
        self.comment_lines += other.comment_lines;
        self.blank_lines += other.blank_lines;
    }
}

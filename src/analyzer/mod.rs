//! Manifest checks

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::models::{Manifest, Requirement, Version, VersionOp};

/// Category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// A line the parser skipped
    Skipped,
    /// The same package declared more than once
    Duplicate,
    /// No version constraint, or not pinned when pins are required
    Unpinned,
    /// Constraints on one line that no version can satisfy
    Unsatisfiable,
    /// Two different names that look alike
    SimilarName,
    /// Index URL over plain HTTP
    InsecureIndex,
    /// Incomplete or invalid use of `--hash`
    Hashes,
    /// Pinned to a pre-release
    Prerelease,
}

/// A single analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Finding category
    pub kind: FindingKind,
    /// Line the finding refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Included manifest the line belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Human-readable message
    pub message: String,
}

impl Finding {
    /// Create a new finding
    pub fn new(kind: FindingKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            source: None,
            message: message.into(),
        }
    }

    /// Finding at the line a requirement was declared on
    pub fn at(kind: FindingKind, req: &Requirement, message: impl Into<String>) -> Self {
        Self::new(kind, Some(req.line), message).in_file(req.source.as_deref())
    }

    /// Attach the included manifest the finding refers to
    pub fn in_file(mut self, source: Option<&Path>) -> Self {
        self.source = source.map(Path::to_path_buf);
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{}:{}: {}", source.display(), line, self.message),
            (None, Some(line)) => write!(f, "line {}: {}", line, self.message),
            (_, None) => f.write_str(&self.message),
        }
    }
}

/// Analysis report
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Warning findings
    pub warnings: Vec<Finding>,
    /// Error findings
    pub errors: Vec<Finding>,
    /// Total requirement count
    pub requirement_count: usize,
    /// Requirements pinned to a single version
    pub pinned_count: usize,
    /// Requirements carrying at least one hash
    pub hashed_count: usize,
    /// Names of requirements without any constraint
    pub unconstrained: Vec<String>,
}

impl AnalysisReport {
    /// Whether any error was reported
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Iterate over findings of one kind, errors first
    pub fn findings(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |f| f.kind == kind)
    }
}

/// Manifest analyzer
pub struct ManifestAnalyzer<'a> {
    /// Manifest under analysis
    manifest: &'a Manifest,
    /// Analysis settings
    config: &'a AnalysisConfig,
}

impl<'a> ManifestAnalyzer<'a> {
    /// Create a new analyzer
    pub fn new(manifest: &'a Manifest, config: &'a AnalysisConfig) -> Self {
        Self { manifest, config }
    }

    /// Perform full analysis
    pub fn analyze(&self) -> Result<AnalysisReport> {
        let mut report = AnalysisReport {
            requirement_count: self.manifest.len(),
            ..Default::default()
        };

        self.check_skipped(&mut report);
        self.check_duplicates(&mut report);
        self.check_pins(&mut report);
        self.check_satisfiable(&mut report);
        self.check_similar_names(&mut report);
        self.check_indexes(&mut report);
        self.check_hashes(&mut report);

        tracing::debug!(
            "Analysis finished: {} error(s), {} warning(s)",
            report.errors.len(),
            report.warnings.len()
        );

        Ok(report)
    }

    fn check_skipped(&self, report: &mut AnalysisReport) {
        for skipped in &self.manifest.skipped {
            report.errors.push(
                Finding::new(
                    FindingKind::Skipped,
                    Some(skipped.line),
                    format!("ignored '{}': {}", skipped.content, skipped.reason),
                )
                .in_file(skipped.source.as_deref()),
            );
        }
    }

    fn check_duplicates(&self, report: &mut AnalysisReport) {
        for (name, reqs) in self.manifest.by_normalized_name() {
            if reqs.len() < 2 {
                continue;
            }
            let locations: Vec<String> = reqs.iter().map(|r| r.location()).collect();
            report.errors.push(Finding::at(
                FindingKind::Duplicate,
                reqs[1],
                format!("{} is declared more than once ({})", name, locations.join(", ")),
            ));
        }
    }

    fn check_pins(&self, report: &mut AnalysisReport) {
        for req in &self.manifest.requirements {
            if let Some(version) = req.pinned_version() {
                report.pinned_count += 1;

                if Version::parse(version).map_or(false, |v| v.is_prerelease()) {
                    report.warnings.push(Finding::at(
                        FindingKind::Prerelease,
                        req,
                        format!("{} is pinned to pre-release {}", req.name, version),
                    ));
                }
                continue;
            }

            if req.is_unconstrained() {
                report.unconstrained.push(req.name.clone());
            }

            if self.config.require_pins {
                report.errors.push(Finding::at(
                    FindingKind::Unpinned,
                    req,
                    format!("{} is not pinned with ==", req.name),
                ));
            } else if req.is_unconstrained() {
                report.warnings.push(Finding::at(
                    FindingKind::Unpinned,
                    req,
                    format!("{} has no version constraint", req.name),
                ));
            }
        }
    }

    fn check_satisfiable(&self, report: &mut AnalysisReport) {
        for req in &self.manifest.requirements {
            if let Some(reason) = unsatisfiable_reason(req) {
                report.errors.push(Finding::at(
                    FindingKind::Unsatisfiable,
                    req,
                    format!("{} can never be satisfied: {}", req.name, reason),
                ));
            }
        }
    }

    fn check_similar_names(&self, report: &mut AnalysisReport) {
        let groups = self.manifest.by_normalized_name();
        let names: Vec<(&String, &Requirement)> = groups
            .iter()
            .map(|(name, reqs)| (name, reqs[0]))
            .collect();

        for (i, (left, _)) in names.iter().enumerate() {
            for (right, req) in names.iter().skip(i + 1) {
                let score = jaro_winkler(left, right);
                if score >= self.config.similarity_threshold {
                    report.warnings.push(Finding::at(
                        FindingKind::SimilarName,
                        req,
                        format!("{} looks similar to {} (score {:.2})", right, left, score),
                    ));
                }
            }
        }
    }

    fn check_indexes(&self, report: &mut AnalysisReport) {
        if self.config.allow_http_index {
            return;
        }

        let indexes = self
            .manifest
            .index_url
            .iter()
            .chain(self.manifest.extra_index_urls.iter());

        for index in indexes.filter(|i| i.is_insecure()) {
            report.warnings.push(Finding::new(
                FindingKind::InsecureIndex,
                Some(index.line),
                format!("{} {} is not served over HTTPS", index.kind.option(), index.url),
            ));
        }
    }

    fn check_hashes(&self, report: &mut AnalysisReport) {
        let reqs = &self.manifest.requirements;
        report.hashed_count = reqs.iter().filter(|r| !r.hashes.is_empty()).count();

        if report.hashed_count == 0 {
            return;
        }

        for req in reqs {
            if req.hashes.is_empty() {
                report.errors.push(Finding::at(
                    FindingKind::Hashes,
                    req,
                    format!("{} has no --hash but other requirements do", req.name),
                ));
            } else if req.pinned_version().is_none() {
                report.errors.push(Finding::at(
                    FindingKind::Hashes,
                    req,
                    format!("{} has --hash but is not pinned with == or ===", req.name),
                ));
            }
        }
    }
}

/// Explain why a requirement's constraints exclude every version, if they do
fn unsatisfiable_reason(req: &Requirement) -> Option<String> {
    if let Some(pinned) = req.pinned_version() {
        if let Some(version) = Version::parse(pinned) {
            if let Some(clash) = req.constraints.iter().find(|c| !c.matches(&version)) {
                return Some(format!("pinned {} conflicts with {}", pinned, clash));
            }
        }
        return None;
    }

    let bound = |ops: &[VersionOp]| {
        req.constraints
            .iter()
            .filter(|c| ops.contains(&c.op))
            .filter_map(|c| c.parsed_version().map(|v| (c, v)))
            .collect::<Vec<_>>()
    };

    let lower = bound(&[VersionOp::Ge, VersionOp::Gt])
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| (a.0.op == VersionOp::Gt).cmp(&(b.0.op == VersionOp::Gt))));
    let upper = bound(&[VersionOp::Le, VersionOp::Lt])
        .into_iter()
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| (a.0.op == VersionOp::Lt).cmp(&(b.0.op == VersionOp::Lt)).reverse()));

    let ((low_c, low_v), (high_c, high_v)) = (lower?, upper?);
    let empty = low_v > high_v
        || (low_v == high_v && (low_c.op == VersionOp::Gt || high_c.op == VersionOp::Lt));

    empty.then(|| format!("{} excludes {}", low_c, high_c))
}

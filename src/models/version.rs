//! Version constraints and version comparison

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Version comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionOp {
    /// Exact match (==)
    #[serde(rename = "==")]
    Eq,
    /// Exclusion (!=)
    #[serde(rename = "!=")]
    Ne,
    /// Greater than or equal (>=)
    #[serde(rename = ">=")]
    Ge,
    /// Less than or equal (<=)
    #[serde(rename = "<=")]
    Le,
    /// Greater than (>)
    #[serde(rename = ">")]
    Gt,
    /// Less than (<)
    #[serde(rename = "<")]
    Lt,
    /// Compatible release (~=)
    #[serde(rename = "~=")]
    Compatible,
    /// Arbitrary string equality (===)
    #[serde(rename = "===")]
    Arbitrary,
}

impl VersionOp {
    /// All operators, longest token first so prefix scanning is unambiguous
    pub const ALL: [VersionOp; 8] = [
        Self::Arbitrary,
        Self::Eq,
        Self::Ne,
        Self::Ge,
        Self::Le,
        Self::Compatible,
        Self::Gt,
        Self::Lt,
    ];

    /// The operator token as it appears in a manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
        }
    }

    /// Parse an operator token
    pub fn from_token(op: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == op.trim())
    }

    /// Whether this operator fixes a single version
    pub fn is_pin(&self) -> bool {
        matches!(self, Self::Eq | Self::Arbitrary)
    }
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release phase of a version, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Phase {
    Dev,
    Alpha,
    Beta,
    Candidate,
    Final,
    Post,
}

impl Phase {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "dev" => Some(Self::Dev),
            "a" | "alpha" => Some(Self::Alpha),
            "b" | "beta" => Some(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Some(Self::Candidate),
            "post" | "rev" | "r" => Some(Self::Post),
            _ => None,
        }
    }
}

/// A parsed package version such as `1.0.0`, `0.21.3`, `2.0rc1` or `1.4.*`
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    epoch: u64,
    release: Vec<u64>,
    phase: Phase,
    phase_number: u64,
    wildcard: bool,
}

impl Version {
    /// Parse a version string, returning `None` if it is not a recognizable release
    pub fn parse(s: &str) -> Option<Self> {
        lazy_static::lazy_static! {
            static ref VERSION_RE: Regex = Regex::new(
                r"(?i)^v?(?:(\d+)!)?(\d+(?:\.\d+)*)(\.\*)?(?:[-_.]?([a-z]+)[-_.]?(\d*))?(?:\+[a-z0-9.]+)?$"
            ).unwrap();
        }

        let raw = s.trim();
        let caps = VERSION_RE.captures(raw)?;

        let epoch = match caps.get(1) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let release = caps
            .get(2)?
            .as_str()
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let wildcard = caps.get(3).is_some();

        let (phase, phase_number) = match caps.get(4) {
            Some(label) => {
                if wildcard {
                    return None;
                }
                let phase = Phase::from_label(label.as_str())?;
                let number = caps
                    .get(5)
                    .map(|m| m.as_str())
                    .filter(|n| !n.is_empty())
                    .map_or(Some(0), |n| n.parse::<u64>().ok())?;
                (phase, number)
            }
            None => (Phase::Final, 0),
        };

        Some(Self {
            raw: raw.to_string(),
            epoch,
            release,
            phase,
            phase_number,
            wildcard,
        })
    }

    /// The version exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release segments
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Whether the version ends in `.*`
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether this is a pre-release or development release
    pub fn is_prerelease(&self) -> bool {
        self.phase < Phase::Final
    }

    /// Whether `self` starts with the release segments of `prefix`
    fn has_release_prefix(&self, prefix: &[u64]) -> bool {
        (0..prefix.len()).all(|i| self.release.get(i).copied().unwrap_or(0) == prefix[i])
    }
}

fn cmp_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.phase.cmp(&other.phase))
            .then_with(|| self.phase_number.cmp(&other.phase_number))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A single `<op><version>` clause of a requirement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// Comparison operator, preserved as written
    pub op: VersionOp,
    /// Version text, preserved as written
    pub version: String,
}

impl Constraint {
    /// Create a new constraint
    pub fn new(op: VersionOp, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    /// Parse the constraint version, if it is a recognizable release
    pub fn parsed_version(&self) -> Option<Version> {
        Version::parse(&self.version)
    }

    /// Check whether a candidate version satisfies this constraint
    ///
    /// Unparseable versions never match, except under `===` where plain
    /// string equality applies.
    pub fn matches(&self, candidate: &Version) -> bool {
        if self.op == VersionOp::Arbitrary {
            return candidate.as_str() == self.version.trim();
        }

        let Some(bound) = self.parsed_version() else {
            return false;
        };

        match self.op {
            VersionOp::Eq if bound.is_wildcard() => candidate.has_release_prefix(bound.release()),
            VersionOp::Ne if bound.is_wildcard() => !candidate.has_release_prefix(bound.release()),
            VersionOp::Eq => *candidate == bound,
            VersionOp::Ne => *candidate != bound,
            VersionOp::Ge => *candidate >= bound,
            VersionOp::Le => *candidate <= bound,
            VersionOp::Gt => *candidate > bound,
            VersionOp::Lt => *candidate < bound,
            VersionOp::Compatible => {
                let release = bound.release();
                if release.len() < 2 {
                    return false;
                }
                *candidate >= bound && candidate.has_release_prefix(&release[..release.len() - 1])
            }
            VersionOp::Arbitrary => unreachable!("handled above"),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_op_tokens() {
        assert_eq!(VersionOp::from_token(">="), Some(VersionOp::Ge));
        assert_eq!(VersionOp::from_token("=="), Some(VersionOp::Eq));
        assert_eq!(VersionOp::from_token("==="), Some(VersionOp::Arbitrary));
        assert_eq!(VersionOp::from_token("=>"), None);
        assert_eq!(VersionOp::Compatible.to_string(), "~=");
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("0.21.3") > v("0.21"));
        assert!(v("1.0.0") == v("1"));
        assert!(v("4.19.8") < v("4.20"));
        assert!(v("2.0rc1") < v("2.0"));
        assert!(v("2.0.dev1") < v("2.0a1"));
        assert!(v("2.0.post1") > v("2.0"));
        assert!(v("1!0.1") > v("9.9"));
    }

    #[test]
    fn test_unparseable_version() {
        assert!(Version::parse("latest").is_none());
        assert!(Version::parse("1.0.*rc1").is_none());
        assert!(Version::parse("").is_none());
    }

    #[test]
    fn test_constraint_matches() {
        let ge = Constraint::new(VersionOp::Ge, "4.19.8");
        assert!(ge.matches(&v("4.19.8")));
        assert!(ge.matches(&v("4.64.1")));
        assert!(!ge.matches(&v("4.19.7")));

        let eq = Constraint::new(VersionOp::Eq, "0.21.3");
        assert!(eq.matches(&v("0.21.3")));
        assert!(!eq.matches(&v("0.22.0")));
    }

    #[test]
    fn test_wildcard_and_compatible() {
        let eq = Constraint::new(VersionOp::Eq, "1.4.*");
        assert!(eq.matches(&v("1.4.2")));
        assert!(!eq.matches(&v("1.5.0")));

        let ne = Constraint::new(VersionOp::Ne, "1.4.*");
        assert!(ne.matches(&v("1.5")));

        let compat = Constraint::new(VersionOp::Compatible, "2.2.1");
        assert!(compat.matches(&v("2.2.9")));
        assert!(!compat.matches(&v("2.3.0")));
        assert!(!Constraint::new(VersionOp::Compatible, "2").matches(&v("2.1")));
    }

    #[test]
    fn test_arbitrary_equality() {
        let c = Constraint::new(VersionOp::Arbitrary, "1.0");
        assert!(c.matches(&v("1.0")));
        assert!(!c.matches(&v("1.0.0")));
    }
}

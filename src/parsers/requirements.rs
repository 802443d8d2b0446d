//! pip requirements file parser
//!
//! Each logical line of a requirements file is one of:
//! - a blank line
//! - a comment (`# ...`)
//! - an option (`--index-url URL`, `-r other.txt`, ...)
//! - a dependency (`name[extras]<op><version>,...; marker --hash=alg:hex`)
//!
//! A trailing `\` joins a line with the next one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{ReqscanError, Result};
use crate::models::{FileHash, Include, IndexKind, IndexOverride, Manifest, Requirement, SkippedLine};

/// Parser for requirements manifests
#[derive(Debug, Clone, Default)]
pub struct RequirementsParser {
    /// Reject malformed lines and unsupported options instead of skipping them
    strict: bool,
}

/// A logical line with its starting physical line number
struct LogicalLine {
    number: usize,
    content: String,
}

impl RequirementsParser {
    /// Create a new lenient parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable strict mode
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse manifest text
    ///
    /// `-r` includes are recorded but not followed; use [`parse_file`](Self::parse_file)
    /// to resolve them.
    pub fn parse_str(&self, text: &str) -> Result<Manifest> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut manifest = Manifest::new();

        for logical in self.logical_lines(text, &mut manifest) {
            if let Err(e) = self.parse_line(&logical, &mut manifest) {
                if self.strict {
                    return Err(e);
                }
                tracing::warn!("Skipping line {}: {}", logical.number, e);
                manifest.skipped.push(SkippedLine {
                    line: logical.number,
                    source: None,
                    content: logical.content.clone(),
                    reason: e.to_string(),
                });
            }
        }

        tracing::debug!(
            "Parsed {} requirements ({} comments, {} blank, {} skipped)",
            manifest.requirements.len(),
            manifest.comment_lines,
            manifest.blank_lines,
            manifest.skipped.len()
        );

        Ok(manifest)
    }

    /// Parse a manifest file, following `-r` includes relative to it
    ///
    /// Each file is merged once, even when several manifests include it.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut stack = Vec::new();
        let mut visited = HashSet::new();
        self.parse_file_inner(path.as_ref(), &mut stack, &mut visited)
    }

    fn parse_file_inner(
        &self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<Manifest> {
        if !path.exists() {
            return Err(ReqscanError::file_not_found(path));
        }

        let canonical = path.canonicalize()?;
        if stack.contains(&canonical) {
            let mut chain = stack.clone();
            chain.push(canonical);
            return Err(ReqscanError::IncludeCycle { chain });
        }
        visited.insert(canonical.clone());

        tracing::debug!("Reading {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let mut manifest = self.parse_str(&text)?;
        manifest.source = Some(path.to_path_buf());

        stack.push(canonical);
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for include in manifest.includes.clone() {
            let nested_path = base.join(&include.path);
            if let Ok(nested_canonical) = nested_path.canonicalize() {
                if !stack.contains(&nested_canonical) && visited.contains(&nested_canonical) {
                    tracing::debug!("{} is already included", nested_path.display());
                    continue;
                }
            }
            let mut nested = self.parse_file_inner(&nested_path, stack, visited)?;
            nested.attribute_to(&nested_path);
            manifest.merge(nested);
        }
        stack.pop();

        Ok(manifest)
    }

    /// Split text into logical lines, counting comments and blanks on the way
    fn logical_lines(&self, text: &str, manifest: &mut Manifest) -> Vec<LogicalLine> {
        let mut lines = Vec::new();
        let mut pending: Option<LogicalLine> = None;

        for (idx, raw) in text.lines().enumerate() {
            let number = idx + 1;
            let trimmed = raw.trim();

            if pending.is_none() {
                if trimmed.is_empty() {
                    manifest.blank_lines += 1;
                    continue;
                }
                if trimmed.starts_with('#') {
                    manifest.comment_lines += 1;
                    continue;
                }
            }

            let (body, continues) = match trimmed.strip_suffix('\\') {
                Some(body) => (body, true),
                None => (trimmed, false),
            };

            let current = pending.get_or_insert_with(|| LogicalLine {
                number,
                content: String::new(),
            });
            if !current.content.is_empty() && !body.is_empty() {
                current.content.push(' ');
            }
            current.content.push_str(body.trim());

            if !continues {
                if let Some(mut done) = pending.take() {
                    done.content = strip_inline_comment(&done.content);
                    if done.content.is_empty() {
                        // A continuation that held only a comment
                        manifest.comment_lines += 1;
                    } else {
                        lines.push(done);
                    }
                }
            }
        }

        // A trailing backslash on the last line
        if let Some(mut done) = pending.take() {
            done.content = strip_inline_comment(&done.content);
            if !done.content.is_empty() {
                lines.push(done);
            }
        }

        lines
    }

    fn parse_line(&self, logical: &LogicalLine, manifest: &mut Manifest) -> Result<()> {
        if logical.content.starts_with('-') {
            self.parse_option(logical, manifest)
        } else {
            let req = self.parse_requirement(logical)?;
            manifest.requirements.push(req);
            Ok(())
        }
    }

    /// Parse a global option line such as `--index-url https://...`
    fn parse_option(&self, logical: &LogicalLine, manifest: &mut Manifest) -> Result<()> {
        let line = logical.number;
        let (name, value) = split_option(&logical.content);

        let require_value = |value: &str| -> Result<String> {
            if value.is_empty() {
                Err(ReqscanError::parse(line, format!("option {} requires a value", name)))
            } else {
                Ok(value.to_string())
            }
        };

        match name {
            "-i" | "--index-url" => {
                let url = require_value(value)?;
                if let Some(previous) = &manifest.index_url {
                    tracing::warn!(
                        "Line {}: index URL {} replaces {} from line {}",
                        line,
                        url,
                        previous.url,
                        previous.line
                    );
                }
                manifest.index_url = Some(IndexOverride::new(IndexKind::Primary, url, line));
            }
            "--extra-index-url" => {
                let url = require_value(value)?;
                manifest
                    .extra_index_urls
                    .push(IndexOverride::new(IndexKind::Extra, url, line));
            }
            "-r" | "--requirement" => {
                let path = require_value(value)?;
                manifest.includes.push(Include { path, line });
            }
            _ => {
                return Err(ReqscanError::UnsupportedOption {
                    line,
                    option: name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Parse a dependency line, including trailing `--hash` options
    fn parse_requirement(&self, logical: &LogicalLine) -> Result<Requirement> {
        let line = logical.number;
        let content = logical.content.as_str();

        let (spec, options) = match content.find(" --") {
            Some(pos) => (&content[..pos], content[pos..].trim()),
            None => (content, ""),
        };

        let mut req = Requirement::parse(spec, line)?;

        let mut tokens = options.split_whitespace();
        while let Some(token) = tokens.next() {
            let (name, inline_value) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token, None),
            };

            if name != "--hash" {
                return Err(ReqscanError::UnsupportedOption {
                    line,
                    option: name.to_string(),
                });
            }

            let value = inline_value
                .or_else(|| tokens.next())
                .ok_or_else(|| ReqscanError::parse(line, "--hash requires a value"))?;
            let hash = FileHash::parse(value)
                .ok_or_else(|| ReqscanError::parse(line, format!("invalid hash '{}'", value)))?;
            req.hashes.push(hash);
        }

        Ok(req)
    }
}

/// Drop a trailing ` # comment`, keeping `#` inside tokens such as URL fragments
fn strip_inline_comment(content: &str) -> String {
    lazy_static::lazy_static! {
        static ref INLINE_COMMENT: Regex = Regex::new(r"(^|\s+)#.*$").unwrap();
    }

    let stripped = INLINE_COMMENT.replace(content, "");
    stripped.trim().to_string()
}

/// Split `--name value`, `--name=value` or `-xvalue` into name and value
fn split_option(content: &str) -> (&str, &str) {
    let (head, rest) = match content.find(char::is_whitespace) {
        Some(pos) => (&content[..pos], content[pos..].trim()),
        None => (content, ""),
    };

    if let Some((name, value)) = head.split_once('=') {
        if name.starts_with("--") {
            return (name, value.trim());
        }
    }

    // Short option glued to its value: `-rbase.txt`
    if !head.starts_with("--") && head.len() > 2 && head.is_char_boundary(2) && rest.is_empty() {
        return (&head[..2], &head[2..]);
    }

    (head, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionOp;
    use std::fs;

    const RAFOFC_REQUIREMENTS: &str = "\
# Packages required by rafofc
# Install with: pip install -r requirements.txt
--index-url https://pypi.python.org/simple/

pytecplot>=1.0.0
scikit-learn==0.21.3
tqdm>=4.19.8
pytest>=5.1.2
tbnns==0.4.0
";

    #[test]
    fn test_parse_reference_manifest() {
        let manifest = RequirementsParser::new().parse_str(RAFOFC_REQUIREMENTS).unwrap();

        let rendered: Vec<String> = manifest.requirements.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "pytecplot>=1.0.0",
                "scikit-learn==0.21.3",
                "tqdm>=4.19.8",
                "pytest>=5.1.2",
                "tbnns==0.4.0",
            ]
        );
        assert_eq!(manifest.index_url(), Some("https://pypi.python.org/simple/"));
        assert_eq!(manifest.index_url.as_ref().unwrap().line, 3);
        assert_eq!(manifest.comment_lines, 2);
        assert_eq!(manifest.blank_lines, 1);
        assert!(manifest.skipped.is_empty());

        let ops: Vec<VersionOp> = manifest.requirements.iter().map(|r| r.constraints[0].op).collect();
        assert_eq!(
            ops,
            vec![VersionOp::Ge, VersionOp::Eq, VersionOp::Ge, VersionOp::Ge, VersionOp::Eq]
        );
        assert_eq!(manifest.requirements[1].line, 6);
    }

    #[test]
    fn test_index_url_forms() {
        let parser = RequirementsParser::new();

        let m = parser.parse_str("--index-url=https://a/simple/\n").unwrap();
        assert_eq!(m.index_url(), Some("https://a/simple/"));

        let m = parser.parse_str("-i https://b/simple/\n").unwrap();
        assert_eq!(m.index_url(), Some("https://b/simple/"));

        let m = parser
            .parse_str("-i https://a/simple/\n--index-url https://b/simple/\n--extra-index-url https://c/simple/\n")
            .unwrap();
        assert_eq!(m.index_url(), Some("https://b/simple/"));
        assert_eq!(m.extra_index_urls.len(), 1);
        assert_eq!(m.extra_index_urls[0].kind, IndexKind::Extra);
    }

    #[test]
    fn test_inline_comments_and_continuations() {
        let text = "numpy>=1.16 # numerics\nrequests \\\n  >=2.0 \\\n  ,<3\n\n   \n";
        let m = RequirementsParser::new().parse_str(text).unwrap();

        assert_eq!(m.len(), 2);
        assert_eq!(m.requirements[0].to_string(), "numpy>=1.16");
        assert_eq!(m.requirements[1].to_string(), "requests>=2.0,<3");
        assert_eq!(m.requirements[1].line, 2);
        assert_eq!(m.blank_lines, 2);
    }

    #[test]
    fn test_hash_options() {
        let text = "tqdm==4.19.8 \\\n    --hash=sha256:ABCD \\\n    --hash sha256:ef01\n";
        let m = RequirementsParser::new().parse_str(text).unwrap();

        let req = &m.requirements[0];
        assert_eq!(req.hashes.len(), 2);
        assert_eq!(req.hashes[0].digest, "abcd");
        assert_eq!(req.to_string(), "tqdm==4.19.8 --hash=sha256:abcd --hash=sha256:ef01");
    }

    #[test]
    fn test_lenient_skips_bad_lines() {
        let text = "good==1.0\npytest=>5.1.2\n--trusted-host example.com\n-e .\n";
        let m = RequirementsParser::new().parse_str(text).unwrap();

        assert_eq!(m.len(), 1);
        let skipped: Vec<usize> = m.skipped.iter().map(|s| s.line).collect();
        assert_eq!(skipped, vec![2, 3, 4]);
    }

    #[test]
    fn test_strict_rejects_bad_lines() {
        let parser = RequirementsParser::new().strict(true);

        let err = parser.parse_str("good==1.0\npytest=>5.1.2\n").unwrap_err();
        assert_eq!(err.line(), Some(2));

        let err = parser.parse_str("--trusted-host example.com\n").unwrap_err();
        assert!(matches!(err, ReqscanError::UnsupportedOption { ref option, .. } if option == "--trusted-host"));

        assert!(parser.parse_str("--index-url\n").is_err());
        assert!(parser.parse_str("tqdm --hash=sha256:zz\n").is_err());
    }

    #[test]
    fn test_strip_inline_comment() {
        assert_eq!(strip_inline_comment("tqdm>=4.19.8   # progress"), "tqdm>=4.19.8");
        assert_eq!(strip_inline_comment("# only"), "");
        assert_eq!(strip_inline_comment("-i https://host/simple/#frag"), "-i https://host/simple/#frag");
    }

    #[test]
    fn test_split_option() {
        assert_eq!(split_option("--index-url https://x"), ("--index-url", "https://x"));
        assert_eq!(split_option("--index-url=https://x"), ("--index-url", "https://x"));
        assert_eq!(split_option("-rbase.txt"), ("-r", "base.txt"));
        assert_eq!(split_option("-r base.txt"), ("-r", "base.txt"));
        assert_eq!(split_option("--no-index"), ("--no-index", ""));
    }

    #[test]
    fn test_parse_file_with_includes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.txt"), "tqdm>=4.19.8\n").unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "-i https://pypi.python.org/simple/\n-r base.txt\npytest>=5.1.2\n",
        )
        .unwrap();

        let m = RequirementsParser::new()
            .parse_file(dir.path().join("requirements.txt"))
            .unwrap();

        assert_eq!(m.includes.len(), 1);
        assert!(m.get("tqdm").is_some());
        assert!(m.get("pytest").is_some());
        assert_eq!(m.index_url(), Some("https://pypi.python.org/simple/"));
        assert_eq!(m.source.as_deref(), Some(dir.path().join("requirements.txt").as_path()));
    }

    #[test]
    fn test_include_cycle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "-r b.txt\n").unwrap();
        fs::write(dir.path().join("b.txt"), "-r a.txt\n").unwrap();

        let err = RequirementsParser::new()
            .parse_file(dir.path().join("a.txt"))
            .unwrap_err();
        match err {
            ReqscanError::IncludeCycle { chain } => assert_eq!(chain.len(), 3),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let text = "\u{feff}# Packages\n--index-url https://pypi.python.org/simple/\ntqdm>=4.19.8\n";

        let m = RequirementsParser::new().parse_str(text).unwrap();
        assert_eq!(m.comment_lines, 1);
        assert!(m.skipped.is_empty());
        assert_eq!(m.requirements[0].line, 3);

        let m = RequirementsParser::new().strict(true).parse_str("\u{feff}tqdm>=4.19.8\n").unwrap();
        assert_eq!(m.requirements[0].name, "tqdm");
    }

    #[test]
    fn test_included_entries_keep_their_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.txt"), "tqdm>=4.19.8\n-e .\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "tqdm==4.20.0\n-r base.txt\n").unwrap();

        let m = RequirementsParser::new()
            .parse_file(dir.path().join("requirements.txt"))
            .unwrap();

        assert_eq!(m.requirements[0].source, None);
        assert_eq!(m.requirements[1].source.as_deref(), Some(dir.path().join("base.txt").as_path()));
        assert_eq!(m.requirements[1].line, 1);
        assert_eq!(m.skipped[0].source.as_deref(), Some(dir.path().join("base.txt").as_path()));
        assert_eq!(m.skipped[0].line, 2);
    }

    #[test]
    fn test_shared_include_is_merged_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("common.txt"), "numpy==1.16.0\n").unwrap();
        fs::write(dir.path().join("a.txt"), "-r common.txt\ntqdm>=4.19.8\n").unwrap();
        fs::write(dir.path().join("b.txt"), "-r common.txt\npytest>=5.1.2\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "-r a.txt\n-r b.txt\n").unwrap();

        let m = RequirementsParser::new()
            .parse_file(dir.path().join("requirements.txt"))
            .unwrap();

        let names: Vec<&str> = m.requirements.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["tqdm", "numpy", "pytest"]);
    }

    #[test]
    fn test_missing_file() {
        let err = RequirementsParser::new()
            .parse_file("/definitely/not/here/requirements.txt")
            .unwrap_err();
        assert!(matches!(err, ReqscanError::FileNotFound { .. }));
    }
}

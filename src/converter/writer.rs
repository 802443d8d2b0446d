//! Manifest writer
//!
//! Renders a parsed manifest back to canonical requirements text, JSON or TOML.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::models::Manifest;

/// Converter that renders a manifest in an output format
pub struct ManifestConverter<'a> {
    /// Manifest to render
    manifest: &'a Manifest,
}

impl<'a> ManifestConverter<'a> {
    /// Create a new converter
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }

    /// Render the manifest
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Requirements => Ok(self.to_requirements()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self.manifest)?),
            OutputFormat::Toml => Ok(toml::to_string_pretty(self.manifest)?),
        }
    }

    /// Render and write the manifest to a file, returning the path written
    pub fn write(&self, path: &Path, format: OutputFormat) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.render(format)?)?;
        tracing::info!("Wrote {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Canonical requirements text
    ///
    /// Index options come first, then one requirement per line in
    /// declaration order. Included manifests are written inline, so the
    /// output never contains `-r` lines. Comments and skipped lines are
    /// dropped.
    fn to_requirements(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref index) = self.manifest.index_url {
            lines.push(format!("{} {}", index.kind.option(), index.url));
        }
        for index in &self.manifest.extra_index_urls {
            lines.push(format!("{} {}", index.kind.option(), index.url));
        }
        if !lines.is_empty() && !self.manifest.requirements.is_empty() {
            lines.push(String::new());
        }

        for req in &self.manifest.requirements {
            lines.push(req.to_requirement_string());
        }

        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::RequirementsParser;

    const INPUT: &str = "\
# comment
--index-url https://pypi.python.org/simple/
pytecplot >= 1.0.0   # plotting
scikit-learn==0.21.3
";

    fn manifest() -> Manifest {
        RequirementsParser::new().parse_str(INPUT).unwrap()
    }

    #[test]
    fn test_render_requirements() {
        let m = manifest();
        let text = ManifestConverter::new(&m).render(OutputFormat::Requirements).unwrap();
        assert_eq!(
            text,
            "--index-url https://pypi.python.org/simple/\n\npytecplot>=1.0.0\nscikit-learn==0.21.3\n"
        );

        // Canonical output parses back to the same declarations
        let reparsed = RequirementsParser::new().parse_str(&text).unwrap();
        let before: Vec<String> = m.requirements.iter().map(|r| r.to_string()).collect();
        let after: Vec<String> = reparsed.requirements.iter().map(|r| r.to_string()).collect();
        assert_eq!(before, after);
        assert_eq!(reparsed.index_url(), m.index_url());
    }

    #[test]
    fn test_render_empty() {
        let m = Manifest::new();
        assert_eq!(ManifestConverter::new(&m).render(OutputFormat::Requirements).unwrap(), "");
    }

    #[test]
    fn test_render_json() {
        let m = manifest();
        let json = ManifestConverter::new(&m).render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["index_url"]["url"], "https://pypi.python.org/simple/");
        assert_eq!(value["requirements"][1]["name"], "scikit-learn");
        assert_eq!(value["requirements"][1]["constraints"][0]["op"], "==");
        assert_eq!(value["requirements"][0]["constraints"][0]["op"], ">=");
        assert_eq!(value["comment_lines"], 1);
    }

    #[test]
    fn test_render_toml() {
        let m = manifest();
        let text = ManifestConverter::new(&m).render(OutputFormat::Toml).unwrap();
        let back: Manifest = toml::from_str(&text).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("requirements.lock.json");
        let m = manifest();

        let written = ManifestConverter::new(&m).write(&path, OutputFormat::Json).unwrap();
        assert_eq!(written, path);
        assert!(fs::read_to_string(&path).unwrap().contains("scikit-learn"));
    }
}

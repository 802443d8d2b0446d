//! Manifest parsers and input discovery

pub mod requirements;

pub use requirements::RequirementsParser;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ReqscanError, Result};

/// Whether a file name looks like a requirements manifest
///
/// Matches `requirements.txt`, `requirements-dev.txt`, `dev-requirements.txt`
/// and similar `.txt` names, case-insensitively.
pub fn is_manifest_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.ends_with(".txt") && name.contains("requirements")
}

/// Expand input paths into manifest files
///
/// Files are taken as given. Directories are walked recursively for
/// requirements-like file names, skipping hidden directories.
pub fn discover_manifests(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for input in inputs {
        if input.is_file() {
            found.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            return Err(ReqscanError::file_not_found(input));
        }

        let walker = WalkDir::new(input).sort_by_file_name().into_iter().filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_str().map_or(false, |s| s.starts_with('.'))
        });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && is_manifest_name(entry.path()) {
                found.push(entry.into_path());
            }
        }
    }

    tracing::debug!("Discovered {} manifest(s)", found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_manifest_names() {
        assert!(is_manifest_name(Path::new("requirements.txt")));
        assert!(is_manifest_name(Path::new("a/dev-requirements.txt")));
        assert!(is_manifest_name(Path::new("Requirements-Test.TXT")));
        assert!(!is_manifest_name(Path::new("setup.py")));
        assert!(!is_manifest_name(Path::new("requirements.in")));
    }

    #[test]
    fn test_discover_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join(".venv")).unwrap();
        fs::write(dir.path().join("requirements.txt"), "").unwrap();
        fs::write(dir.path().join("sub/requirements-dev.txt"), "").unwrap();
        fs::write(dir.path().join(".venv/requirements.txt"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = discover_manifests(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| !p.to_string_lossy().contains(".venv")));
    }

    #[test]
    fn test_discover_missing_input() {
        let err = discover_manifests(&[PathBuf::from("/no/such/input")]).unwrap_err();
        assert!(matches!(err, ReqscanError::FileNotFound { .. }));
    }
}

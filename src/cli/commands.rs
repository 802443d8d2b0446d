//! Command execution handlers

use std::path::{Path, PathBuf};

use console::style;
use rayon::prelude::*;

use crate::analyzer::{AnalysisReport, Finding, FindingKind, ManifestAnalyzer};
use crate::config::Config;
use crate::converter::ManifestConverter;
use crate::error::{ReqscanError, Result};
use crate::models::Manifest;
use crate::parsers::{discover_manifests, RequirementsParser};

use super::{InfoFormat, OutputFormat};

/// Parse every discovered manifest in parallel, keeping input order
fn parse_all(inputs: &[PathBuf], parser: &RequirementsParser) -> Result<Vec<(PathBuf, Result<Manifest>)>> {
    let files = discover_manifests(inputs)?;
    if files.is_empty() {
        return Err(ReqscanError::Other("No requirements files found".into()));
    }

    Ok(files
        .into_par_iter()
        .map(|path| {
            let manifest = parser.parse_file(&path);
            (path, manifest)
        })
        .collect())
}

fn to_toml<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(toml::to_string_pretty(value)?)
}

/// Execute the parse command
pub fn execute_parse(args: &super::ParseArgs, config: &Config) -> Result<()> {
    let parser = RequirementsParser::new().strict(args.strict || config.general.strict);
    let mut manifests = Vec::new();

    for (path, manifest) in parse_all(&args.input, &parser)? {
        manifests.push(manifest.map_err(|e| ReqscanError::Other(format!("{}: {}", path.display(), e)))?);
    }

    match args.format {
        InfoFormat::Pretty => {
            for manifest in &manifests {
                print_manifest(manifest);
            }
        }
        InfoFormat::Json => {
            if let [single] = manifests.as_slice() {
                println!("{}", serde_json::to_string_pretty(single)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&manifests)?);
            }
        }
        InfoFormat::Toml => {
            for manifest in &manifests {
                println!("{}", to_toml(manifest)?);
            }
        }
    }

    Ok(())
}

fn print_manifest(manifest: &Manifest) {
    let source = manifest
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    println!("{}", style(source).bold().underlined());

    if let Some(ref index) = manifest.index_url {
        println!("  Index:    {}", style(&index.url).cyan());
    }
    for index in &manifest.extra_index_urls {
        println!("  Extra:    {}", style(&index.url).cyan());
    }
    for include in &manifest.includes {
        println!("  Includes: {}", include.path);
    }

    println!("  Requirements: {}", manifest.len());
    for req in &manifest.requirements {
        let constraints: Vec<String> = req.constraints.iter().map(|c| c.to_string()).collect();
        let mut line = format!("    {:<4} {}", req.line, style(&req.name).bold());
        if !req.extras.is_empty() {
            line.push_str(&format!("[{}]", req.extras.join(",")));
        }
        if !constraints.is_empty() {
            line.push_str(&format!(" {}", style(constraints.join(",")).green()));
        }
        if let Some(ref marker) = req.marker {
            line.push_str(&format!(" ; {}", style(marker).dim()));
        }
        if !req.hashes.is_empty() {
            line.push_str(&format!(" ({} hash{})", req.hashes.len(), if req.hashes.len() == 1 { "" } else { "es" }));
        }
        println!("{}", line);
    }

    if !manifest.skipped.is_empty() {
        println!("  {}", style(format!("Skipped: {}", manifest.skipped.len())).yellow());
        for skipped in &manifest.skipped {
            println!("    {:<4} {}", skipped.line, skipped.reason);
        }
    }

    println!(
        "  {} comment line(s), {} blank line(s)",
        manifest.comment_lines, manifest.blank_lines
    );
    println!();
}

/// Execute the check command
///
/// Returns `false` if any manifest has errors.
pub fn execute_check(args: &super::CheckArgs, config: &Config) -> Result<bool> {
    let parser = RequirementsParser::new().strict(args.strict || config.general.strict);
    let mut analysis = config.analysis.clone();
    analysis.require_pins |= args.require_pins;

    let mut reports = Vec::new();
    for (path, manifest) in parse_all(&args.input, &parser)? {
        let report = match manifest {
            Ok(manifest) => ManifestAnalyzer::new(&manifest, &analysis).analyze()?,
            Err(e) => {
                tracing::debug!("{} failed to parse: {}", path.display(), e);
                let mut report = AnalysisReport::default();
                report
                    .errors
                    .push(Finding::new(FindingKind::Skipped, e.line(), e.to_string()));
                report
            }
        };
        reports.push((path, report));
    }

    let clean = reports.iter().all(|(_, r)| !r.has_errors());

    match args.format {
        InfoFormat::Pretty => {
            for (path, report) in &reports {
                print_report(path, report);
            }
            let errors: usize = reports.iter().map(|(_, r)| r.errors.len()).sum();
            let warnings: usize = reports.iter().map(|(_, r)| r.warnings.len()).sum();
            let summary = format!(
                "{} file(s) checked: {} error(s), {} warning(s)",
                reports.len(),
                errors,
                warnings
            );
            if clean {
                println!("{}", style(summary).green().bold());
            } else {
                println!("{}", style(summary).red().bold());
            }
        }
        InfoFormat::Json => {
            let value: Vec<serde_json::Value> = reports
                .iter()
                .map(|(path, report)| {
                    serde_json::json!({
                        "file": path.display().to_string(),
                        "report": report,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        InfoFormat::Toml => {
            for (path, report) in &reports {
                println!("# {}", path.display());
                println!("{}", to_toml(report)?);
            }
        }
    }

    Ok(clean)
}

fn print_report(path: &Path, report: &AnalysisReport) {
    println!("{}", style(path.display()).bold().underlined());
    println!(
        "  Requirements: {} ({} pinned, {} hashed)",
        report.requirement_count, report.pinned_count, report.hashed_count
    );

    if !report.errors.is_empty() {
        println!("  {}", style("✗ Errors").red().bold());
        for error in &report.errors {
            println!("    • {}", error);
        }
    }

    if !report.warnings.is_empty() {
        println!("  {}", style("⚠ Warnings").yellow().bold());
        for warning in &report.warnings {
            println!("    • {}", warning);
        }
    }

    println!();
}

/// Execute the fmt command
///
/// With `--check`, returns `false` if the file is not already canonical.
pub fn execute_fmt(args: &super::FmtArgs, config: &Config) -> Result<bool> {
    let format = match args.format {
        Some(format) => format,
        None => OutputFormat::from_name(&config.output.default_format).ok_or_else(|| {
            ReqscanError::Config(format!("Unknown output format: {}", config.output.default_format))
        })?,
    };

    let parser = RequirementsParser::new().strict(args.strict || config.general.strict);
    let manifest = parser.parse_file(&args.input)?;

    if args.output.is_some() && !manifest.skipped.is_empty() && !args.drop_skipped {
        let lines: Vec<String> = manifest
            .skipped
            .iter()
            .map(|s| match &s.source {
                Some(source) => format!("{}:{}", source.display(), s.line),
                None => s.line.to_string(),
            })
            .collect();
        return Err(ReqscanError::Other(format!(
            "{} has lines that cannot be rewritten ({}); fix them or pass --drop-skipped",
            args.input.display(),
            lines.join(", ")
        )));
    }
    for skipped in &manifest.skipped {
        tracing::warn!("Dropping line {}: {}", skipped.line, skipped.content);
    }

    let converter = ManifestConverter::new(&manifest);

    if args.check {
        let current = std::fs::read_to_string(&args.input)?;
        let canonical = converter.render(format)?;
        let unchanged = current == canonical;
        if unchanged {
            tracing::info!("{} is canonical", args.input.display());
        } else {
            println!("{} would be reformatted", args.input.display());
        }
        return Ok(unchanged);
    }

    match &args.output {
        Some(output) => {
            let written = converter.write(output, format)?;
            println!("Created {}", written.display());
        }
        None => print!("{}", converter.render(format)?),
    }

    Ok(true)
}

/// Execute the verify command
///
/// Returns `false` if the artifact matches none of the pinned hashes.
pub fn execute_verify(args: &super::VerifyArgs, config: &Config) -> Result<bool> {
    let parser = RequirementsParser::new().strict(config.general.strict);
    let manifest = parser.parse_file(&args.manifest)?;

    let req = manifest
        .get(&args.package)
        .ok_or_else(|| ReqscanError::Other(format!("{} is not declared in {}", args.package, args.manifest.display())))?;

    if req.hashes.is_empty() {
        return Err(ReqscanError::Other(format!("{} has no --hash entries", req.name)));
    }

    let mut supported = 0;
    for hash in &req.hashes {
        match hash.verify(&args.artifact) {
            Ok(true) => {
                println!(
                    "{} {} matches {}",
                    style("✓").green().bold(),
                    args.artifact.display(),
                    hash
                );
                return Ok(true);
            }
            Ok(false) => supported += 1,
            Err(ReqscanError::UnsupportedHash(alg)) => {
                tracing::warn!("Skipping unsupported hash algorithm {}", alg);
            }
            Err(e) => return Err(e),
        }
    }

    if supported == 0 {
        return Err(ReqscanError::UnsupportedHash(format!(
            "no sha256 hash declared for {}",
            req.name
        )));
    }

    println!(
        "{} {} matches none of the {} hash(es) pinned for {}",
        style("✗").red().bold(),
        args.artifact.display(),
        req.hashes.len(),
        req.name
    );
    Ok(false)
}

/// Execute the config command
pub fn execute_config(args: &super::ConfigArgs, path: &Path) -> Result<()> {
    match &args.command {
        super::ConfigCommands::Show => {
            let config = Config::load_from(path)?;
            println!("{}", to_toml(&config)?);
        }
        super::ConfigCommands::Path => {
            println!("{}", path.display());
        }
        super::ConfigCommands::Reset { yes } => {
            let confirmed = *yes
                || dialoguer::Confirm::new()
                    .with_prompt(format!("Reset {} to defaults?", path.display()))
                    .default(false)
                    .interact()
                    .map_err(|e| ReqscanError::Other(e.to_string()))?;
            if confirmed {
                Config::default().save_to(path)?;
                println!("Configuration reset to defaults");
            } else {
                println!("Aborted");
            }
        }
        super::ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(path)?;
            config.set(key, value)?;
            config.save_to(path)?;
            println!("Set {} = {}", key, value);
        }
        super::ConfigCommands::Get { key } => {
            let config = Config::load_from(path)?;
            match config.get(key) {
                Some(value) => println!("{}", value),
                None => println!("Key '{}' not found", key),
            }
        }
        super::ConfigCommands::Init { force } => {
            Config::init_at(path, *force)?;
            println!("Configuration initialized at {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CheckArgs, ConfigArgs, ConfigCommands, FmtArgs, VerifyArgs};
    use std::fs;
    use std::io::Write;

    const MANIFEST: &str = "\
--index-url https://pypi.python.org/simple/

pytecplot>=1.0.0
scikit-learn==0.21.3
";

    #[test]
    fn test_check_clean_and_dirty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), MANIFEST).unwrap();

        let mut args = CheckArgs {
            input: vec![dir.path().to_path_buf()],
            strict: false,
            require_pins: false,
            format: InfoFormat::Json,
        };
        assert!(execute_check(&args, &Config::default()).unwrap());

        args.require_pins = true;
        assert!(!execute_check(&args, &Config::default()).unwrap());
    }

    #[test]
    fn test_check_reports_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "pytest=>5.1.2\n").unwrap();

        let args = CheckArgs {
            input: vec![dir.path().join("requirements.txt")],
            strict: true,
            require_pins: false,
            format: InfoFormat::Json,
        };
        assert!(!execute_check(&args, &Config::default()).unwrap());
    }

    #[test]
    fn test_check_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = CheckArgs {
            input: vec![dir.path().to_path_buf()],
            strict: false,
            require_pins: false,
            format: InfoFormat::Pretty,
        };
        assert!(execute_check(&args, &Config::default()).is_err());
    }

    #[test]
    fn test_fmt_check_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("requirements.txt");
        fs::write(&input, "# deps\npytecplot >= 1.0.0\n").unwrap();

        let mut args = FmtArgs {
            input: input.clone(),
            output: None,
            format: Some(OutputFormat::Requirements),
            check: true,
            strict: false,
            drop_skipped: false,
        };
        assert!(!execute_fmt(&args, &Config::default()).unwrap());

        args.check = false;
        args.output = Some(input.clone());
        assert!(execute_fmt(&args, &Config::default()).unwrap());
        assert_eq!(fs::read_to_string(&input).unwrap(), "pytecplot>=1.0.0\n");

        args.check = true;
        args.output = None;
        assert!(execute_fmt(&args, &Config::default()).unwrap());
    }

    #[test]
    fn test_fmt_refuses_to_drop_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("requirements.txt");
        let original = "-e .\n--trusted-host mirror.local\n-c constraints.txt\ntqdm>=4.19.8\n";
        fs::write(&input, original).unwrap();

        let mut args = FmtArgs {
            input: input.clone(),
            output: Some(input.clone()),
            format: Some(OutputFormat::Requirements),
            check: false,
            strict: false,
            drop_skipped: false,
        };
        let err = execute_fmt(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("1, 2, 3"));
        assert_eq!(fs::read_to_string(&input).unwrap(), original);

        args.drop_skipped = true;
        assert!(execute_fmt(&args, &Config::default()).unwrap());
        assert_eq!(fs::read_to_string(&input).unwrap(), "tqdm>=4.19.8\n");
    }

    #[test]
    fn test_verify_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("tqdm-4.19.8-py2.py3-none-any.whl");
        let mut file = fs::File::create(&artifact).unwrap();
        file.write_all(b"hello\n").unwrap();

        let manifest = dir.path().join("requirements.txt");
        fs::write(
            &manifest,
            "tqdm==4.19.8 \\\n  --hash=sha256:0000 \\\n  --hash=sha256:5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03\n\
             tbnns==0.4.0 --hash=sha256:00ff\n",
        )
        .unwrap();

        let mut args = VerifyArgs {
            manifest,
            package: "TQDM".to_string(),
            artifact,
        };
        assert!(execute_verify(&args, &Config::default()).unwrap());

        args.package = "tbnns".to_string();
        assert!(!execute_verify(&args, &Config::default()).unwrap());

        args.package = "numpy".to_string();
        assert!(execute_verify(&args, &Config::default()).is_err());
    }

    #[test]
    fn test_config_set_and_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let init = ConfigArgs {
            command: ConfigCommands::Init { force: false },
        };
        execute_config(&init, &path).unwrap();
        assert!(execute_config(&init, &path).is_err());

        let set = ConfigArgs {
            command: ConfigCommands::Set {
                key: "analysis.require_pins".into(),
                value: "true".into(),
            },
        };
        execute_config(&set, &path).unwrap();
        assert!(Config::load_from(&path).unwrap().analysis.require_pins);

        let reset = ConfigArgs {
            command: ConfigCommands::Reset { yes: true },
        };
        execute_config(&reset, &path).unwrap();
        assert!(!Config::load_from(&path).unwrap().analysis.require_pins);
    }
}

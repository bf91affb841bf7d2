//! chaintrace CLI - call-chain usage scanner for single-module Java projects.
//!
//! Features:
//! - Function client, service and event publish usage detection
//! - Call chains from every usage up to its entry points
//! - Smart service interface discovery from the project's pom.xml artifact
//! - Optional chaintrace.toml for depth limits and naming conventions
//! - Plain text or JSON output, to stdout or a file

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chaintrace_core::{
    init_structured_logging, load_config, log_analysis_summary, log_event, log_warn, print_json, print_plain, render_plain,
    AnalysisConfig, AnalysisReport, ChainTrace, ChainTraceConfig, ChainTraceError,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Call-chain usage scanner for single-module Java projects")]
pub struct Cli {
    /// Path to the root of the Maven project
    #[arg(default_value = ".")]
    path: String,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Maximum call chain depth (positive, or -1 for unlimited)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "unlimited")]
    max_depth: Option<i32>,

    /// Trace call chains without a depth limit
    #[arg(long)]
    unlimited: bool,

    /// Time budget per usage site in milliseconds
    #[arg(long, value_name = "MS")]
    time_budget_ms: Option<u64>,

    /// Keep every call chain per usage instead of only the primary one
    #[arg(long)]
    all_chains: bool,

    /// Write the report to a file (relative path) instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<String>,
}

/// Security: Validates output file paths to prevent path traversal attacks.
///
/// Rejects:
/// - Absolute paths (must be relative to current directory)
/// - Paths containing `..` (parent directory traversal)
/// - Paths with null bytes (injection attacks)
///
/// Returns the validated PathBuf or an error.
fn validate_output_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(anyhow!("Output path contains null bytes"));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(anyhow!(
            "Output path must be relative, not absolute: {}",
            path
        ));
    }

    for component in p.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(anyhow!(
                "Path traversal (..) not allowed in output paths: {}",
                path
            ));
        }
    }

    // Windows separators are not path components on unix
    let normalized = path.replace('\\', "/");
    if normalized.contains("/../") || normalized.starts_with("../") {
        return Err(anyhow!("Path traversal attempt detected: {}", path));
    }

    Ok(p)
}

/// Settings after merging chaintrace.toml with the command line.
#[derive(Debug)]
struct Settings {
    config: AnalysisConfig,
    all_chains: bool,
    json: bool,
}

/// Command line flags win over chaintrace.toml.
fn merge_settings(cli: &Cli, file: Option<&ChainTraceConfig>, root: &Path) -> Result<Settings> {
    let file_depth = file.and_then(|c| c.max_depth);
    let mut config = if cli.unlimited {
        AnalysisConfig::UNLIMITED
    } else if let Some(depth) = cli.max_depth {
        AnalysisConfig::with_max_depth(depth)?
    } else if let Some(depth) = file_depth {
        AnalysisConfig::with_max_depth(depth).map_err(|e| {
            ChainTraceError::config(root.join(chaintrace_core::config::CONFIG_FILE), e.to_string())
        })?
    } else {
        AnalysisConfig::DEFAULT
    };

    if let Some(ms) = cli.time_budget_ms.or_else(|| file.and_then(|c| c.time_budget_ms)) {
        config = config.with_time_budget(Duration::from_millis(ms));
    }

    let file_format = file
        .and_then(|c| c.output.as_ref())
        .and_then(|o| o.format.as_deref());
    let json = cli.json || file_format.is_some_and(|f| f.eq_ignore_ascii_case("json"));

    Ok(Settings {
        config,
        all_chains: cli.all_chains || file.and_then(|c| c.all_chains).unwrap_or(false),
        json,
    })
}

fn write_report(report: &AnalysisReport, json: bool, output: &Path) -> Result<()> {
    let content = if json {
        serde_json::to_string_pretty(report).context("Failed to serialize report")?
    } else {
        render_plain(report)
    };
    fs::write(output, content).with_context(|| format!("Failed to write report to {}", output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    // Global panic guard
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] chaintrace internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
    }));

    // Initialize structured logging (JSON to stderr, respects RUST_LOG)
    init_structured_logging();

    let cli = Cli::parse();
    let root = PathBuf::from(&cli.path);

    // 1. Validate the output path before doing any work
    let output = match cli.output.as_deref().map(validate_output_path).transpose() {
        Ok(output) => output,
        Err(e) => {
            eprintln!("[ERROR] Invalid output path: {}", e);
            std::process::exit(2);
        }
    };

    // 2. Load config from chaintrace.toml if present (a broken file is only a warning)
    let file_config = match load_config(&root) {
        Ok(cfg) => cfg,
        Err(e) => {
            log_warn(&format!("config load failed: {:#}", e));
            eprintln!("[WARN] config load failed: {:#}", e);
            None
        }
    };

    // 3. Merge settings; invalid depth values are fatal
    let settings = merge_settings(&cli, file_config.as_ref(), &root)?;

    // 4. Configure the analysis
    let mut analysis = ChainTrace::new(&root)
        .with_config(settings.config)
        .keep_all_chains(settings.all_chains);
    if let Some(cfg) = file_config {
        if let Some(conventions) = cfg.conventions {
            analysis = analysis.with_conventions(conventions);
        }
        if let Some(build) = cfg.build {
            analysis = analysis.with_build_conventions(build);
        }
    }

    // 5. Run
    let report = analysis
        .analyze()
        .with_context(|| format!("Analysis failed for: {}", root.display()))?;

    log_analysis_summary(&report);

    // 6. Report results
    match output {
        Some(path) => {
            write_report(&report, settings.json, &path)?;
            println!("Report saved to: {}", path.display());
        }
        None if settings.json => print_json(&report),
        None => print_plain(&report),
    }

    // 7. Exit code: a model that could not be built is a failure
    if report.metadata.had_errors {
        log_event("ERROR", "analysis finished with errors");
        std::process::exit(1);
    }
    Ok(())
}

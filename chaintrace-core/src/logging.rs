//! Structured logging using **tracing**.
//!
//! The core emits `tracing` events directly (`debug!` for traversal steps,
//! `info!` for phase summaries, `warn!` for every recorded warning). This
//! module installs the collector and holds the few events logged from the
//! command line front end.

use tracing::{error, info, warn};

use crate::report::AnalysisReport;

/// Initializes the global tracing collector (subscriber).
///
/// Call once at process start. Output is JSON on stderr so stdout stays
/// reserved for the report.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=chaintrace_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Logs a warning event.
pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

/// Logs the outcome of one analysis run as a single structured event, at
/// error level when the program model could not be built.
pub fn log_analysis_summary(report: &AnalysisReport) {
    let meta = &report.metadata;
    let counts = &meta.usage_counts;
    if meta.had_errors {
        error!(
            project = %report.project_path.display(),
            warnings = meta.warnings.len(),
            "Analysis failed"
        );
    } else {
        info!(
            project = %report.project_path.display(),
            function_clients = counts.function_clients,
            services = counts.services,
            eda_publish = counts.eda_publish,
            warnings = meta.warnings.len(),
            skipped_files = meta.skipped_files.len(),
            elapsed_ms = meta.analysis_time_ms,
            "Analysis complete"
        );
    }
}

/// Logs a named event, mapping the name onto a level.
pub fn log_event(event: &str, detail: &str) {
    match event.to_uppercase().as_str() {
        "ERROR" | "CRITICAL" => error!(event = %event, detail = %detail),
        "WARN" | "WARNING" => warn!(event = %event, detail = %detail),
        _ => info!(event = %event, detail = %detail),
    }
}

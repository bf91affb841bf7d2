//! Analysis report and output formatting - plaintext and JSON.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::callchain::CacheStats;
use crate::smart::SmartServiceInfo;
use crate::usage::{CallChain, EventPublishUsage, FunctionClientUsage, ServiceUsage, UsageRecord};

/// Detected usages per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    pub function_clients: usize,
    pub services: usize,
    pub eda_publish: usize,
}

impl fmt::Display for UsageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "functionClients={}, services={}, edaPublish={}",
            self.function_clients, self.services, self.eda_publish
        )
    }
}

/// Statistics and diagnostics for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub total_files_scanned: usize,
    pub total_classes_analyzed: usize,
    pub total_methods_analyzed: usize,
    pub warnings: Vec<String>,
    pub usage_counts: UsageCounts,
    pub analysis_time_ms: u64,
    /// Some call chain walk dropped a branch because it revisited a method.
    pub has_circular_references: bool,
    pub had_errors: bool,
    /// Source files that could not be modelled, relative to the project root.
    pub skipped_files: Vec<PathBuf>,
    pub cache_stats: CacheStats,
}

impl fmt::Display for AnalysisMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analysis: {} files, {} classes, {} methods in {}ms. Usages: {}. Warnings: {}, Errors: {}",
            self.total_files_scanned,
            self.total_classes_analyzed,
            self.total_methods_analyzed,
            self.analysis_time_ms,
            self.usage_counts,
            self.warnings.len(),
            self.had_errors
        )
    }
}

/// Complete output of an analysis run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub project_path: PathBuf,
    pub analysis_timestamp: DateTime<Local>,
    pub function_client_usages: Vec<FunctionClientUsage>,
    pub service_usages: Vec<ServiceUsage>,
    pub event_publish_usages: Vec<EventPublishUsage>,
    /// Present when the project itself is a smart service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_service: Option<SmartServiceInfo>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisReport {
    /// Report for a run that could not build its program model.
    pub fn failed(
        project_path: PathBuf,
        analysis_timestamp: DateTime<Local>,
        analysis_time_ms: u64,
        message: &str,
    ) -> Self {
        Self {
            project_path,
            analysis_timestamp,
            function_client_usages: Vec::new(),
            service_usages: Vec::new(),
            event_publish_usages: Vec::new(),
            smart_service: None,
            metadata: AnalysisMetadata {
                warnings: vec![format!("CRITICAL: {}", message)],
                analysis_time_ms,
                had_errors: true,
                ..AnalysisMetadata::default()
            },
        }
    }

    pub fn total_usages(&self) -> usize {
        self.function_client_usages.len() + self.service_usages.len() + self.event_publish_usages.len()
    }

    /// Keeps only the primary call chain of every usage.
    pub fn with_primary_chains_only(mut self) -> Self {
        self.function_client_usages = primary_only(self.function_client_usages);
        self.service_usages = primary_only(self.service_usages);
        self.event_publish_usages = primary_only(self.event_publish_usages);
        self
    }
}

fn primary_only<T: UsageRecord>(usages: Vec<T>) -> Vec<T> {
    usages.into_iter().map(UsageRecord::with_primary_chain_only).collect()
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let project = self
            .project_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.project_path.display().to_string());
        write!(
            f,
            "AnalysisReport[project={}, timestamp={}, total={} usages ({} functions, {} services, {} eda)]",
            project,
            self.analysis_timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.total_usages(),
            self.function_client_usages.len(),
            self.service_usages.len(),
            self.event_publish_usages.len()
        )
    }
}

/// Renders the report as indented plain text.
pub fn render_plain(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n", report, report.metadata));

    section(&mut out, "FUNCTION CLIENT USAGES", &report.function_client_usages);
    section(&mut out, "SERVICE USAGES", &report.service_usages);
    section(&mut out, "EVENT PUBLISH USAGES", &report.event_publish_usages);

    if let Some(smart) = &report.smart_service {
        out.push_str(&format!(
            "\nSMART SERVICE: {} ({}){}\n",
            smart.service_id,
            smart.interface_name,
            if smart.is_ui_service { " [UI]" } else { "" }
        ));
        for (signature, function) in &smart.function_methods {
            out.push_str(&format!("  - {} -> {} ({})\n", signature, function.id, function.name));
        }
    }

    if !report.metadata.skipped_files.is_empty() {
        out.push_str(&format!("\nSKIPPED FILES ({}):\n", report.metadata.skipped_files.len()));
        for file in &report.metadata.skipped_files {
            out.push_str(&format!("  - {}\n", file.display()));
        }
    }
    if !report.metadata.warnings.is_empty() {
        out.push_str(&format!("\nWARNINGS ({}):\n", report.metadata.warnings.len()));
        for warning in &report.metadata.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }
    out
}

fn section<T: UsageRecord + fmt::Display>(out: &mut String, title: &str, usages: &[T]) {
    if usages.is_empty() {
        return;
    }
    out.push_str(&format!("\n{} ({}):\n", title, usages.len()));
    for usage in usages {
        out.push_str(&format!("- {}\n", usage));
        for (i, chain) in usage.call_chains().iter().enumerate() {
            if usage.call_chains().len() > 1 {
                out.push_str(&format!("    chain {}:\n", i + 1));
            }
            push_chain(out, chain);
        }
    }
}

fn push_chain(out: &mut String, chain: &CallChain) {
    for entry in chain {
        out.push_str(&format!("      <- {}\n", entry));
    }
}

/// Prints the report in plain text format.
pub fn print_plain(report: &AnalysisReport) {
    print!("{}", render_plain(report));
}

/// Prints the report in JSON format.
///
/// Falls back to the one-line summary if serialization fails.
pub fn print_json(report: &AnalysisReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("[WARN] JSON serialization failed: {}", e);
            println!("{{\"summary\": {:?}}}", report.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Visibility;
    use crate::usage::{CallChainEntry, SourceLocation, TopicResolutionStatus};

    fn entry(sig: &str, entry_point: bool) -> CallChainEntry {
        CallChainEntry {
            class_name: "com.acme.Api".to_string(),
            method_signature: sig.to_string(),
            visibility: Visibility::Public,
            line_number: Some(7),
            is_entry_point: entry_point,
            ambiguous_overload: false,
        }
    }

    fn report() -> AnalysisReport {
        let publish = EventPublishUsage {
            topic_name: "orders.created".to_string(),
            topic_status: TopicResolutionStatus::Resolved,
            topic_variable_type: None,
            usage_location: SourceLocation::default(),
            call_chains: vec![
                vec![entry("handle()", true)],
                vec![entry("retry()", false), entry("main()", true)],
            ],
            message_data_type: None,
        };
        AnalysisReport {
            project_path: PathBuf::from("/work/billing"),
            analysis_timestamp: Local::now(),
            function_client_usages: Vec::new(),
            service_usages: Vec::new(),
            event_publish_usages: vec![publish],
            smart_service: None,
            metadata: AnalysisMetadata {
                total_files_scanned: 3,
                total_classes_analyzed: 4,
                total_methods_analyzed: 9,
                warnings: vec!["Max depth reached at com.acme.Api.run()".to_string()],
                usage_counts: UsageCounts {
                    function_clients: 0,
                    services: 0,
                    eda_publish: 1,
                },
                analysis_time_ms: 12,
                ..AnalysisMetadata::default()
            },
        }
    }

    #[test]
    fn test_summary_lines() {
        let report = report();
        assert_eq!(report.total_usages(), 1);
        assert!(report
            .to_string()
            .starts_with("AnalysisReport[project=billing, timestamp="));
        assert!(report.to_string().ends_with("total=1 usages (0 functions, 0 services, 1 eda)]"));
        assert_eq!(
            report.metadata.to_string(),
            "Analysis: 3 files, 4 classes, 9 methods in 12ms. \
             Usages: functionClients=0, services=0, edaPublish=1. Warnings: 1, Errors: false"
        );
    }

    #[test]
    fn test_primary_chain_trimming() {
        let trimmed = report().with_primary_chains_only();
        assert_eq!(trimmed.event_publish_usages[0].call_chains.len(), 1);
        assert_eq!(trimmed.event_publish_usages[0].call_chain()[0].method_signature, "handle()");
    }

    #[test]
    fn test_failed_report() {
        let report = AnalysisReport::failed(PathBuf::from("/p"), Local::now(), 5, "Failed to parse project: boom");
        assert!(report.metadata.had_errors);
        assert_eq!(report.metadata.warnings, vec!["CRITICAL: Failed to parse project: boom"]);
        assert_eq!(report.total_usages(), 0);
    }

    #[test]
    fn test_plain_rendering() {
        let text = render_plain(&report());
        assert!(text.contains("EVENT PUBLISH USAGES (1):"));
        assert!(text.contains("chain 2:"));
        assert!(text.contains("<- com.acme.Api.main() [PUBLIC, line 7] [ENTRY POINT]"));
        assert!(text.contains("WARNINGS (1):"));
        assert!(!text.contains("FUNCTION CLIENT USAGES"));
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["metadata"]["usageCounts"]["edaPublish"], 1);
        assert_eq!(json["eventPublishUsages"][0]["topicName"], "orders.created");
        assert!(json["metadata"]["cacheStats"]["cachedMethods"].is_number());
        assert!(json.get("smartService").is_none());
    }
}

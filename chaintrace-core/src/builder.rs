//! Builder pattern API for chaintrace analysis.
//!
//! Provides a fluent interface for configuring and running an analysis:
//!
//! ```rust,ignore
//! use chaintrace_core::prelude::*;
//!
//! let report = ChainTrace::new("/path/to/project")
//!     .with_config(AnalysisConfig::with_max_depth(20)?)
//!     .keep_all_chains(true)
//!     .analyze()?;
//!
//! for usage in &report.function_client_usages {
//!     println!("{}", usage);
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use tracing::{error, info};

use crate::callchain::{CacheStats, CallChainWalker};
use crate::common::Warnings;
use crate::config::{AnalysisConfig, BuildConventions, DetectionConventions};
use crate::detect::UsageDetector;
use crate::error::ChainTraceResult;
use crate::model::ProgramModel;
use crate::report::{AnalysisMetadata, AnalysisReport, UsageCounts};
use crate::smart::SmartServiceInfo;
use crate::usage::{EventPublishUsage, FunctionClientUsage, ServiceUsage};

/// Builder for configuring an analysis run.
///
/// # Example
///
/// ```rust,ignore
/// let report = ChainTrace::new("/my/project")
///     .with_config(AnalysisConfig::UNLIMITED)
///     .analyze()?;
/// ```
#[derive(Debug, Clone)]
pub struct ChainTrace {
    /// Root of the Maven project to analyze
    root: PathBuf,

    /// Call chain depth limit and time budget
    config: AnalysisConfig,

    /// Naming conventions the detectors match against
    conventions: DetectionConventions,

    /// pom.xml group ids and artifact suffixes
    build: BuildConventions,

    /// Keep every call chain instead of only the primary one
    all_chains: bool,
}

/// Usages found by the three detectors.
#[derive(Debug, Default)]
struct Detection {
    function_clients: Vec<FunctionClientUsage>,
    services: Vec<ServiceUsage>,
    event_publishes: Vec<EventPublishUsage>,
    cache_stats: CacheStats,
}

impl ChainTrace {
    /// Create a new analysis builder for the given project root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: AnalysisConfig::DEFAULT,
            conventions: DetectionConventions::default(),
            build: BuildConventions::default(),
            all_chains: false,
        }
    }

    /// Set the call chain configuration.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the detection naming conventions.
    pub fn with_conventions(mut self, conventions: DetectionConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Override the pom.xml conventions.
    pub fn with_build_conventions(mut self, build: BuildConventions) -> Self {
        self.build = build;
        self
    }

    /// Keep all call chains per usage in the report.
    pub fn keep_all_chains(mut self, enabled: bool) -> Self {
        self.all_chains = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the full analysis: project checks, pom.xml, source model, detection.
    ///
    /// Invalid or multi-module projects are errors. A source tree that cannot
    /// be modelled yields an error report with `had_errors` set.
    #[cfg(feature = "java")]
    pub fn analyze(&self) -> ChainTraceResult<AnalysisReport> {
        use crate::error::ChainTraceError;
        use crate::frontend::build_model;
        use crate::pom::scan_pom;
        use crate::project::{check_single_module, source_root, validate_project};
        use crate::scan::gather_java_files;
        use crate::smart::SmartServiceDetector;

        let started = Instant::now();
        let timestamp = Local::now();
        info!(project = %self.root.display(), "Starting analysis");

        // 1. Validate project shape
        validate_project(&self.root)?;
        check_single_module(&self.root)?;

        // 2. Dependencies from pom.xml
        let warnings = Warnings::new();
        let dependencies = scan_pom(&self.root, &self.build, &warnings);
        let function_ids = dependencies.function_ids();
        let service_ids = dependencies.service_ids();
        info!(
            "Found {} function dependencies and {} service dependencies in pom.xml",
            function_ids.len(),
            service_ids.len()
        );

        // 3. Build the program model
        let built = gather_java_files(&source_root(&self.root))
            .map_err(|e| ChainTraceError::internal(format!("{:#}", e)))
            .and_then(|files| build_model(&self.root, &files, &self.conventions));
        let built = match built {
            Ok(built) => built,
            Err(e) => {
                error!(error = %e, "Failed to build program model");
                return Ok(AnalysisReport::failed(
                    self.root.clone(),
                    timestamp,
                    elapsed_ms(started),
                    &format!("Failed to parse project: {}", e),
                ));
            }
        };
        for warning in built.warnings {
            warnings.push(warning);
        }
        let model = built.model;

        // 4. Detect usages
        let detection = self.detect(&model, &function_ids, &service_ids, &warnings);

        // 5. Smart service interface of the project itself
        let smart_service = dependencies
            .artifact_id
            .as_deref()
            .and_then(|artifact_id| SmartServiceDetector::new().analyze(&model, artifact_id));

        // 6. Assemble the report
        let total_files = model.source_files().len() + built.skipped_files.len();
        let report = self.assemble(
            &model,
            detection,
            smart_service,
            warnings,
            total_files,
            built.skipped_files,
            timestamp,
            started,
        );
        info!("Analysis completed: {}", report.metadata);
        Ok(report)
    }

    /// Run only detection over an already built model.
    ///
    /// Works without the `java` feature; the model may be built by hand.
    pub fn analyze_model(
        &self,
        model: &ProgramModel,
        function_ids: &BTreeSet<String>,
        service_ids: &BTreeSet<String>,
    ) -> AnalysisReport {
        let started = Instant::now();
        let timestamp = Local::now();
        let warnings = Warnings::new();

        let detection = self.detect(model, function_ids, service_ids, &warnings);
        self.assemble(
            model,
            detection,
            None,
            warnings,
            model.source_files().len(),
            Vec::new(),
            timestamp,
            started,
        )
    }

    fn detect(
        &self,
        model: &ProgramModel,
        function_ids: &BTreeSet<String>,
        service_ids: &BTreeSet<String>,
        warnings: &Warnings,
    ) -> Detection {
        let walker = CallChainWalker::new(model, self.config, warnings);
        let detector = UsageDetector::new(model, &self.conventions, &walker, warnings);

        let detection = Detection {
            function_clients: or_empty(detector.detect_function_clients(function_ids), warnings),
            services: or_empty(detector.detect_services(service_ids), warnings),
            event_publishes: or_empty(detector.detect_event_publishes(), warnings),
            cache_stats: walker.cache_stats(),
        };
        info!(
            cycles = walker.cycle_count(),
            cached_methods = detection.cache_stats.cached_methods,
            "Detection finished"
        );
        detection
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        model: &ProgramModel,
        detection: Detection,
        smart_service: Option<SmartServiceInfo>,
        warnings: Warnings,
        total_files: usize,
        skipped_files: Vec<PathBuf>,
        timestamp: chrono::DateTime<Local>,
        started: Instant,
    ) -> AnalysisReport {
        let warnings = warnings.into_vec();
        let metadata = AnalysisMetadata {
            total_files_scanned: total_files,
            total_classes_analyzed: model.type_count(),
            total_methods_analyzed: model.method_count(),
            has_circular_references: warnings.iter().any(|w| w.starts_with("Circular reference")),
            warnings,
            usage_counts: UsageCounts {
                function_clients: detection.function_clients.len(),
                services: detection.services.len(),
                eda_publish: detection.event_publishes.len(),
            },
            analysis_time_ms: elapsed_ms(started),
            had_errors: false,
            skipped_files,
            cache_stats: detection.cache_stats,
        };

        let report = AnalysisReport {
            project_path: self.root.clone(),
            analysis_timestamp: timestamp,
            function_client_usages: detection.function_clients,
            service_usages: detection.services,
            event_publish_usages: detection.event_publishes,
            smart_service,
            metadata,
        };
        if self.all_chains {
            report
        } else {
            report.with_primary_chains_only()
        }
    }
}

/// A detector that failed as a whole contributes no usages and one warning.
fn or_empty<T>(result: ChainTraceResult<Vec<T>>, warnings: &Warnings) -> Vec<T> {
    match result {
        Ok(usages) => usages,
        Err(e) => {
            error!(error = %e, "Failed to detect usages");
            let message = format!("Usage detection partially failed: {}", e);
            if !warnings.snapshot().contains(&message) {
                warnings.push(message);
            }
            Vec::new()
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

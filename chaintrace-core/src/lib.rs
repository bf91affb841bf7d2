//! chaintrace-core: call-chain reconstruction and usage detection for
//! single-module Maven/Java projects.
//!
//! This library builds a semantic model of a Java source tree, finds the
//! places where the project touches its external dependencies and traces
//! every such place back up to the entry points that reach it.
//!
//! # Features
//!
//! - **Function client detection**: `<Id>Function.instance().execute(..)` style calls
//! - **Service detection**: instantiations, instance calls and static calls into a service package
//! - **Event publish detection**: `publishEvent(topic, payload)` on publisher types, with topic resolution
//! - **Call chains**: upward traces with cycle, depth and time-budget handling
//! - **Smart service discovery**: the project's own `@SmartService` interface
//! - **pom.xml scanning**: service and function dependency ids
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use chaintrace_core::prelude::*;
//!
//! let report = ChainTrace::new("/path/to/project").analyze()?;
//!
//! for usage in &report.service_usages {
//!     println!("{}", usage);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`model`]: The program model the detectors query
//! - `frontend`: Java sources to [`model::ProgramModel`] (tree-sitter)
//! - [`callchain`]: Upward call chain walker with a caller cache
//! - [`detect`]: The three usage detectors
//! - [`pom`]: pom.xml dependency scanning
//! - [`smart`]: Smart service interface discovery
//! - [`builder`]: Fluent builder API for configuration
//! - [`report`]: Report types, plain text and JSON output
//! - [`error`]: Typed error handling
//!
//! # Cargo Features
//!
//! - `java` (default): Enable the tree-sitter Java frontend and [`ChainTrace::analyze`]
//! - `full`: Enable all optional features

// Core modules (always available)
pub mod builder;
pub mod callchain;
pub mod common;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod model;
pub mod pom;
pub mod prelude;
pub mod project;
pub mod report;
pub mod scan;
pub mod smart;
pub mod usage;

// Feature-gated modules
#[cfg(feature = "java")]
pub mod frontend;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{ChainTraceError, ChainTraceResult, IoResultExt};

// Builder API
pub use builder::ChainTrace;

// Configuration
pub use config::{
    load_config, AnalysisConfig, BuildConventions, ChainTraceConfig, DetectionConventions, MaxDepth,
    OutputConfig,
};

// Call chains
pub use callchain::{CacheStats, CallChainWalker};

// Detection
pub use detect::UsageDetector;

// Logging
pub use logging::{init_structured_logging, log_analysis_summary, log_event, log_warn};

// Model
pub use model::{ProgramModel, ProgramModelBuilder};

// Build descriptor and project checks
pub use pom::{scan_pom, DependantEntry, DependencyAnalysis};
pub use project::{check_single_module, validate_project};

// Reporting
pub use report::{print_json, print_plain, render_plain, AnalysisMetadata, AnalysisReport, UsageCounts};

// File scanning
pub use scan::{count_java_files, gather_java_files};

// Smart service discovery
pub use smart::{FunctionMetadata, SmartServiceDetector, SmartServiceInfo};

// Usage records
pub use usage::{
    CallChain, CallChainEntry, EventPublishUsage, FunctionClientUsage, ServiceUsage, ServiceUsageKind,
    SourceLocation, TopicResolutionStatus, UsageRecord,
};

// Feature-gated re-exports
#[cfg(feature = "java")]
pub use frontend::{build_model, ModelBuild};

#[cfg(test)]
mod tests;

//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use chaintrace_core::prelude::*;
//! ```
//!
//! This provides the types needed to run an analysis and read its report
//! without pulling in the model internals.

// Core analysis types
pub use crate::error::{ChainTraceError, ChainTraceResult};
pub use crate::model::{ProgramModel, ProgramModelBuilder};

// Configuration
pub use crate::config::{load_config, AnalysisConfig, ChainTraceConfig, DetectionConventions};

// Builder API
pub use crate::builder::ChainTrace;

// Report and usage records
pub use crate::report::{AnalysisMetadata, AnalysisReport};
pub use crate::usage::{
    CallChain, CallChainEntry, EventPublishUsage, FunctionClientUsage, ServiceUsage, ServiceUsageKind,
    UsageRecord,
};

// Call chains
pub use crate::callchain::CallChainWalker;

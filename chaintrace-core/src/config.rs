//! Analysis configuration and `chaintrace.toml` loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path};

use crate::error::{ChainTraceError, ChainTraceResult};

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE: &str = "chaintrace.toml";

/// Upward traversal bound for the call-chain walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MaxDepth {
    /// Stop after this many upward steps and report an artificial entry point.
    Limited(u32),
    /// Only natural entry points and cycles end a branch.
    Unlimited,
}

impl MaxDepth {
    /// Raw value meaning "no limit".
    pub const UNLIMITED_SENTINEL: i32 = -1;

    /// Validates a raw signed depth. Zero and anything below the sentinel are rejected.
    pub fn from_raw(raw: i32) -> ChainTraceResult<Self> {
        match raw {
            Self::UNLIMITED_SENTINEL => Ok(Self::Unlimited),
            n if n > 0 => Ok(Self::Limited(n as u32)),
            n => Err(ChainTraceError::invalid_configuration(format!(
                "maxDepth must be positive or -1 for unlimited, got: {}",
                n
            ))),
        }
    }

    /// The raw signed form (`-1` for unlimited).
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Limited(n) => n as i32,
            Self::Unlimited => Self::UNLIMITED_SENTINEL,
        }
    }

    /// True once `depth` has reached a finite limit.
    pub fn is_reached(self, depth: usize) -> bool {
        match self {
            Self::Limited(n) => depth >= n as usize,
            Self::Unlimited => false,
        }
    }
}

impl TryFrom<i32> for MaxDepth {
    type Error = ChainTraceError;

    fn try_from(raw: i32) -> ChainTraceResult<Self> {
        Self::from_raw(raw)
    }
}

impl From<MaxDepth> for i32 {
    fn from(depth: MaxDepth) -> i32 {
        depth.as_raw()
    }
}

/// Core analysis settings consumed by the walker and detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    max_depth: MaxDepth,
    time_budget: Option<Duration>,
}

impl AnalysisConfig {
    /// Depth 100, no time budget.
    pub const DEFAULT: Self = Self {
        max_depth: MaxDepth::Limited(100),
        time_budget: None,
    };

    /// No depth limit, no time budget.
    pub const UNLIMITED: Self = Self {
        max_depth: MaxDepth::Unlimited,
        time_budget: None,
    };

    /// Builds a config from a raw signed depth, failing fast on invalid values.
    pub fn with_max_depth(depth: i32) -> ChainTraceResult<Self> {
        Ok(Self {
            max_depth: MaxDepth::from_raw(depth)?,
            time_budget: None,
        })
    }

    /// Bounds the time spent tracing a single usage site. An exhausted budget
    /// truncates the active branch the same way the depth limit does.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_depth == MaxDepth::Unlimited
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Naming conventions the usage detectors match against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConventions {
    /// Package every function client class lives under.
    pub function_package: String,
    /// `<functionId><suffix>` is the client class name.
    pub function_class_suffix: String,
    /// Zero-argument static accessor returning the client singleton.
    pub singleton_accessor: String,
    /// Invocation verbs recognized on a function client.
    pub function_verbs: Vec<String>,
    /// The verb that denotes scheduled execution.
    pub scheduled_verb: String,
    /// Service packages are `<base>.<serviceId lowercased>`.
    pub service_base_package: String,
    /// Capability type a publisher target must be or implement.
    pub publisher_type: String,
    /// Publishing method name.
    pub publish_method: String,
}

impl Default for DetectionConventions {
    fn default() -> Self {
        Self {
            function_package: "dev.myorg.mysection.function.client".to_string(),
            function_class_suffix: "Function".to_string(),
            singleton_accessor: "instance".to_string(),
            function_verbs: vec![
                "execute".to_string(),
                "executeAsync".to_string(),
                "executeAsyncOnOrAfter".to_string(),
            ],
            scheduled_verb: "executeAsyncOnOrAfter".to_string(),
            service_base_package: "dev.myorg.services".to_string(),
            publisher_type: "dev.myorg.mysection.eda.publisher.service.IEventPublisher".to_string(),
            publish_method: "publishEvent".to_string(),
        }
    }
}

impl DetectionConventions {
    /// Expected base package for a service id.
    pub fn service_package(&self, service_id: &str) -> String {
        format!("{}.{}", self.service_base_package, service_id.to_lowercase())
    }

    /// Expected client class simple name for a function id.
    pub fn function_class_name(&self, function_id: &str) -> String {
        format!("{}{}", function_id, self.function_class_suffix)
    }

    pub fn is_function_verb(&self, name: &str) -> bool {
        self.function_verbs.iter().any(|v| v == name)
    }

    /// Rejects conventions no detector could match against.
    pub fn validate(&self) -> ChainTraceResult<()> {
        let required = [
            ("function_package", &self.function_package),
            ("function_class_suffix", &self.function_class_suffix),
            ("singleton_accessor", &self.singleton_accessor),
            ("service_base_package", &self.service_base_package),
            ("publisher_type", &self.publisher_type),
            ("publish_method", &self.publish_method),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ChainTraceError::invalid_configuration(format!(
                "conventions.{} must not be empty",
                name
            )));
        }
        if self.function_verbs.iter().all(|v| v.trim().is_empty()) {
            return Err(ChainTraceError::invalid_configuration(
                "conventions.function_verbs must name at least one verb",
            ));
        }
        Ok(())
    }
}

/// Conventions used when reading dependency ids out of pom.xml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConventions {
    pub services_group: String,
    pub functions_group: String,
    pub function_client_suffix: String,
}

impl Default for BuildConventions {
    fn default() -> Self {
        Self {
            services_group: "dev.myorg.services".to_string(),
            functions_group: "dev.myorg.functions".to_string(),
            function_client_suffix: "-func-client".to_string(),
        }
    }
}

/// Main configuration structure for chaintrace.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ChainTraceConfig {
    /// Positive depth bound, or -1 for unlimited.
    pub max_depth: Option<i32>,
    /// Per-site tracing budget in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Keep every call chain on the report instead of only the primary one.
    pub all_chains: Option<bool>,
    pub conventions: Option<DetectionConventions>,
    pub build: Option<BuildConventions>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// Output format configuration.
#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    /// Output format: "plain" or "json".
    pub format: Option<String>,
}

impl ChainTraceConfig {
    /// Resolves the file settings into a validated [`AnalysisConfig`].
    pub fn analysis_config(&self) -> ChainTraceResult<AnalysisConfig> {
        let mut config = match self.max_depth {
            Some(depth) => AnalysisConfig::with_max_depth(depth)?,
            None => AnalysisConfig::DEFAULT,
        };
        if let Some(ms) = self.time_budget_ms {
            config = config.with_time_budget(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

/// Loads configuration from chaintrace.toml if it exists.
pub fn load_config(root: &Path) -> Result<Option<ChainTraceConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content).context("Invalid chaintrace.toml")?;
    Ok(Some(cfg))
}

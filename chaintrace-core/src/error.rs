//! Typed error handling for chaintrace.
//!
//! Only configuration and project-shape errors are meant to escape an
//! analysis run. Everything that goes wrong while inspecting the scanned
//! code degrades locally and is surfaced as a warning string instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chaintrace operations.
#[derive(Error, Debug)]
pub enum ChainTraceError {
    /// I/O error when reading project files
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A Java source file could not be parsed at all
    #[error("Parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        /// Line number (1-indexed) if available
        line: Option<usize>,
    },

    /// Analysis configuration rejected at construction time
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// chaintrace.toml could not be read or understood
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The scanned directory is not a usable Maven project
    #[error("Invalid project at {path}: {message}")]
    Project { path: PathBuf, message: String },

    /// The project shape is valid Maven but not supported (multi-module)
    #[error("Unsupported project at {path}: {message}")]
    UnsupportedProject { path: PathBuf, message: String },

    /// pom.xml exists but could not be read
    #[error("Build descriptor error at {path}: {message}")]
    BuildDescriptor { path: PathBuf, message: String },

    /// The program model references an element it does not contain
    #[error("Malformed program model: {message}")]
    MalformedModel { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ChainTraceError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line: None,
        }
    }

    /// Create a parse error with a line number.
    pub fn parse_at(path: impl Into<PathBuf>, message: impl Into<String>, line: usize) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line: Some(line),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a config file error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a project validation error.
    pub fn project(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Project {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-project error.
    pub fn unsupported_project(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnsupportedProject {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a build descriptor error.
    pub fn build_descriptor(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::BuildDescriptor {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-model error.
    pub fn malformed_model(message: impl Into<String>) -> Self {
        Self::MalformedModel {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (can continue analysis).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::MalformedModel { .. } | Self::BuildDescriptor { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Parse { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            Self::Project { path, .. } => Some(path),
            Self::UnsupportedProject { path, .. } => Some(path),
            Self::BuildDescriptor { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for chaintrace results.
pub type ChainTraceResult<T> = Result<T, ChainTraceError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> ChainTraceResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> ChainTraceResult<T> {
        self.map_err(|e| ChainTraceError::io(path, e))
    }
}

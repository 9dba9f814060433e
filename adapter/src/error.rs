//! Adapter error types
//!
//! Only conditions that make a compile request meaningless are errors.
//! Unsupported host parameters, missing references and malformed compiler
//! output are modeled as data (see [`crate::host::StrategyOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur while driving a compile request
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The host endpoint hit an unrecoverable fault during negotiation
    #[error("Host compiler fault while setting '{parameter}': {message}")]
    HostFatal { parameter: String, message: String },

    /// The external compiler could not be started
    #[error("Failed to launch compiler '{tool}': {source}")]
    ToolLaunch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external compiler ran past its deadline and was killed
    #[error("Compiler timed out after {secs}s")]
    ToolTimeout { secs: u64 },

    /// A background task (host negotiation thread) panicked or was cancelled
    #[error("Background task failed: {message}")]
    Task { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error (config and request files)
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error (reports)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Create a host fatal error
    pub fn host_fatal(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostFatal {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a tool launch error
    pub fn tool_launch(tool: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ToolLaunch {
            tool: tool.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::HostFatal { .. } => "HOST_FATAL",
            Self::ToolLaunch { .. } => "TOOL_LAUNCH_FAILED",
            Self::ToolTimeout { .. } => "TOOL_TIMEOUT",
            Self::Task { .. } => "TASK_FAILED",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<tokio::task::JoinError> for AdapterError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}

//! Adapter configuration
//!
//! Defaults come from the environment; a TOML file can override them:
//!
//! ```toml
//! tool_path = "/usr/lib/mono/4.5/vbc.exe"
//! tool_prefix_args = []
//! timeout_secs = 600
//! prefer_host = true
//! ```

use crate::diagnostics::MessageImportance;
use crate::error::{AdapterError, AdapterResult};
use crate::host::SelectorPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Adapter-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Explicit compiler location. Setting it forces the command-line
    /// compiler at build time.
    pub tool_path: Option<PathBuf>,
    /// Executable name looked up on `PATH` when `tool_path` is unset
    pub tool_name: String,
    /// Arguments placed before the compiler switches (e.g. `["exec", "vbc.dll"]`
    /// when the tool is a runtime launcher)
    pub tool_prefix_args: Vec<String>,
    /// Working directory for the compiler process
    pub working_dir: Option<PathBuf>,
    /// Maximum compile time in seconds (0 = no limit)
    pub timeout_secs: u64,
    /// Use a host endpoint when it supports every requested option
    pub prefer_host: bool,
    pub stdout_importance: MessageImportance,
    pub stderr_importance: MessageImportance,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            tool_path: std::env::var("VBC_TOOL_PATH").ok().map(PathBuf::from),
            tool_name: std::env::var("VBC_TOOL_NAME").unwrap_or_else(|_| "vbc".into()),
            tool_prefix_args: Vec::new(),
            working_dir: None,
            timeout_secs: std::env::var("VBC_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            prefer_host: std::env::var("VBC_PREFER_HOST")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            stdout_importance: MessageImportance::Normal,
            stderr_importance: MessageImportance::Normal,
        }
    }
}

impl AdapterConfig {
    /// Load from a TOML file; keys absent from the file keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AdapterResult<()> {
        if self.tool_path.is_none() && self.tool_name.trim().is_empty() {
            return Err(AdapterError::config("either tool_path or tool_name must be set"));
        }
        Ok(())
    }

    /// Program to launch for the command-line path
    pub fn tool(&self) -> PathBuf {
        self.tool_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.tool_name))
    }

    pub fn selector_policy(&self) -> SelectorPolicy {
        SelectorPolicy {
            prefer_host: self.prefer_host,
            force_external_tool: self.tool_path.is_some(),
        }
    }
}

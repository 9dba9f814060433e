//! Deterministic in-memory host endpoint.
//!
//! Behaves according to a [`HostScript`] and records every call it receives.
//! Used by integration tests and by the driver's `--host-script` option to
//! rehearse strategy selection without an IDE.

use crate::error::AdapterResult;
use crate::host::endpoint::{
    HostEndpoint, HostFault, HostMessage, HostParameter, ParameterSupport, SessionEnd,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scripted host behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostScript {
    pub design_time: bool,
    pub up_to_date: bool,
    /// Parameter names answered with `Unsupported`
    pub unsupported: Vec<String>,
    /// Parameter names answered with `Rejected`
    pub rejected: Vec<String>,
    /// Parameter name answered with `Fatal`
    pub fatal_on: Option<String>,
    /// Recoverable failure message for `begin_session`
    pub begin_failure: Option<String>,
    pub end_failure: Option<HostMessage>,
    pub end_warning: Option<HostMessage>,
    pub compile_succeeds: bool,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            design_time: false,
            up_to_date: false,
            unsupported: Vec::new(),
            rejected: Vec::new(),
            fatal_on: None,
            begin_failure: None,
            end_failure: None,
            end_warning: None,
            compile_succeeds: true,
        }
    }
}

impl HostScript {
    pub fn from_toml_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }
}

/// A call observed by [`ScriptedHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    BeginSession,
    SetParameter(&'static str),
    EndSession,
    Compile,
}

/// Host endpoint driven by a [`HostScript`]
#[derive(Debug, Default)]
pub struct ScriptedHost {
    script: HostScript,
    calls: Vec<HostCall>,
    accepted: Vec<HostParameter>,
}

impl ScriptedHost {
    pub fn new(script: HostScript) -> Self {
        Self {
            script,
            calls: Vec::new(),
            accepted: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Parameters the host accepted during negotiation
    pub fn accepted(&self) -> &[HostParameter] {
        &self.accepted
    }

    pub fn session_ended(&self) -> bool {
        self.calls.contains(&HostCall::EndSession)
    }

    fn listed(names: &[String], name: &str) -> bool {
        names.iter().any(|n| n == name)
    }
}

impl HostEndpoint for ScriptedHost {
    fn begin_session(&mut self) -> Result<(), HostFault> {
        self.calls.push(HostCall::BeginSession);
        match &self.script.begin_failure {
            Some(message) => Err(HostFault::Recoverable(message.clone())),
            None => Ok(()),
        }
    }

    fn set_parameter(&mut self, parameter: &HostParameter) -> ParameterSupport {
        self.calls.push(HostCall::SetParameter(parameter.name));

        if self.script.fatal_on.as_deref() == Some(parameter.name) {
            return ParameterSupport::Fatal(format!("host faulted on {}", parameter.name));
        }
        if Self::listed(&self.script.rejected, parameter.name) {
            return ParameterSupport::Rejected(format!("{} rejected", parameter.name));
        }
        if Self::listed(&self.script.unsupported, parameter.name) {
            return ParameterSupport::Unsupported;
        }

        self.accepted.push(parameter.clone());
        ParameterSupport::Supported
    }

    fn end_session(&mut self) -> SessionEnd {
        self.calls.push(HostCall::EndSession);
        match &self.script.end_failure {
            Some(message) => SessionEnd::Failed(message.clone()),
            None => SessionEnd::Completed {
                warning: self.script.end_warning.clone(),
            },
        }
    }

    fn is_design_time(&self) -> bool {
        self.script.design_time
    }

    fn is_up_to_date(&self) -> bool {
        self.script.up_to_date
    }

    fn compile(&mut self) -> bool {
        self.calls.push(HostCall::Compile);
        self.script.compile_succeeds
    }
}

//! In-process host endpoint contract
//!
//! A host (an IDE's background compiler, for instance) can compile without a
//! process launch, but it may not support every option a request carries.
//! Negotiation is a session: begin, offer each parameter, end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value offered for one compile parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Flag(Option<bool>),
    Number(Option<u32>),
    Text(Option<String>),
    List(Vec<String>),
}

impl ParameterValue {
    /// Whether the request actually sets this parameter
    pub fn is_set(&self) -> bool {
        match self {
            Self::Flag(v) => v.is_some(),
            Self::Number(v) => v.is_some(),
            Self::Text(v) => v.as_deref().is_some_and(|s| !s.is_empty()),
            Self::List(v) => !v.is_empty(),
        }
    }
}

/// One `{name, value}` pair offered to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostParameter {
    pub name: &'static str,
    pub value: ParameterValue,
}

impl HostParameter {
    pub fn new(name: &'static str, value: ParameterValue) -> Self {
        Self { name, value }
    }
}

/// Host answer for a single parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSupport {
    Supported,
    /// The host cannot honor this value
    Unsupported,
    /// The host raised a recoverable error while setting the value.
    /// Treated like `Unsupported`.
    Rejected(String),
    /// Unrecoverable host fault; negotiation is aborted.
    Fatal(String),
}

/// Failure to open a negotiation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFault {
    Recoverable(String),
    Fatal(String),
}

impl fmt::Display for HostFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(m) => write!(f, "{m}"),
            Self::Fatal(m) => write!(f, "fatal: {m}"),
        }
    }
}

/// Diagnostic attached to the end of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMessage {
    pub code: u32,
    pub text: String,
}

impl HostMessage {
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Compiler-style code, e.g. `BC30420`
    pub fn display_code(&self) -> String {
        format!("BC{}", self.code)
    }
}

/// Result of ending a negotiation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Values accepted; the host may still attach a warning
    Completed { warning: Option<HostMessage> },
    /// The host rejected a value when validating the whole set
    Failed(HostMessage),
}

impl SessionEnd {
    pub fn completed() -> Self {
        Self::Completed { warning: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Capability-query-able in-process compiler.
///
/// Calls are synchronous and may block (the host can marshal them to its own
/// thread). One negotiation per compile request.
#[cfg_attr(test, mockall::automock)]
pub trait HostEndpoint {
    fn begin_session(&mut self) -> Result<(), HostFault>;

    fn set_parameter(&mut self, parameter: &HostParameter) -> ParameterSupport;

    fn end_session(&mut self) -> SessionEnd;

    /// Editor-feedback mode: negotiate but never produce build outputs
    fn is_design_time(&self) -> bool;

    fn is_up_to_date(&self) -> bool;

    /// Compile with the negotiated parameters. Returns success.
    fn compile(&mut self) -> bool;
}

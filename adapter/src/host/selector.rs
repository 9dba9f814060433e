//! Execution Strategy Selector
//!
//! Decides, once per compile request, whether the in-process host compiles,
//! the command-line compiler is launched, or nothing more needs to happen.
//!
//! ```text
//! no host ─────────────────────────────────────────────▶ UseExternalTool
//! host ─▶ negotiate ─▶ design-time? ─▶ DoneSuccess | DoneFailure
//!                   └▶ partial coverage / forced ─▶ refs present? ─▶ UseExternalTool | DoneFailure
//!                   └▶ full coverage ─▶ up to date? ─▶ DoneSuccess | UseHost
//!                   └▶ negotiation failed ─────────────▶ DoneFailure
//! ```

use crate::error::{AdapterError, AdapterResult};
use crate::host::endpoint::{HostEndpoint, HostFault, HostParameter, ParameterSupport, SessionEnd};
use crate::invocation::artifacts::{missing_references, ArtifactProbe, FsProbe};
use crate::invocation::options::CompileOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a request finished without compiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The host could not begin or end the negotiation session
    NegotiationFailed,
    /// Fallback was required but these referenced inputs are missing
    MissingReferences(Vec<PathBuf>),
}

/// Terminal decision for one compile request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyOutcome {
    /// Delegate to the host endpoint
    UseHost,
    /// Launch the command-line compiler
    UseExternalTool,
    /// Nothing to do; report success
    DoneSuccess,
    /// Nothing to do; report failure
    DoneFailure(FailureReason),
}

impl StrategyOutcome {
    /// Whether a compilation (host or external) follows
    pub fn compiles(&self) -> bool {
        matches!(self, Self::UseHost | Self::UseExternalTool)
    }
}

impl fmt::Display for StrategyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UseHost => write!(f, "use_host"),
            Self::UseExternalTool => write!(f, "use_external_tool"),
            Self::DoneSuccess => write!(f, "done_success"),
            Self::DoneFailure(FailureReason::NegotiationFailed) => {
                write!(f, "done_failure (host negotiation failed)")
            }
            Self::DoneFailure(FailureReason::MissingReferences(paths)) => {
                write!(f, "done_failure ({} missing reference(s))", paths.len())
            }
        }
    }
}

/// Caller-level policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorPolicy {
    /// Use the host when it covers every parameter. When false the host is
    /// still negotiated with (design-time needs it) but never compiles.
    pub prefer_host: bool,
    /// Always fall back to the command-line compiler at build time
    pub force_external_tool: bool,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            prefer_host: true,
            force_external_tool: false,
        }
    }
}

/// Result of one negotiation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Session began and ended without the host rejecting the value set
    pub succeeded: bool,
    /// Host supports every offered parameter (and the policy prefers it)
    pub covers_all: bool,
    /// Parameters the host declined or rejected
    pub unsupported: Vec<&'static str>,
}

/// Ends the host session on every exit path, including early returns.
struct SessionGuard<'h> {
    host: &'h mut dyn HostEndpoint,
    open: bool,
}

impl<'h> SessionGuard<'h> {
    fn new(host: &'h mut dyn HostEndpoint) -> Self {
        Self { host, open: true }
    }

    fn host(&mut self) -> &mut dyn HostEndpoint {
        &mut *self.host
    }

    fn end(mut self) -> SessionEnd {
        self.open = false;
        self.host.end_session()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.open {
            let end = self.host.end_session();
            debug!(success = end.is_success(), "Host session ended after aborted negotiation");
        }
    }
}

/// Chooses the execution strategy for a compile request
#[derive(Clone)]
pub struct ExecutionStrategySelector {
    policy: SelectorPolicy,
    probe: Arc<dyn ArtifactProbe + Send + Sync>,
}

impl fmt::Debug for ExecutionStrategySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionStrategySelector")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for ExecutionStrategySelector {
    fn default() -> Self {
        Self::new(SelectorPolicy::default())
    }
}

impl ExecutionStrategySelector {
    pub fn new(policy: SelectorPolicy) -> Self {
        Self {
            policy,
            probe: Arc::new(FsProbe::new()),
        }
    }

    /// Replace the file-system probe used for the fallback reference check
    pub fn with_probe(mut self, probe: Arc<dyn ArtifactProbe + Send + Sync>) -> Self {
        self.probe = probe;
        self
    }

    pub fn policy(&self) -> SelectorPolicy {
        self.policy
    }

    /// Run the selection protocol. Call at most once per compile request.
    ///
    /// Only unrecoverable host faults are errors; everything else is an
    /// outcome.
    pub fn select(
        &self,
        host: Option<&mut dyn HostEndpoint>,
        options: &CompileOptions,
    ) -> AdapterResult<StrategyOutcome> {
        let Some(host) = host else {
            debug!("No host compiler attached; using the command-line compiler");
            return Ok(StrategyOutcome::UseExternalTool);
        };

        let negotiation = self.negotiate(&mut *host, &options.host_parameters())?;

        let outcome = if host.is_design_time() {
            if negotiation.succeeded {
                StrategyOutcome::DoneSuccess
            } else {
                StrategyOutcome::DoneFailure(FailureReason::NegotiationFailed)
            }
        } else if !negotiation.covers_all || self.policy.force_external_tool {
            let missing =
                missing_references(self.probe.as_ref(), &options.referenced_artifacts());
            if missing.is_empty() {
                StrategyOutcome::UseExternalTool
            } else {
                StrategyOutcome::DoneFailure(FailureReason::MissingReferences(missing))
            }
        } else if negotiation.succeeded {
            if host.is_up_to_date() {
                StrategyOutcome::DoneSuccess
            } else {
                StrategyOutcome::UseHost
            }
        } else {
            StrategyOutcome::DoneFailure(FailureReason::NegotiationFailed)
        };

        info!(
            outcome = %outcome,
            covers_all = negotiation.covers_all,
            negotiated = negotiation.succeeded,
            unsupported = negotiation.unsupported.len(),
            "Selected execution strategy"
        );
        Ok(outcome)
    }

    /// Begin a session, offer every parameter, end the session.
    pub fn negotiate(
        &self,
        host: &mut dyn HostEndpoint,
        parameters: &[HostParameter],
    ) -> AdapterResult<Negotiation> {
        let mut negotiation = Negotiation {
            covers_all: self.policy.prefer_host,
            ..Default::default()
        };
        let mut session = SessionGuard::new(host);

        let began = match session.host().begin_session() {
            Ok(()) => true,
            Err(HostFault::Recoverable(message)) => {
                error!(%message, "Could not begin host compiler negotiation");
                false
            }
            Err(HostFault::Fatal(message)) => {
                return Err(AdapterError::host_fatal("BeginSession", message));
            }
        };

        if began {
            for parameter in parameters {
                match session.host().set_parameter(parameter) {
                    ParameterSupport::Supported => {}
                    ParameterSupport::Unsupported => {
                        debug!(parameter = parameter.name, "Parameter unsupported by host compiler");
                        negotiation.covers_all = false;
                        negotiation.unsupported.push(parameter.name);
                    }
                    ParameterSupport::Rejected(reason) => {
                        warn!(parameter = parameter.name, %reason, "Host compiler rejected parameter");
                        negotiation.covers_all = false;
                        negotiation.unsupported.push(parameter.name);
                    }
                    ParameterSupport::Fatal(message) => {
                        return Err(AdapterError::host_fatal(parameter.name, message));
                    }
                }
            }
        }

        let end = session.end();

        // With partial coverage the command-line compiler reports these itself.
        if negotiation.covers_all {
            match &end {
                SessionEnd::Failed(message) => {
                    error!(code = %message.display_code(), "{}", message.text);
                }
                SessionEnd::Completed {
                    warning: Some(message),
                } if !message.text.is_empty() => {
                    warn!(code = %message.display_code(), "{}", message.text);
                }
                SessionEnd::Completed { .. } => {}
            }
        }

        negotiation.succeeded = began && end.is_success();
        Ok(negotiation)
    }
}

//! Host compiler negotiation
//!
//! - `endpoint`: the contract an in-process host implements
//! - `selector`: chooses host, command-line compiler, or no action
//! - `scripted`: deterministic host for tests and rehearsals

pub mod endpoint;
pub mod scripted;
pub mod selector;

pub use endpoint::{
    HostEndpoint, HostFault, HostMessage, HostParameter, ParameterSupport, ParameterValue,
    SessionEnd,
};
pub use scripted::{HostCall, HostScript, ScriptedHost};
pub use selector::{
    ExecutionStrategySelector, FailureReason, Negotiation, SelectorPolicy, StrategyOutcome,
};

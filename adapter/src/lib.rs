//! VB compiler-invocation adapter
//!
//! Two pieces sit between a build engine and the Visual Basic compiler:
//!
//! - [`host::ExecutionStrategySelector`] negotiates with an optional
//!   in-process host compiler and decides whether the host compiles, the
//!   command-line compiler is launched, or the request is already settled.
//! - [`diagnostics::DiagnosticStreamReconstructor`] folds the caret column
//!   of multi-line compiler diagnostics back into a canonical one-line
//!   header.
//!
//! [`invocation::CompileOrchestrator`] wires both together for a single
//! compile request.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod invocation;

pub use config::AdapterConfig;
pub use diagnostics::{
    normalize_lines, DiagnosticLine, DiagnosticSink, DiagnosticStreamReconstructor, LogSink,
    MessageImportance,
};
pub use error::{AdapterError, AdapterResult};
pub use host::{
    ExecutionStrategySelector, FailureReason, HostEndpoint, ScriptedHost, SelectorPolicy,
    StrategyOutcome,
};
pub use invocation::{CompileOptions, CompileOrchestrator, CompileReport};

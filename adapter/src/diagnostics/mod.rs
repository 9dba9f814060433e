//! Diagnostic normalization
//!
//! Compiler output is fed line by line through the reconstructor, which
//! rewrites caret-annotated blocks into canonical single-line diagnostics and
//! hands everything to a sink.
//!
//! ```text
//! compiler stdout/stderr → DiagnosticStreamReconstructor → DiagnosticSink → tracing
//!                                  │
//!                                  └── canonical::parse (header detection)
//! ```

pub mod canonical;
pub mod line;
pub mod reconstructor;
pub mod sink;

pub use canonical::{CanonicalDiagnostic, Category};
pub use line::{DiagnosticLine, MessageImportance};
pub use reconstructor::{normalize_lines, DiagnosticStreamReconstructor};
pub use sink::{DiagnosticSink, LogSink};

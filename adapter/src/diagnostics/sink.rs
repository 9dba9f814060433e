//! Output side of the diagnostic stream.
//!
//! A sink receives normalized `(text, importance)` lines in order. [`LogSink`]
//! forwards them to `tracing` and keeps the counts the orchestrator uses to
//! decide success.

use crate::diagnostics::canonical::{self, Category};
use crate::diagnostics::line::{DiagnosticLine, MessageImportance};
use tracing::{debug, error, info, warn};

/// Receiver for normalized diagnostic lines
pub trait DiagnosticSink {
    fn emit(&mut self, line: DiagnosticLine);
}

impl DiagnosticSink for Vec<DiagnosticLine> {
    fn emit(&mut self, line: DiagnosticLine) {
        self.push(line);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, line: DiagnosticLine) {
        (**self).emit(line);
    }
}

/// Sink that logs every line through `tracing`
#[derive(Debug, Default)]
pub struct LogSink {
    errors: usize,
    warnings: usize,
    /// Retained lines, when capture is enabled
    captured: Option<Vec<DiagnosticLine>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain every emitted line in addition to logging it
    pub fn capturing() -> Self {
        Self {
            captured: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_logged_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn captured(&self) -> &[DiagnosticLine] {
        self.captured.as_deref().unwrap_or(&[])
    }

    pub fn into_captured(self) -> Vec<DiagnosticLine> {
        self.captured.unwrap_or_default()
    }
}

impl DiagnosticSink for LogSink {
    fn emit(&mut self, line: DiagnosticLine) {
        match canonical::parse(&line.text) {
            Some(d) if d.category == Category::Error => {
                self.errors += 1;
                error!(
                    file = %d.file,
                    line = ?d.line,
                    column = ?d.column,
                    code = d.code.as_deref().unwrap_or(""),
                    "{}",
                    d.message
                );
            }
            Some(d) => {
                self.warnings += 1;
                warn!(
                    file = %d.file,
                    line = ?d.line,
                    column = ?d.column,
                    code = d.code.as_deref().unwrap_or(""),
                    "{}",
                    d.message
                );
            }
            None => match line.importance {
                MessageImportance::High => info!("{}", line.text),
                MessageImportance::Normal | MessageImportance::Low => debug!("{}", line.text),
            },
        }

        if let Some(captured) = self.captured.as_mut() {
            captured.push(line);
        }
    }
}

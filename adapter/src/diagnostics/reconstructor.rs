//! Diagnostic Stream Reconstructor
//!
//! When the compiler points at a token rather than a whole line it writes a
//! four-part block:
//!
//! ```text
//! Module1.vb(10) : error BC30451: 'y' is not declared.   <- header (+ message lines)
//!                                                         <- blank separator
//!         Dim x = y                                       <- source text
//!                 ~                                       <- caret
//! ```
//!
//! The reconstructor folds the caret position back into the header so the
//! rest of the toolchain sees `Module1.vb(10,17) : error BC30451: ...`. All
//! buffered lines are still emitted, in order, exactly once.
//!
//! ```text
//! Idle ──header(line, no column)──▶ BufferingBody ──blank──▶ BodyClosed
//!  ▲                                                             │
//!  └──────────── body + 3 lines: rewrite or pass through ────────┘
//! ```

use crate::diagnostics::canonical;
use crate::diagnostics::line::{DiagnosticLine, MessageImportance};
use crate::diagnostics::sink::DiagnosticSink;
use std::collections::VecDeque;
use tracing::debug;

/// Number of lines after the message body: blank, source, caret.
const LOOKAHEAD_LINES: usize = 3;

const CARET: char = '~';
const LOCATION_CLOSE: char = ')';

/// Machine state. The buffer lives inside the non-idle variants so state and
/// buffer contents cannot disagree.
#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    /// Header seen, collecting message lines until the first blank line.
    BufferingBody { buffer: VecDeque<DiagnosticLine> },
    /// Blank separator seen; `body_line_count` lines precede it.
    BodyClosed {
        buffer: VecDeque<DiagnosticLine>,
        body_line_count: usize,
    },
}

/// Rewrites multi-line, caret-annotated diagnostics into single-line form
#[derive(Debug, Default)]
pub struct DiagnosticStreamReconstructor {
    state: State,
}

impl DiagnosticStreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Lines currently held back
    pub fn buffered(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::BufferingBody { buffer } | State::BodyClosed { buffer, .. } => buffer.len(),
        }
    }

    /// Consume one line, emitting zero or more lines to `sink`.
    pub fn feed(&mut self, line: DiagnosticLine, sink: &mut impl DiagnosticSink) {
        self.state = match std::mem::take(&mut self.state) {
            State::Idle => {
                if starts_diagnostic_block(&line.text) {
                    State::BufferingBody {
                        buffer: VecDeque::from([line]),
                    }
                } else {
                    sink.emit(line);
                    State::Idle
                }
            }
            State::BufferingBody { mut buffer } => {
                if line.is_blank() {
                    let body_line_count = buffer.len();
                    buffer.push_back(line);
                    State::BodyClosed {
                        buffer,
                        body_line_count,
                    }
                } else {
                    buffer.push_back(line);
                    State::BufferingBody { buffer }
                }
            }
            State::BodyClosed {
                mut buffer,
                body_line_count,
            } => {
                buffer.push_back(line);
                if buffer.len() == body_line_count + LOOKAHEAD_LINES {
                    flush_block(buffer, sink);
                    State::Idle
                } else {
                    State::BodyClosed {
                        buffer,
                        body_line_count,
                    }
                }
            }
        };
    }

    /// Feed a whole line of text received at `importance`.
    pub fn feed_text(
        &mut self,
        text: impl Into<String>,
        importance: MessageImportance,
        sink: &mut impl DiagnosticSink,
    ) {
        self.feed(DiagnosticLine::new(text, importance), sink);
    }

    /// End of stream: emit any held-back lines verbatim and return to idle.
    pub fn finish(&mut self, sink: &mut impl DiagnosticSink) {
        match std::mem::take(&mut self.state) {
            State::Idle => {}
            State::BufferingBody { buffer } | State::BodyClosed { buffer, .. } => {
                debug!(
                    lines = buffer.len(),
                    "Stream ended inside a diagnostic block; passing it through"
                );
                buffer.into_iter().for_each(|l| sink.emit(l));
            }
        }
    }
}

/// Normalize a finite sequence of lines in one pass.
pub fn normalize_lines(lines: impl IntoIterator<Item = DiagnosticLine>) -> Vec<DiagnosticLine> {
    let mut reconstructor = DiagnosticStreamReconstructor::new();
    let mut out = Vec::new();
    for line in lines {
        reconstructor.feed(line, &mut out);
    }
    reconstructor.finish(&mut out);
    out
}

/// An error or warning with a line number but no column opens a block.
/// Project-level diagnostics (no line) have nothing to reconstruct.
fn starts_diagnostic_block(text: &str) -> bool {
    canonical::parse(text).is_some_and(|d| d.column.is_none() && d.line.is_some())
}

/// Insert `,<column>` before the header's closing location delimiter.
/// The column is the 1-based index of the first caret.
fn rewrite_header(header: &str, caret_line: &str) -> Option<String> {
    let column = caret_line.find(CARET)? + 1;
    let close = header.find(LOCATION_CLOSE)?;
    Some(format!("{},{}{}", &header[..close], column, &header[close..]))
}

/// The last buffered line is the caret line.
fn flush_block(mut buffer: VecDeque<DiagnosticLine>, sink: &mut impl DiagnosticSink) {
    let Some(header) = buffer.pop_front() else {
        return;
    };
    let rewritten = buffer
        .back()
        .and_then(|caret| rewrite_header(&header.text, &caret.text));

    match rewritten {
        Some(text) => {
            debug!(header = %header.text, rewritten = %text, "Reconstructed diagnostic column");
            sink.emit(DiagnosticLine::new(text, header.importance));
        }
        None => {
            debug!(header = %header.text, "No caret or location delimiter; passing block through");
            sink.emit(header);
        }
    }

    buffer.into_iter().for_each(|l| sink.emit(l));
}

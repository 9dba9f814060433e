//! Canonical diagnostic line parsing
//!
//! Recognizes the single-line form shared by the compiler and the build
//! toolchain:
//!
//! ```text
//! origin(location) : [subcategory ]category [code]: text
//! C:\src\Module1.vb(10,5): error BC30451: 'y' is not declared.
//! vbc : warning BC2007: unrecognized option 'x'; ignored
//! ```
//!
//! Location may be `(line)`, `(line-endLine)`, `(line,col)`,
//! `(line,col-endCol)` or `(line,col,endLine,endCol)`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Splits a line into origin, subcategory, category, code and text.
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?P<origin>(?:\d+>)?[a-z]?:[^:]*|[^:]*):)?(?P<subcategory>|[^:]*? )(?P<category>error|warning)(?:\s+(?P<code>[^:\s]*))?\s*:(?P<text>.*)$",
    )
    .unwrap()
});

/// Splits an origin into file name and parenthesized location.
static ORIGIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.*?)\s*\((?P<location>[0-9,\-]*)\)$").unwrap()
});

/// Build node prefix (`12>`) on multi-process build output.
static NODE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+>").unwrap());

/// Severity of a canonical diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Error,
    Warning,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A parsed canonical diagnostic line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDiagnostic {
    pub category: Category,
    /// File or tool name the diagnostic refers to (empty when absent)
    pub file: String,
    pub subcategory: Option<String>,
    /// Diagnostic code (e.g., "BC30451")
    pub code: Option<String>,
    /// 1-based line, `None` when unspecified
    pub line: Option<u32>,
    /// 1-based column, `None` when unspecified
    pub column: Option<u32>,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
    pub message: String,
}

impl CanonicalDiagnostic {
    pub fn is_error(&self) -> bool {
        self.category == Category::Error
    }

    /// Whether the diagnostic points into a source file
    pub fn has_location(&self) -> bool {
        self.line.is_some()
    }
}

/// Parse one line of compiler output.
///
/// Returns `None` when the line is not an error or warning in canonical form.
pub fn parse(line: &str) -> Option<CanonicalDiagnostic> {
    let caps = LINE_PATTERN.captures(line)?;

    let category = if caps["category"].eq_ignore_ascii_case("error") {
        Category::Error
    } else {
        Category::Warning
    };

    let subcategory = non_empty(caps.name("subcategory").map(|m| m.as_str()));
    let code = non_empty(caps.name("code").map(|m| m.as_str()));
    let message = caps
        .name("text")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let origin = caps.name("origin").map(|m| m.as_str().trim()).unwrap_or("");
    let origin = NODE_PREFIX.replace(origin, "");

    let mut diagnostic = CanonicalDiagnostic {
        category,
        file: origin.to_string(),
        subcategory,
        code,
        line: None,
        column: None,
        end_line: None,
        end_column: None,
        message,
    };

    if let Some(loc) = ORIGIN_PATTERN.captures(&origin) {
        diagnostic.file = loc["file"].to_string();
        apply_location(&mut diagnostic, &loc["location"]);
    }

    Some(diagnostic)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn number(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Split `a-b` into its two halves; a bare `a` has no end.
fn range(text: &str) -> (Option<u32>, Option<u32>) {
    match text.split_once('-') {
        Some((start, end)) => (number(start), number(end)),
        None => (number(text), None),
    }
}

fn apply_location(diagnostic: &mut CanonicalDiagnostic, location: &str) {
    let parts: Vec<&str> = location.split(',').collect();
    match parts.as_slice() {
        [line] => {
            let (line, end_line) = range(line);
            diagnostic.line = line;
            diagnostic.end_line = end_line;
        }
        [line, column] => {
            let (column, end_column) = range(column);
            diagnostic.line = number(line);
            diagnostic.column = column;
            diagnostic.end_column = end_column;
        }
        [line, column, end_line, end_column] => {
            diagnostic.line = number(line);
            diagnostic.column = number(column);
            diagnostic.end_line = number(end_line);
            diagnostic.end_column = number(end_column);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_only_header() {
        let d = parse("File.vb(10): error BC123: msg").unwrap();
        assert_eq!(d.category, Category::Error);
        assert_eq!(d.file, "File.vb");
        assert_eq!(d.code.as_deref(), Some("BC123"));
        assert_eq!(d.line, Some(10));
        assert_eq!(d.column, None);
        assert_eq!(d.message, "msg");
    }

    #[test]
    fn test_parse_line_and_column() {
        let d = parse(r"C:\src\Module1.vb(10,5) : warning BC42024: Unused local variable: 'x'.")
            .unwrap();
        assert_eq!(d.category, Category::Warning);
        assert_eq!(d.file, r"C:\src\Module1.vb");
        assert_eq!(d.line, Some(10));
        assert_eq!(d.column, Some(5));
        assert_eq!(d.message, "Unused local variable: 'x'.");
    }

    #[test]
    fn test_parse_full_range() {
        let d = parse("a.vb(1,2,3,4): error BC1: m").unwrap();
        assert_eq!(
            (d.line, d.column, d.end_line, d.end_column),
            (Some(1), Some(2), Some(3), Some(4))
        );

        let d = parse("a.vb(7-9): error BC1: m").unwrap();
        assert_eq!((d.line, d.end_line, d.column), (Some(7), Some(9), None));

        let d = parse("a.vb(7,3-8): error BC1: m").unwrap();
        assert_eq!((d.column, d.end_column), (Some(3), Some(8)));
    }

    #[test]
    fn test_parse_project_level_diagnostic() {
        let d = parse("vbc : error BC2001: file 'Missing.vb' could not be found").unwrap();
        assert_eq!(d.file, "vbc");
        assert_eq!(d.line, None);
        assert!(!d.has_location());
    }

    #[test]
    fn test_parse_without_origin() {
        let d = parse("error BC2006: option 'out' requires ':<file>'").unwrap();
        assert_eq!(d.file, "");
        assert_eq!(d.code.as_deref(), Some("BC2006"));
        assert_eq!(d.message, "option 'out' requires ':<file>'");
    }

    #[test]
    fn test_parse_subcategory_and_node_prefix() {
        let d = parse("3>Main.vb(4): fatal error BC999: boom").unwrap();
        assert_eq!(d.file, "Main.vb");
        assert_eq!(d.subcategory.as_deref(), Some("fatal"));
        assert!(d.is_error());
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(parse("").is_none());
        assert!(parse("        Dim x As Integer = y").is_none());
        assert!(parse("                ~").is_none());
        assert!(parse("Microsoft (R) Visual Basic Compiler version 4.8").is_none());
    }
}

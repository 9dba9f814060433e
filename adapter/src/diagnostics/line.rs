//! Raw compiler output lines and the importance they were received with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Importance level attached to a line of compiler output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageImportance {
    High,
    #[default]
    Normal,
    Low,
}

impl fmt::Display for MessageImportance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One line of compiler output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLine {
    /// Line text without the trailing newline
    pub text: String,
    /// Importance the line was received with
    pub importance: MessageImportance,
}

impl DiagnosticLine {
    pub fn new(text: impl Into<String>, importance: MessageImportance) -> Self {
        Self {
            text: text.into(),
            importance,
        }
    }

    /// Line at [`MessageImportance::Normal`]
    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, MessageImportance::Normal)
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for DiagnosticLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

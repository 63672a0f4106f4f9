//! Event severity enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a system event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine operation.
    #[default]
    Info,
    /// Unexpected but tolerable condition.
    Warning,
    /// Operation failed.
    Error,
    /// Operation failed and needs immediate attention.
    Critical,
}

impl Severity {
    /// Return the severity as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Task safety policy configuration.

use serde::{Deserialize, Serialize};

/// Matching mode for the task command policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Block commands matching a dangerous pattern, allow everything else.
    #[default]
    Denylist,
    /// Only allow commands matching an approved prefix pattern.
    Allowlist,
}

/// Task command policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    /// Matching mode: `"denylist"` or `"allowlist"`.
    #[serde(default)]
    pub mode: PolicyMode,
    /// Comma-separated extra regex patterns appended to the denylist.
    #[serde(default)]
    pub extra_deny_patterns: String,
    /// Comma-separated extra regex patterns appended to the allowlist.
    #[serde(default)]
    pub extra_allow_patterns: String,
}

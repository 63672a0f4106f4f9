//! Webhook delivery configuration.

use serde::{Deserialize, Serialize};

/// Webhook delivery engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Default maximum delivery attempts when a webhook does not set its own.
    #[serde(default = "default_retry_max")]
    pub default_retry_max: u32,
    /// Default per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub default_timeout_seconds: u64,
    /// Maximum number of response body characters stored per delivery log row.
    #[serde(default = "default_body_limit")]
    pub response_body_limit: usize,
    /// Permit delivery to private/loopback network targets.
    ///
    /// Only for air-gapped installs where every webhook target is internal.
    /// The http/https scheme requirement is enforced regardless.
    #[serde(default)]
    pub allow_private_networks: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            default_retry_max: default_retry_max(),
            default_timeout_seconds: default_timeout(),
            response_body_limit: default_body_limit(),
            allow_private_networks: false,
        }
    }
}

fn default_retry_max() -> u32 {
    3
}

fn default_timeout() -> u64 {
    10
}

fn default_body_limit() -> usize {
    1000
}

//! Secret vault configuration.

use serde::{Deserialize, Serialize};

/// Secret vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Master secret from which the at-rest encryption key is derived.
    pub master_secret: String,
}

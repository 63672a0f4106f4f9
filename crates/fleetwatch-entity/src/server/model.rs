//! Managed server entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A remote server or container under management.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManagedServer {
    /// Unique server identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: i32,
    /// SSH login user.
    pub ssh_user: String,
    /// Vault-encrypted SSH private key or password.
    ///
    /// Never serialized into API responses.
    #[serde(skip_serializing)]
    pub ssh_credential: Option<String>,
    /// Last reported status, e.g. `"online"`, `"offline"`.
    pub last_status: Option<String>,
    /// When the server record was created.
    pub created_at: DateTime<Utc>,
    /// When the server record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServer {
    /// Display name.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: i32,
    /// SSH login user.
    pub ssh_user: String,
    /// Plaintext SSH credential; encrypted by the vault before storage.
    pub ssh_credential: Option<String>,
}

//! Managed server repository.
//!
//! SSH credentials are encrypted with the vault before they touch the
//! database and decrypted only on explicit request.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::server::model::{CreateServer, ManagedServer};
use fleetwatch_security::SecretVault;

/// Repository for managed servers.
#[derive(Clone)]
pub struct ServerRepository {
    pool: PgPool,
    vault: Arc<SecretVault>,
}

impl ServerRepository {
    /// Create a new server repository.
    pub fn new(pool: PgPool, vault: Arc<SecretVault>) -> Self {
        Self { pool, vault }
    }

    /// Register a server, encrypting its SSH credential at rest.
    pub async fn create(&self, data: &CreateServer) -> AppResult<ManagedServer> {
        let encrypted = match &data.ssh_credential {
            Some(plaintext) => Some(self.vault.encrypt(plaintext.as_bytes())?),
            None => None,
        };

        sqlx::query_as::<_, ManagedServer>(
            "INSERT INTO servers (name, host, port, ssh_user, ssh_credential) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.host)
        .bind(data.port)
        .bind(&data.ssh_user)
        .bind(&encrypted)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create server", e))
    }

    /// Find a server by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ManagedServer>> {
        sqlx::query_as::<_, ManagedServer>("SELECT * FROM servers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find server", e))
    }

    /// List all servers.
    pub async fn find_all(&self) -> AppResult<Vec<ManagedServer>> {
        sqlx::query_as::<_, ManagedServer>("SELECT * FROM servers ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list servers", e))
    }

    /// Decrypt and return a server's SSH credential.
    pub async fn ssh_credential(&self, id: Uuid) -> AppResult<Option<String>> {
        let server = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Server not found"))?;
        match server.ssh_credential {
            Some(ciphertext) => {
                let plaintext = self.vault.decrypt(&ciphertext)?;
                let credential = String::from_utf8(plaintext)
                    .map_err(|_| AppError::crypto("decryption failed"))?;
                Ok(Some(credential))
            }
            None => Ok(None),
        }
    }

    /// Record the last observed status, e.g. after a health probe.
    pub async fn update_status(&self, id: Uuid, status: &str) -> AppResult<()> {
        sqlx::query("UPDATE servers SET last_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update server status", e)
            })?;
        Ok(())
    }

    /// Remove a server.
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM servers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete server", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}

//! Shared result alias.

use crate::error::AppError;

/// Result alias used across all FleetWatch crates.
pub type AppResult<T> = Result<T, AppError>;

//! # fleetwatch-core
//!
//! Core configuration schemas, the unified error type, and shared
//! result alias used by every other FleetWatch crate.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;

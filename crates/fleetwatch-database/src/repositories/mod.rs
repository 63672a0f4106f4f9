//! Concrete PostgreSQL repositories.

pub mod audit;
pub mod delivery_log;
pub mod server;
pub mod session;
pub mod task;
pub mod user;
pub mod webhook;

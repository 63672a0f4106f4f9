//! # fleetwatch-database
//!
//! PostgreSQL connection management, concrete repositories for all
//! FleetWatch entities, and the storage-trait adapters the events and
//! recovery crates consume.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;

//! # fleetwatch-entity
//!
//! Domain entity models for FleetWatch. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod event;
pub mod server;
pub mod session;
pub mod task;
pub mod user;
pub mod webhook;

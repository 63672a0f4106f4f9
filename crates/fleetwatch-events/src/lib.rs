//! # fleetwatch-events
//!
//! The event dispatch core: every noteworthy action in FleetWatch is
//! wrapped into an [`Event`](fleetwatch_entity::event::Event) and pushed
//! through the plugin manager (synchronous in-process fan-out) and the
//! webhook dispatcher (per-endpoint HTTP delivery with retry).

pub mod dispatch;
pub mod plugin;
pub mod store;
pub mod webhook;

pub use dispatch::EventDispatcher;
pub use plugin::manager::PluginManager;
pub use plugin::registry::PluginRegistry;
pub use plugin::traits::{EventPlugin, PluginContext};
pub use webhook::dispatcher::WebhookDispatcher;

//! Plugin system: capability trait, static factory registry, and the
//! manager that fans events out to loaded plugins.

pub mod builtin;
pub mod manager;
pub mod registry;
pub mod traits;

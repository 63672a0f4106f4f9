//! Webhook delivery engine.

pub mod dispatcher;
pub mod signature;

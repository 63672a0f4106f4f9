//! # fleetwatch-security
//!
//! The safety-critical building blocks of FleetWatch: the task command
//! policy engine, the at-rest secret vault, the keyed token-bucket rate
//! limiter, and SSRF validation for outbound webhook URLs.

pub mod policy;
pub mod ratelimit;
pub mod ssrf;
pub mod vault;

pub use policy::{CommandPolicy, PolicyDecision};
pub use ratelimit::{RateLimitDecision, RateLimiter};
pub use ssrf::validate_url;
pub use vault::SecretVault;

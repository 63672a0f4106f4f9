//! # fleetwatch-notify
//!
//! Alert fan-out. The [`AlertManager`] takes one triggered alert, pushes
//! it to every enabled [`AlertChannel`] adapter (SMTP email, Telegram bot,
//! Slack incoming webhook), and emits an `alert.triggered` event so
//! plugins and webhooks see the alert too.

pub mod channel;
pub mod channels;
pub mod manager;

pub use channel::{AlertChannel, AlertMessage, ChannelResult};
pub use channels::email::EmailChannel;
pub use channels::slack::SlackChannel;
pub use channels::telegram::TelegramChannel;
pub use manager::AlertManager;

//! Alert channel configuration.

use serde::{Deserialize, Serialize};

/// Configuration for all alert notification channels.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertsConfig {
    /// SMTP email channel.
    #[serde(default)]
    pub email: EmailConfig,
    /// Telegram bot channel.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Slack incoming-webhook channel.
    #[serde(default)]
    pub slack: SlackConfig,
}

/// SMTP email alert channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay hostname.
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: String,
    /// SMTP password.
    #[serde(default)]
    pub password: String,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Telegram bot alert channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Bot API token.
    #[serde(default)]
    pub bot_token: String,
    /// Target chat identifier.
    #[serde(default)]
    pub chat_id: String,
}

/// Slack incoming-webhook alert channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlackConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Incoming webhook URL.
    #[serde(default)]
    pub webhook_url: String,
}

fn default_smtp_port() -> u16 {
    587
}

//! Channel adapters.

pub mod email;
pub mod slack;
pub mod telegram;

use crate::channel::AlertMessage;

/// Plain-text rendering shared by the chat-style channels.
pub(crate) fn render_text(alert: &AlertMessage) -> String {
    format!(
        "[{}] {} on {}\n{}",
        alert.severity.as_str().to_uppercase(),
        alert.alert_type,
        alert.server_name,
        alert.message
    )
}

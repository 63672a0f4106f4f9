//! SMTP email alert channel.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use fleetwatch_core::config::alerts::EmailConfig;
use fleetwatch_core::error::AppError;
use fleetwatch_core::result::AppResult;

use crate::channel::{AlertChannel, AlertMessage, ChannelResult};

const CHANNEL_NAME: &str = "email";

/// Sends alerts to a fixed recipient list via an SMTP relay.
pub struct EmailChannel {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailChannel {
    /// Build the channel; the transport is only constructed when enabled.
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let transport = if config.enabled && !config.smtp_host.is_empty() {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
                &config.smtp_host,
            )
            .map_err(|e| {
                AppError::configuration(format!("Invalid SMTP relay configuration: {e}"))
            })?
            .port(config.smtp_port);
            if !config.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ));
            }
            Some(builder.build())
        } else {
            None
        };

        Ok(Self { config, transport })
    }

    fn build_messages(&self, alert: &AlertMessage) -> Result<Vec<Message>, String> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| format!("invalid sender address: {e}"))?;

        let subject = render_subject(alert);
        let body = render_body(alert);

        let mut messages = Vec::with_capacity(self.config.recipients.len());
        for recipient in &self.config.recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| format!("invalid recipient address '{recipient}': {e}"))?;
            let message = Message::builder()
                .from(from.clone())
                .to(to)
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())
                .map_err(|e| format!("failed to build message: {e}"))?;
            messages.push(message);
        }
        Ok(messages)
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    fn enabled(&self) -> bool {
        self.config.enabled && self.transport.is_some() && !self.config.recipients.is_empty()
    }

    async fn send_alert(&self, alert: &AlertMessage) -> ChannelResult {
        let Some(transport) = &self.transport else {
            return ChannelResult::failed(CHANNEL_NAME, "channel is not configured");
        };

        let messages = match self.build_messages(alert) {
            Ok(messages) => messages,
            Err(e) => return ChannelResult::failed(CHANNEL_NAME, e),
        };
        if messages.is_empty() {
            return ChannelResult::failed(CHANNEL_NAME, "no recipients configured");
        }

        let mut errors = Vec::new();
        for message in messages {
            if let Err(e) = transport.send(message).await {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            debug!(
                recipients = self.config.recipients.len(),
                alert_type = %alert.alert_type,
                "alert email sent"
            );
            ChannelResult::ok(CHANNEL_NAME)
        } else {
            ChannelResult::failed(CHANNEL_NAME, errors.join("; "))
        }
    }
}

fn render_subject(alert: &AlertMessage) -> String {
    format!(
        "[FleetWatch][{}] {} on {}",
        alert.severity.as_str().to_uppercase(),
        alert.alert_type,
        alert.server_name
    )
}

fn render_body(alert: &AlertMessage) -> String {
    let server_line = match alert.server_id {
        Some(id) => format!("{} ({id})", alert.server_name),
        None => alert.server_name.clone(),
    };
    format!(
        "Alert: {}\nSeverity: {}\nServer: {}\n\n{}\n",
        alert.alert_type,
        alert.severity.as_str(),
        server_line,
        alert.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_entity::event::severity::Severity;
    use uuid::Uuid;

    fn alert() -> AlertMessage {
        AlertMessage {
            server_id: Some(Uuid::nil()),
            server_name: "db-1".to_string(),
            alert_type: "disk_full".to_string(),
            message: "Volume /data at 98%".to_string(),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn subject_and_body_identify_the_alert() {
        let subject = render_subject(&alert());
        assert_eq!(subject, "[FleetWatch][WARNING] disk_full on db-1");

        let body = render_body(&alert());
        assert!(body.contains("Severity: warning"));
        assert!(body.contains("Volume /data at 98%"));
        assert!(body.contains(&Uuid::nil().to_string()));
    }

    #[test]
    fn disabled_config_builds_without_a_transport() {
        let channel = EmailChannel::new(EmailConfig::default()).expect("channel");
        assert!(!channel.enabled());
    }

    #[tokio::test]
    async fn unconfigured_channel_reports_failure_instead_of_erroring() {
        let channel = EmailChannel::new(EmailConfig::default()).expect("channel");
        let result = channel.send_alert(&alert()).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn enabled_channel_requires_recipients() {
        let config = EmailConfig {
            enabled: true,
            smtp_host: "smtp.example.com".to_string(),
            from: "fleetwatch@example.com".to_string(),
            recipients: vec![],
            ..EmailConfig::default()
        };
        let channel = EmailChannel::new(config).expect("channel");
        assert!(!channel.enabled());
    }
}

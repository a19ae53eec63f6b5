use crate::models::MailSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Plain-text summary sent to operators when a run ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Delivers notifications through an unauthenticated SMTP relay, without TLS.
pub struct SmtpNotifier {
    settings: MailSettings,
}

impl SmtpNotifier {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let message = build_message(&self.settings, notification)?;

        let (host, port) = split_relay(&self.settings.smtp_server);
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host);
        if let Some(port) = port {
            builder = builder.port(port);
        }
        let transport = builder.build();

        transport
            .send(message)
            .await
            .with_context(|| format!("Failed to submit email to relay {}", self.settings.smtp_server))?;

        info!(
            "Sent '{}' to {} recipients",
            notification.subject,
            self.settings.recipients.len()
        );
        Ok(())
    }
}

/// Build one message with every recipient in a single To header
pub fn build_message(settings: &MailSettings, notification: &Notification) -> Result<Message> {
    let sender: Mailbox = settings
        .sender
        .parse()
        .with_context(|| format!("Invalid sender address: {}", settings.sender))?;

    let mut builder = Message::builder()
        .from(sender)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &settings.recipients {
        let mailbox: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", recipient))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(notification.body.clone())
        .context("Failed to build notification email")
}

/// Split `host[:port]`; without a port the transport's default (25) applies.
pub fn split_relay(smtp_server: &str) -> (&str, Option<u16>) {
    match smtp_server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (smtp_server, None),
        },
        _ => (smtp_server, None),
    }
}

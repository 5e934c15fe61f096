//! SMTP delivery via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::mail::templates::MailTemplates;
use crate::mail::Mailer;
use crate::shared::types::{DomainError, DomainResult};

/// Mailer backed by a real SMTP relay.
pub struct SmtpMailer {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: MailTemplates,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> DomainResult<Self> {
        let transport = build_transport(&config)?;
        let templates = MailTemplates::new()?;

        Ok(Self {
            config,
            transport,
            templates,
        })
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        html: String,
        text: String,
    ) -> DomainResult<Message> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_address)
            .parse()
            .map_err(|e| DomainError::Mail(format!("Invalid from address: {}", e)))?;

        let to = to
            .parse()
            .map_err(|e| DomainError::Mail(format!("Invalid to address: {}", e)))?;

        // HTML with a plain text fallback part
        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(text),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html),
            );

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(body)
            .map_err(|e| DomainError::Mail(format!("Failed to build message: {}", e)))
    }

    async fn deliver(&self, message: Message) -> DomainResult<()> {
        self.transport
            .send(message)
            .await
            .map_err(|e| DomainError::Mail(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn build_transport(config: &EmailConfig) -> DomainResult<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = if config.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DomainError::Mail(format!("Failed to create SMTP transport: {}", e)))?
    } else {
        // Plaintext, for local relays such as mailpit
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };

    builder = builder
        .port(config.smtp_port)
        .timeout(Some(Duration::from_secs(config.timeout_secs)));

    if !config.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ));
    }

    Ok(builder.build())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> DomainResult<()> {
        debug!(to = %to, "Sending password reset email");

        let (html, text) = self.templates.render_password_reset(username, reset_url)?;
        let message = self.build_message(
            to,
            "Password Reset Request - Core Application",
            html,
            text,
        )?;
        self.deliver(message).await?;

        info!(to = %to, "Password reset email sent");
        Ok(())
    }

    async fn send_password_changed(&self, to: &str, username: &str) -> DomainResult<()> {
        debug!(to = %to, "Sending password change confirmation email");

        let (html, text) = self.templates.render_password_changed(username)?;
        let message = self.build_message(
            to,
            "Password Changed Successfully - Core Application",
            html,
            text,
        )?;
        self.deliver(message).await?;

        info!(to = %to, "Password change confirmation sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message() {
        let config = EmailConfig::default();
        let mailer = SmtpMailer::new(config).unwrap();

        let message = mailer.build_message(
            "test@example.com",
            "Test Subject",
            "<h1>Test</h1>".to_string(),
            "Test".to_string(),
        );

        assert!(message.is_ok());
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let config = EmailConfig::default();
        let mailer = SmtpMailer::new(config).unwrap();

        let message = mailer.build_message(
            "not-an-address",
            "Test Subject",
            String::new(),
            String::new(),
        );

        assert!(matches!(message, Err(DomainError::Mail(_))));
    }
}

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

use crate::{
    config::SmtpSettings,
    errors::{AppError, AppResult},
};

const RESET_SUBJECT: &str = "Password Reset Request";

/// Delivers password-reset links to account holders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset_link(&self, email: &str, link: &str) -> AppResult<()>;
}

/// Sends reset links over SMTP with STARTTLS.
pub struct SmtpResetMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpResetMailer {
    pub fn new(settings: &SmtpSettings) -> AppResult<Self> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalError(format!("Invalid SMTP sender: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| AppError::InternalError(format!("Invalid SMTP relay: {}", e)))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.expose_secret().to_string(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl ResetMailer for SmtpResetMailer {
    async fn send_reset_link(&self, email: &str, link: &str) -> AppResult<()> {
        let message = reset_message(self.from.clone(), email, link)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to send reset email: {}", e)))?;

        log::info!("Password reset email sent to {}", email);
        Ok(())
    }
}

fn reset_message(from: Mailbox, to: &str, link: &str) -> AppResult<Message> {
    let to = to
        .parse::<Mailbox>()
        .map_err(|e| AppError::InternalError(format!("Invalid recipient address: {}", e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(RESET_SUBJECT)
        .header(ContentType::TEXT_HTML)
        .body(format!(
            "<p>You requested a password reset for your Learner account.</p>\
             <p>Click <a href=\"{link}\">here</a> to reset your password. \
             This link is valid for 1 hour.</p>"
        ))
        .map_err(|e| AppError::InternalError(format!("Failed to build reset email: {}", e)))
}

/// Development fallback used when no SMTP relay is configured. The token in
/// the link is redacted.
#[derive(Debug, Default, Clone)]
pub struct LogResetMailer;

#[async_trait]
impl ResetMailer for LogResetMailer {
    async fn send_reset_link(&self, email: &str, link: &str) -> AppResult<()> {
        log::debug!(
            "SMTP not configured; reset link for {} not sent: {}",
            email,
            redact_token(link)
        );
        Ok(())
    }
}

fn redact_token(link: &str) -> String {
    match link.split_once("token=") {
        Some((base, _)) => format!("{}token=[redacted]", base),
        None => link.to_string(),
    }
}

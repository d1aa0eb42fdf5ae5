//! Outgoing notifications.
//!
//! Services render messages from Askama templates and hand them to a
//! [`Notifier`]. In production that is [`SmtpNotifier`] (lettre over
//! STARTTLS); without SMTP configuration [`LogNotifier`] writes messages to
//! the log instead. [`MemoryNotifier`] records messages for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use mintgate_core::Email;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/verify_email.html")]
struct VerifyEmailHtml<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/verify_email.txt")]
struct VerifyEmailText<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/submission_declined.html")]
struct SubmissionDeclinedHtml<'a> {
    kind: &'a str,
}

#[derive(Template)]
#[template(path = "email/submission_declined.txt")]
struct SubmissionDeclinedText<'a> {
    kind: &'a str,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Delivery refused by the transport.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A rendered message with plain text and HTML bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Notification {
    /// Email asking a new account holder to confirm their address.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Template` if rendering fails.
    pub fn verify_email(username: &str, link: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            subject: "Confirm your Mintgate email address".to_owned(),
            text: VerifyEmailText { username, link }.render()?,
            html: VerifyEmailHtml { username, link }.render()?,
        })
    }

    /// Email carrying a single-use password reset link.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Template` if rendering fails.
    pub fn password_reset(username: &str, link: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            subject: "Reset your Mintgate password".to_owned(),
            text: PasswordResetText { username, link }.render()?,
            html: PasswordResetHtml { username, link }.render()?,
        })
    }

    /// Email telling a submitter that a reviewer declined their submission.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Template` if rendering fails.
    pub fn submission_declined(kind: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            subject: format!("Your {kind} was declined"),
            text: SubmissionDeclinedText { kind }.render()?,
            html: SubmissionDeclinedHtml { kind }.render()?,
        })
    }
}

/// Delivers notifications to an address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &Email, message: &Notification) -> Result<(), NotifyError>;
}

/// Sends multipart email over SMTP.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a new notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &Email, message: &Notification) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(message.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

/// Logs that a notification would have been sent. Used when SMTP is not
/// configured.
///
/// Only the recipient and subject are recorded. Bodies carry live
/// verification and reset links and must not reach logs or Sentry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &Email, message: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %to,
            subject = %message.subject,
            "SMTP not configured, notification not delivered"
        );
        Ok(())
    }
}

/// Records notifications in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(Email, Notification)>>,
    failing: AtomicBool,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<(Email, Notification)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages sent to `to`, oldest first.
    #[must_use]
    pub fn sent_to(&self, to: &Email) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|(address, _)| address == to)
            .map(|(_, message)| message)
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, to: &Email, message: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("notifier marked failing".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.clone(), message.clone()));
        Ok(())
    }
}

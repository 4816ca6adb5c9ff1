// Outbound email notifications for verification and password reset links

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::deadline::DeadlineExceeded;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),

    #[error("{0}")]
    Timeout(#[from] DeadlineExceeded),
}

/// Email ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// The actionable link embedded in `html`
    pub link: String,
}

impl Notification {
    pub fn verification(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify Your Account".to_string(),
            html: render(
                "Welcome to LoanTracker",
                "Thank you for registering an account with us. To complete your registration, please verify your account using the link below:",
                "Verify Your Account",
                link,
            ),
            link: link.to_string(),
        }
    }

    pub fn password_reset(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset Your Password".to_string(),
            html: render(
                "Password Reset",
                "A password reset was requested for your account. The link below is valid for 10 minutes:",
                "Reset Your Password",
                link,
            ),
            link: link.to_string(),
        }
    }
}

fn render(heading: &str, intro: &str, action: &str, link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; padding: 20px;">
  <h1 style="text-align: center;">{heading}</h1>
  <p>{intro}</p>
  <p style="text-align: center;"><a href="{link}">{action}</a></p>
  <p>If the link above doesn't work, copy this URL into your browser:</p>
  <p>{link}</p>
</body>
</html>"#
    )
}

/// Delivery capability for outbound email
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Posts notifications as JSON to an HTTP mail relay
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }

        tracing::debug!("Delivered '{}' to mail relay for {}", notification.subject, notification.to);
        Ok(())
    }
}

/// Development sender: writes the link to the log instead of sending mail
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            "Email '{}' for {} (no mail relay configured): {}",
            notification.subject,
            notification.to,
            notification.link
        );
        Ok(())
    }
}

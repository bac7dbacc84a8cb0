/// Outgoing email delivery
///
/// A [`Notification`] is rendered into an [`EmailMessage`] and handed to a
/// [`Mailer`]. [`HttpMailer`] posts it to a transactional mail API:
///
/// ```text
/// POST {MAIL_API_URL}/email/messages
/// Authorization: Bearer {MAIL_API_TOKEN}
///
/// { "from_email": "...", "to": "...", "subject": "...", "text": "..." }
/// ```

use crate::config::MailConfig;
use async_trait::async_trait;
use authd_shared::notify::Notification;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl EmailMessage {
    pub fn render(notification: &Notification) -> Self {
        match notification {
            Notification::ConfirmationEmail {
                to_email,
                subject,
                code,
            } => EmailMessage {
                to: to_email.clone(),
                subject: subject.clone(),
                text: format!(
                    "Your confirmation code is {}\n\n\
                     Enter it in the app to confirm your email address. \
                     If you did not create an account, ignore this message.",
                    code
                ),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers rendered emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from_email: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mail API client
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/email/messages", self.config.api_url)
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_token)
            .json(&SendRequest {
                from_email: &self.config.from_email,
                to: &message.to,
                subject: &message.subject,
                text: &message.text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "Mail API accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_confirmation_email() {
        let message = EmailMessage::render(&Notification::ConfirmationEmail {
            to_email: "a@x.com".to_string(),
            subject: "Confirm your email".to_string(),
            code: "ABC123".to_string(),
        });

        assert_eq!(message.to, "a@x.com");
        assert_eq!(message.subject, "Confirm your email");
        assert!(message.text.contains("ABC123"));
    }

    #[test]
    fn test_endpoint_and_payload() {
        let mailer = HttpMailer::new(MailConfig {
            api_url: "https://mail.example.com".to_string(),
            api_token: "tok".to_string(),
            from_email: "noreply@example.com".to_string(),
        })
        .unwrap();
        assert_eq!(mailer.endpoint(), "https://mail.example.com/email/messages");

        let body = serde_json::to_value(SendRequest {
            from_email: "noreply@example.com",
            to: "a@x.com",
            subject: "s",
            text: "t",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "from_email": "noreply@example.com",
                "to": "a@x.com",
                "subject": "s",
                "text": "t",
            })
        );
    }
}

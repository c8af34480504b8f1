use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config;
use crate::error::ApiError;

/// Thin SMTP mail collaborator with a single send operation.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    pub fn from_config() -> Result<Self, ApiError> {
        let mail = &config::config().mail;

        let transport = if mail.smtp_username.is_empty() {
            // No auth (local Mailpit/Mailhog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&mail.smtp_host)
                .port(mail.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(mail.smtp_username.clone(), mail.smtp_password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&mail.smtp_host)
                .map_err(|e| ApiError::internal(format!("SMTP relay setup failed: {}", e)))?
                .credentials(creds)
                .port(mail.smtp_port)
                .build()
        };

        Ok(Self {
            transport,
            from_address: mail.from_address.clone(),
        })
    }

    /// Send a plain-text message. Failures surface as internal errors so the
    /// caller can roll back any token state issued in the same request.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ApiError> {
        let message = Message::builder()
            .from(self
                .from_address
                .parse()
                .map_err(|e| ApiError::internal(format!("invalid from address: {}", e)))?)
            .to(to
                .parse()
                .map_err(|e| ApiError::internal(format!("invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ApiError::internal(format!("failed to build message: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!("SMTP send failed: {}", e);
            ApiError::internal("We are unable to send email at this time! Try again later.")
        })?;

        Ok(())
    }
}

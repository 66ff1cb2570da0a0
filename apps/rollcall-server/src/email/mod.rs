//! Email delivery for the verification flow.
//!
//! A transport is one way of getting a message out (SendGrid REST, SMTP);
//! the dispatcher owns the configured transport, renders the verification
//! templates and normalizes every failure into a typed [`SendError`].

mod code;
mod sendgrid;
mod smtp;
mod templates;

pub use code::generate_verification_code;
pub use sendgrid::SendGridTransport;
pub use smtp::SmtpTransport;
pub use templates::VerificationEmailContent;

use crate::config::{EmailConfig, EmailProviderConfig};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Email sending error. Expected failure modes come back as values, never
/// as panics.
#[derive(Debug, Error)]
pub enum SendError {
    /// The provider answered with a non-2xx status or a permanent SMTP
    /// rejection; the response body is preserved for diagnostics.
    #[error("transport rejected the message (status {status}): {body}")]
    TransportRejected { status: u16, body: String },

    /// The request could not be completed (connect, TLS, timeout).
    #[error("network failure: {0}")]
    Network(String),

    #[error("invalid email configuration: {0}")]
    InvalidConfig(String),
}

/// Fixed sender identity (from-address, display name). Configuration,
/// never caller-supplied.
#[derive(Clone, Debug)]
pub struct SenderIdentity {
    pub address: String,
    pub name: Option<String>,
}

impl SenderIdentity {
    /// RFC 5322 mailbox form: `Name <addr>` or bare `addr`.
    pub fn mailbox(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.address),
            None => self.address.clone(),
        }
    }
}

/// Trait for outbound email transports.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Send one message with plain-text and HTML alternatives.
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str)
        -> Result<(), SendError>;
}

/// Create a transport from configuration.
pub fn create_transport(config: &EmailConfig) -> Result<Box<dyn EmailTransport>, SendError> {
    let sender = SenderIdentity {
        address: config.from_address.clone(),
        name: config.from_name.clone(),
    };
    match &config.provider {
        EmailProviderConfig::SendGrid { api_key } => {
            Ok(Box::new(SendGridTransport::new(api_key.clone(), sender)?))
        }
        EmailProviderConfig::Smtp {
            host,
            port,
            username,
            password,
            use_tls,
        } => {
            let transport = SmtpTransport::new(
                host.clone(),
                *port,
                username.clone(),
                password.clone(),
                *use_tls,
                sender,
            )?;
            Ok(Box::new(transport))
        }
    }
}

/// Renders verification emails and hands them to the configured transport.
pub struct EmailDispatcher {
    transport: RwLock<Box<dyn EmailTransport>>,
}

impl EmailDispatcher {
    pub fn from_config(config: &EmailConfig) -> Result<Self, SendError> {
        Ok(Self {
            transport: RwLock::new(create_transport(config)?),
        })
    }

    /// Seam for tests and custom transports.
    pub fn with_transport(transport: Box<dyn EmailTransport>) -> Self {
        Self {
            transport: RwLock::new(transport),
        }
    }

    /// Swap in a transport built from fresh configuration (rotated API key,
    /// new relay). In-flight sends finish on the transport they started with.
    pub async fn reload(&self, config: &EmailConfig) -> Result<(), SendError> {
        let fresh = create_transport(config)?;
        *self.transport.write().await = fresh;
        Ok(())
    }

    /// Send a verification code to `to`.
    pub async fn send_code(&self, to: &str, code: &str) -> Result<(), SendError> {
        let content = VerificationEmailContent::new(code);
        let transport = self.transport.read().await;
        transport
            .send(to, &content.subject, &content.text, &content.html)
            .await
    }
}

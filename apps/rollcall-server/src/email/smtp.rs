//! SMTP email transport.

use super::{EmailTransport, SendError, SenderIdentity};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;

/// No send may hang past this; exceeding it surfaces as a network failure.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// SMTP relay transport.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: SenderIdentity,
}

impl SmtpTransport {
    /// Create a new SMTP transport.
    pub fn new(
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
        sender: SenderIdentity,
    ) -> Result<Self, SendError> {
        let mut builder = if use_tls {
            let tls_params = TlsParameters::new(host.clone())
                .map_err(|e| SendError::InvalidConfig(format!("TLS configuration error: {}", e)))?;

            // Port 465 uses implicit TLS (SMTPS), other ports use STARTTLS
            if port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
                    .map_err(|e| SendError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Wrapper(tls_params))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                    .map_err(|e| SendError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Required(tls_params))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host).port(port)
        };

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        let transport = builder.timeout(Some(SEND_TIMEOUT)).build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), SendError> {
        let message = Message::builder()
            .from(
                self.sender
                    .mailbox()
                    .parse()
                    .map_err(|e| SendError::InvalidConfig(format!("Invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| SendError::InvalidConfig(format!("Invalid to address: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .map_err(|e| SendError::InvalidConfig(format!("Failed to build email: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                SendError::TransportRejected {
                    status: e
                        .status()
                        .map(|c| c.to_string().parse().unwrap_or(0))
                        .unwrap_or(0),
                    body: e.to_string(),
                }
            } else {
                SendError::Network(e.to_string())
            }
        })?;

        Ok(())
    }
}

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::export::xlsx::REPORT_FILE_NAME;
use crate::logging::LogSink;

pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to read attachment: {0}")]
    Attachment(String),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

#[derive(Clone)]
pub struct SmtpServer {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, server: &SmtpServer, message: Message) -> Result<(), NotifyError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailer;

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, server: &SmtpServer, message: Message) -> Result<(), NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&server.host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(server.port)
            .credentials(SmtpCredentials::new(
                server.username.clone(),
                server.password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ReportEmail<'a> {
    pub recipient: &'a str,
    pub sender: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub attachment_path: &'a Path,
}

pub fn report_subject(date: &str) -> String {
    format!("Exchange rates on {}", date)
}

/// Compose the message: plain-text body plus the spreadsheet attachment.
///
/// The attachment is always named `exchange_rates.xlsx`, whatever the file on
/// disk is called.
pub async fn compose(email: &ReportEmail<'_>) -> Result<Message, NotifyError> {
    let content = tokio::fs::read(email.attachment_path).await.map_err(|e| {
        NotifyError::Attachment(format!("{}: {}", email.attachment_path.display(), e))
    })?;

    let from: Mailbox = email
        .sender
        .parse()
        .map_err(|e| NotifyError::Address(format!("{}: {}", email.sender, e)))?;
    let to: Mailbox = email
        .recipient
        .parse()
        .map_err(|e| NotifyError::Address(format!("{}: {}", email.recipient, e)))?;
    let content_type =
        ContentType::parse(XLSX_MIME_TYPE).map_err(|e| NotifyError::Build(e.to_string()))?;
    let content = Body::new_with_encoding(content, ContentTransferEncoding::Base64)
        .map_err(|_| NotifyError::Build("attachment cannot be base64 encoded".into()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(email.body.to_string()))
                .singlepart(Attachment::new(REPORT_FILE_NAME.to_string()).body(content, content_type)),
        )
        .map_err(|e| NotifyError::Build(e.to_string()))
}

/// Compose and send the report. Failures are logged and returned, never raised further.
pub async fn send_report(
    mailer: &dyn Mailer,
    log: &dyn LogSink,
    server: &SmtpServer,
    email: &ReportEmail<'_>,
) -> Result<(), NotifyError> {
    let result = match compose(email).await {
        Ok(message) => mailer.send(server, message).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(()) => log.info(&format!("E-mail to {} successfully sent.", email.recipient)),
        Err(e) => log.error(&format!(
            "Sending e-mail to {} failed with exception: {}",
            email.recipient, e
        )),
    }

    result
}

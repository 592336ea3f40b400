use std::fs;
use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::EmailConfig;
use crate::errors::CovError;
use crate::logging::Logger;

/// Send the notification over an encrypted submission channel. A missing
/// attachment is logged and skipped; everything else propagates.
pub fn send_notification(
    email: &EmailConfig,
    subject: &str,
    body: &str,
    attachment: Option<&Path>,
    logger: &Logger,
) -> Result<(), CovError> {
    let message = build_message(email, subject, body, attachment, logger)?;

    let mailer = SmtpTransport::starttls_relay(&email.smtp_server)?
        .port(email.smtp_port)
        .credentials(Credentials::new(
            email.username.clone(),
            email.password.clone(),
        ))
        .build();
    mailer.send(&message)?;

    logger.info(&format!(
        "Email sent successfully to {}",
        email.recipients.join(", ")
    ));
    Ok(())
}

fn build_message(
    email: &EmailConfig,
    subject: &str,
    body: &str,
    attachment: Option<&Path>,
    logger: &Logger,
) -> Result<Message, CovError> {
    if email.recipients.is_empty() {
        return Err(CovError::Validation(
            "No notification recipients configured".to_string(),
        ));
    }

    let mut builder = Message::builder()
        .from(email.username.parse::<Mailbox>()?)
        .subject(subject);
    for recipient in &email.recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    match attachment {
        Some(path) if path.exists() => {
            let bytes = fs::read(path)?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report.pdf".to_string());
            logger.info(&format!("Attached {} to email", path.display()));
            let part =
                Attachment::new(file_name).body(bytes, ContentType::parse("application/pdf")?);
            Ok(builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(part),
            )?)
        }
        Some(path) => {
            logger.warn(&format!(
                "Attachment {} does not exist, sending without it",
                path.display()
            ));
            Ok(builder.body(body.to_string())?)
        }
        None => Ok(builder.body(body.to_string())?),
    }
}

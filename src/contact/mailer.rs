//! Outbound Mail
//!
//! The contact endpoint hands a composed [`OutgoingEmail`] to a [`Mailer`].
//! [`SmtpMailer`] delivers it through an authenticated SMTP relay; tests use
//! an in-process recorder instead.

use crate::config::MailConfig;
use crate::error::ServiceError;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::sync::Arc;

/// A fully composed message, independent of transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers mail to the site owner's mailbox
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError>;
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the notification sent for one contact form submission
pub fn compose_contact_email(name: &str, email: &str, message: &str) -> OutgoingEmail {
    let text = format!("Name: {name}\nEmail: {email}\n\nMessage:\n{message}\n");

    let html = format!(
        "<h3>New Contact Form Submission</h3>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>\n",
        escape_html(name),
        escape_html(email),
        escape_html(message).replace("\r\n", "\n").replace('\n', "<br>"),
    );

    OutgoingEmail {
        subject: format!("Portfolio Contact: {name}"),
        text,
        html,
    }
}

/// Wrap an email as a text/HTML alternative sent from and to `mailbox`
fn build_message(mailbox: &Mailbox, email: OutgoingEmail) -> Result<Message, ServiceError> {
    Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .subject(email.subject)
        .multipart(MultiPart::alternative_plain_html(email.text, email.html))
        .map_err(|e| ServiceError::Mail(e.to_string()))
}

/// SMTP relay mailer; the mailbox is both sender and recipient
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<SmtpTransport>,
    mailbox: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, ServiceError> {
        let mailbox: Mailbox = config
            .username
            .parse()
            .map_err(|e| ServiceError::Mail(format!("invalid EMAIL_USER: {e}")))?;

        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| ServiceError::Mail(format!("invalid SMTP relay: {e}")))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport: Arc::new(transport),
            mailbox,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError> {
        let message = build_message(&self.mailbox, email)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport blocks on network I/O
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| ServiceError::Mail(format!("mail task failed: {e}")))?
            .map_err(|e| ServiceError::Mail(e.to_string()))?;

        Ok(())
    }
}

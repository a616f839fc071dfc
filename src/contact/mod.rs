//! Contact form: forwards visitor messages to the site owner by email.

pub mod handlers;
pub mod mailer;

pub use handlers::{create_routes, ContactRequest, ContactState};
pub use mailer::{compose_contact_email, Mailer, OutgoingEmail, SmtpMailer};

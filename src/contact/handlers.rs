//! Contact Handlers

use crate::auth::{MessageResponse, ValidatedJson};
use crate::contact::mailer::{compose_contact_email, Mailer};
use crate::error::ServiceError;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Shared mailer state
pub type ContactState = Arc<dyn Mailer>;

/// Contact form submission
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    #[validate(length(min = 2, message = "name must be longer than or equal to 2 characters"))]
    pub name: String,

    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[validate(length(min = 10, message = "message must be longer than or equal to 10 characters"))]
    pub message: String,
}

pub fn create_routes(mailer: ContactState) -> Router {
    Router::new()
        .route("/contact", post(send_contact))
        .with_state(mailer)
}

/// POST /contact - Forward a message to the site owner
pub async fn send_contact(
    State(mailer): State<ContactState>,
    ValidatedJson(req): ValidatedJson<ContactRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = compose_contact_email(&req.name, &req.email, &req.message);
    mailer.send(email).await?;

    tracing::info!("Contact message delivered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Email sent successfully")),
    ))
}

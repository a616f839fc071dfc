//! Project Handlers

use crate::auth::{middleware, AuthState, AuthUser, ValidatedJson};
use crate::error::ServiceError;
use crate::projects::models::*;
use crate::projects::store::ProjectStore;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared project store state
pub type ProjectState = Arc<dyn ProjectStore>;

/// Create project routes; writes require an admin
pub fn create_routes(store: ProjectState, sessions: AuthState) -> Router {
    let public = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:id", get(get_project));

    let admin = Router::new()
        .route("/projects", post(create_project))
        .route(
            "/projects/:id",
            axum::routing::patch(update_project).delete(delete_project),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            sessions,
            middleware::require_admin,
        ));

    Router::new().merge(public).merge(admin).with_state(store)
}

/// Ids that are not UUIDs cannot name a project
fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| not_found(raw))
}

fn not_found(id: impl std::fmt::Display) -> ServiceError {
    ServiceError::NotFound(format!("Project with ID {id} not found"))
}

/// GET /projects - List projects
pub async fn list_projects(
    State(store): State<ProjectState>,
    Query(query): Query<ProjectQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let projects = store.list(&query).await?;
    Ok(Json(projects))
}

/// GET /projects/:id - Get a project
pub async fn get_project(
    State(store): State<ProjectState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = store
        .find(parse_id(&id)?)
        .await?
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(project))
}

/// POST /projects - Create a project
pub async fn create_project(
    State(store): State<ProjectState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = store.create(req).await?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /projects/:id - Update a project
pub async fn update_project(
    State(store): State<ProjectState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = store
        .update(parse_id(&id)?, req)
        .await?
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(project))
}

/// DELETE /projects/:id - Delete a project
pub async fn delete_project(
    State(store): State<ProjectState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = store
        .delete(parse_id(&id)?)
        .await?
        .ok_or_else(|| not_found(&id))?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project deleted");

    Ok(Json(project))
}

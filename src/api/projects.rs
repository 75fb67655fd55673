//! Project API endpoints
//!
//! Projects are the top-level resource: keywords, rank tracking,
//! competitors and backlinks all nest under a project.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateProjectInput, Project, UpdateProjectInput};

/// Build the projects router with nested resources
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/{project_id}/analyze-keywords",
            axum::routing::post(super::ai::analyze_keywords),
        )
        .nest("/{project_id}/keywords", super::keywords::router())
        .nest("/{project_id}/tracking", super::rank_tracking::project_router())
        .nest("/{project_id}/competitors", super::competitors::router())
        .nest("/{project_id}/backlinks", super::backlinks::router())
}

/// POST /api/v1/projects
async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.project_service.create(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/projects
async fn list_projects(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = state.project_service.list(user.0.id).await?;
    Ok(Json(projects))
}

/// GET /api/v1/projects/{project_id}
async fn get_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let project = state.project_service.get(user.0.id, project_id).await?;
    Ok(Json(project))
}

/// PUT /api/v1/projects/{project_id}
async fn update_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .project_service
        .update(user.0.id, project_id, body)
        .await?;
    Ok(Json(project))
}

/// DELETE /api/v1/projects/{project_id}
async fn delete_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.project_service.delete(user.0.id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

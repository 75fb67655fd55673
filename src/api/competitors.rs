//! Competitor API endpoints, nested under a project

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Competitor;
use crate::services::KeywordOverlap;

/// Request body for adding a competitor
#[derive(Debug, Deserialize)]
pub struct AddCompetitorRequest {
    pub domain: String,
    pub name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_competitors).post(add_competitor))
        .route("/overlap", get(keyword_overlap))
        .route("/{competitor_id}", axum::routing::delete(remove_competitor))
}

/// POST /api/v1/projects/{project_id}/competitors
async fn add_competitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AddCompetitorRequest>,
) -> Result<(StatusCode, Json<Competitor>), ApiError> {
    let competitor = state
        .competitor_service
        .add(user.0.id, project_id, &body.domain, body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(competitor)))
}

/// GET /api/v1/projects/{project_id}/competitors
async fn list_competitors(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Competitor>>, ApiError> {
    let competitors = state.competitor_service.list(user.0.id, project_id).await?;
    Ok(Json(competitors))
}

/// DELETE /api/v1/projects/{project_id}/competitors/{competitor_id}
async fn remove_competitor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, competitor_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .competitor_service
        .remove(user.0.id, project_id, competitor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/{project_id}/competitors/overlap
///
/// Reports where each competitor lands in the stored SERP snapshots for
/// the project's keywords.
async fn keyword_overlap(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<KeywordOverlap>>, ApiError> {
    let overlap = state
        .competitor_service
        .keyword_overlap(user.0.id, project_id)
        .await?;
    Ok(Json(overlap))
}

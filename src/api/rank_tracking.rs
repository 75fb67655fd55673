//! Rank tracking API endpoints
//!
//! Per-keyword tracking lifecycle plus project-level tracked lists and
//! the position-distribution overview.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{RankCheck, RankHistoryPoint, SerpEntry};
use crate::services::{EnableTrackingInput, ProjectOverview, TrackedKeyword};

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

/// Routes nested under a keyword
pub fn keyword_router() -> Router<AppState> {
    Router::new()
        .route("/", post(enable_tracking).delete(stop_tracking))
        .route("/check", post(check_now))
        .route("/history", get(history))
        .route("/serp", get(latest_serp))
}

/// Routes nested under a project
pub fn project_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tracked))
        .route("/overview", get(overview))
}

/// POST /api/v1/projects/{project_id}/keywords/{keyword_id}/tracking
///
/// Enables tracking and runs an immediate live check so the keyword has
/// a position from day one.
async fn enable_tracking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<EnableTrackingInput>,
) -> Result<(StatusCode, Json<RankCheck>), ApiError> {
    let client = state.credential_service.dataforseo_client(user.0.id).await?;
    let check = state
        .rank_service
        .enable_tracking(user.0.id, project_id, keyword_id, body, &client)
        .await?;
    Ok((StatusCode::CREATED, Json(check)))
}

/// DELETE /api/v1/projects/{project_id}/keywords/{keyword_id}/tracking
async fn stop_tracking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .rank_service
        .stop_tracking(user.0.id, project_id, keyword_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/{project_id}/keywords/{keyword_id}/tracking/check
async fn check_now(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RankCheck>, ApiError> {
    let client = state.credential_service.dataforseo_client(user.0.id).await?;
    let check = state
        .rank_service
        .check_now(user.0.id, project_id, keyword_id, &client)
        .await?;
    Ok(Json(check))
}

/// GET /api/v1/projects/{project_id}/keywords/{keyword_id}/tracking/history?days=30
async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RankHistoryPoint>>, ApiError> {
    let points = state
        .rank_service
        .history(user.0.id, project_id, keyword_id, query.days)
        .await?;
    Ok(Json(points))
}

/// GET /api/v1/projects/{project_id}/keywords/{keyword_id}/tracking/serp
async fn latest_serp(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<SerpEntry>>, ApiError> {
    let entries = state
        .rank_service
        .latest_serp(user.0.id, project_id, keyword_id)
        .await?;
    Ok(Json(entries))
}

/// GET /api/v1/projects/{project_id}/tracking
async fn list_tracked(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TrackedKeyword>>, ApiError> {
    let tracked = state.rank_service.list_tracked(user.0.id, project_id).await?;
    Ok(Json(tracked))
}

/// GET /api/v1/projects/{project_id}/tracking/overview
async fn overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectOverview>, ApiError> {
    let overview = state.rank_service.overview(user.0.id, project_id).await?;
    Ok(Json(overview))
}

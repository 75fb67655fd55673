//! Keyword API endpoints, nested under a project
//!
//! Covers keyword CRUD, bulk import, and metric refreshes through
//! DataForSEO.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Keyword;
use crate::services::{BulkAddResult, RefreshEstimate};

/// Request body for adding a single keyword
#[derive(Debug, Deserialize)]
pub struct AddKeywordRequest {
    pub keyword: String,
}

/// Request body for bulk import
#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub keywords: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_keywords).post(add_keyword))
        .route("/bulk", post(bulk_add_keywords))
        .route("/refresh", post(refresh_project))
        .route("/refresh/estimate", get(estimate_refresh))
        .route("/{keyword_id}", get(get_keyword).delete(delete_keyword))
        .route("/{keyword_id}/refresh", post(refresh_keyword))
        .nest("/{keyword_id}/tracking", super::rank_tracking::keyword_router())
        .route(
            "/{keyword_id}/analyze-serp",
            post(super::ai::analyze_serp),
        )
}

/// POST /api/v1/projects/{project_id}/keywords
async fn add_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AddKeywordRequest>,
) -> Result<(StatusCode, Json<Keyword>), ApiError> {
    let keyword = state
        .keyword_service
        .add(user.0.id, project_id, &body.keyword)
        .await?;
    Ok((StatusCode::CREATED, Json(keyword)))
}

/// POST /api/v1/projects/{project_id}/keywords/bulk
async fn bulk_add_keywords(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<BulkAddRequest>,
) -> Result<(StatusCode, Json<BulkAddResult>), ApiError> {
    let result = state
        .keyword_service
        .bulk_add(user.0.id, project_id, body.keywords)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/v1/projects/{project_id}/keywords
async fn list_keywords(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Keyword>>, ApiError> {
    let keywords = state.keyword_service.list(user.0.id, project_id).await?;
    Ok(Json(keywords))
}

/// GET /api/v1/projects/{project_id}/keywords/{keyword_id}
async fn get_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Keyword>, ApiError> {
    let keyword = state
        .keyword_service
        .get(user.0.id, project_id, keyword_id)
        .await?;
    Ok(Json(keyword))
}

/// DELETE /api/v1/projects/{project_id}/keywords/{keyword_id}
async fn delete_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .keyword_service
        .delete(user.0.id, project_id, keyword_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/{project_id}/keywords/{keyword_id}/refresh
async fn refresh_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((project_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Keyword>, ApiError> {
    let client = state.credential_service.dataforseo_client(user.0.id).await?;
    let keyword = state
        .keyword_service
        .refresh_one(user.0.id, project_id, keyword_id, &client)
        .await?;
    Ok(Json(keyword))
}

/// POST /api/v1/projects/{project_id}/keywords/refresh
///
/// Refreshes metrics for every keyword in the project.
async fn refresh_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let client = state.credential_service.dataforseo_client(user.0.id).await?;
    let refreshed = state
        .keyword_service
        .refresh_project(user.0.id, project_id, &client)
        .await?;
    Ok(Json(serde_json::json!({ "refreshed": refreshed })))
}

/// GET /api/v1/projects/{project_id}/keywords/refresh/estimate
async fn estimate_refresh(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<RefreshEstimate>, ApiError> {
    let estimate = state
        .keyword_service
        .estimate_refresh(user.0.id, project_id)
        .await?;
    Ok(Json(estimate))
}

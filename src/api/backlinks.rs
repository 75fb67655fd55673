//! Backlink API endpoints, nested under a project
//!
//! Thin pass-through over the DataForSEO backlinks API using the
//! project's domain as the target. Nothing is persisted; these calls
//! are usage-logged but always live.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Provider;

const SUMMARY_ENDPOINT: &str = "backlinks/summary/live";
const BACKLINKS_ENDPOINT: &str = "backlinks/backlinks/live";
const REFERRING_DOMAINS_ENDPOINT: &str = "backlinks/referring_domains/live";

/// Cost per backlinks API call
const BACKLINK_CALL_COST: f64 = 0.02;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/links", get(backlinks))
        .route("/referring-domains", get(referring_domains))
}

/// GET /api/v1/projects/{project_id}/backlinks/summary
async fn summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project = state.project_service.get(user.0.id, project_id).await?;
    let client = state.credential_service.dataforseo_client(user.0.id).await?;

    let result = client.backlinks_summary(&project.domain).await?;
    state
        .usage_service
        .log(
            user.0.id,
            Provider::Dataforseo,
            SUMMARY_ENDPOINT,
            BACKLINK_CALL_COST,
            Some(200),
        )
        .await;

    Ok(Json(result))
}

/// GET /api/v1/projects/{project_id}/backlinks/links?limit=20&offset=0
async fn backlinks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project = state.project_service.get(user.0.id, project_id).await?;
    let client = state.credential_service.dataforseo_client(user.0.id).await?;

    let result = client
        .backlinks_list(&project.domain, page.limit(), page.offset())
        .await?;
    state
        .usage_service
        .log(
            user.0.id,
            Provider::Dataforseo,
            BACKLINKS_ENDPOINT,
            BACKLINK_CALL_COST,
            Some(200),
        )
        .await;

    Ok(Json(result))
}

/// GET /api/v1/projects/{project_id}/backlinks/referring-domains?limit=20&offset=0
async fn referring_domains(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project = state.project_service.get(user.0.id, project_id).await?;
    let client = state.credential_service.dataforseo_client(user.0.id).await?;

    let result = client
        .referring_domains(&project.domain, page.limit(), page.offset())
        .await?;
    state
        .usage_service
        .log(
            user.0.id,
            Provider::Dataforseo,
            REFERRING_DOMAINS_ENDPOINT,
            BACKLINK_CALL_COST,
            Some(200),
        )
        .await;

    Ok(Json(result))
}

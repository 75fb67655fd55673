//! API usage reporting endpoints

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::UsageSummary;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(summary))
}

/// GET /api/v1/usage
///
/// Total estimated spend and recent provider calls for the current user.
async fn summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UsageSummary>, ApiError> {
    let summary = state
        .usage_service
        .summary(user.0.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to aggregate usage: {:#}", e);
            ApiError::internal_error("An internal error occurred")
        })?;
    Ok(Json(summary))
}

//! Provider credential API endpoints
//!
//! Credentials are verified against the provider before they are stored
//! and never returned to the client after that.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CredentialPayload, Provider};
use crate::services::CredentialStatus;

/// Request body for saving credentials
#[derive(Debug, Deserialize)]
pub struct SaveCredentialsRequest {
    #[serde(flatten)]
    pub payload: CredentialPayload,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{provider}",
        get(check_credentials)
            .put(save_credentials)
            .delete(delete_credentials),
    )
}

/// PUT /api/v1/credentials/{provider}
///
/// Verifies the credentials with the provider before storing them, so a
/// 2xx here means they actually work.
async fn save_credentials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(provider): Path<Provider>,
    Json(body): Json<SaveCredentialsRequest>,
) -> Result<Json<CredentialStatus>, ApiError> {
    let status = state
        .credential_service
        .save(user.0.id, provider, body.payload)
        .await?;
    Ok(Json(status))
}

/// GET /api/v1/credentials/{provider}
async fn check_credentials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(provider): Path<Provider>,
) -> Result<Json<CredentialStatus>, ApiError> {
    let status = state.credential_service.check(user.0.id, provider).await?;
    Ok(Json(status))
}

/// DELETE /api/v1/credentials/{provider}
async fn delete_credentials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(provider): Path<Provider>,
) -> Result<StatusCode, ApiError> {
    state.credential_service.delete(user.0.id, provider).await?;
    Ok(StatusCode::NO_CONTENT)
}

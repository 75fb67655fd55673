//! Public site endpoints
//!
//! Health and version info, no authentication required.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::middleware::AppState;

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Response for site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Build the public site router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(get_site_info))
}

/// GET /api/v1/site/health
///
/// Reports "degraded" instead of failing when the database is unreachable
/// so load balancers can still read the body.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.pool.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {:#}", e);
            "degraded"
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// GET /api/v1/site/info
async fn get_site_info() -> Json<SiteInfoResponse> {
    Json(SiteInfoResponse {
        name: "serptrack",
        version: env!("CARGO_PKG_VERSION"),
    })
}

//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - Auth (register, login, logout, me)
//! - Projects and their nested keyword, rank-tracking, competitor and
//!   backlink resources
//! - Provider credentials and usage reporting
//! - AI assistant (chat, conversations, analyses)
//! - Site health and info

pub mod ai;
pub mod auth;
pub mod backlinks;
pub mod common;
pub mod competitors;
pub mod credentials;
pub mod keywords;
pub mod middleware;
pub mod projects;
pub mod rank_tracking;
pub mod site;
pub mod usage;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Everything except registration, login and site info requires a session
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/projects", projects::router())
        .nest("/credentials", credentials::router())
        .nest("/usage", usage::router())
        .nest("/ai", ai::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/site", site::router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router, anyhow::Error> {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

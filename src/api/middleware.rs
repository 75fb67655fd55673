//! API middleware and shared response types
//!
//! Bearer-token authentication against the session store, the application
//! state threaded through every handler, and the error envelope all
//! endpoints share.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    AssistantService, AssistantServiceError, CompetitorService, CompetitorServiceError,
    CredentialService, CredentialServiceError, KeywordService, KeywordServiceError,
    LoginRateLimiter, ProjectService, ProjectServiceError, ProviderError, RankServiceError,
    RankTrackingService, UsageService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub config: Arc<crate::config::Config>,
    pub user_service: Arc<UserService>,
    pub project_service: Arc<ProjectService>,
    pub keyword_service: Arc<KeywordService>,
    pub rank_service: Arc<RankTrackingService>,
    pub competitor_service: Arc<CompetitorService>,
    pub credential_service: Arc<CredentialService>,
    pub usage_service: Arc<UsageService>,
    pub assistant_service: Arc<AssistantService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMIT", message)
    }

    pub fn provider_error(message: impl Into<String>) -> Self {
        Self::new("PROVIDER_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            "PROVIDER_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

// ============================================================================
// Service error conversions
// ============================================================================

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ProjectServiceError> for ApiError {
    fn from(err: ProjectServiceError) -> Self {
        match err {
            ProjectServiceError::NotFound => ApiError::not_found("Project not found"),
            ProjectServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProjectServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<KeywordServiceError> for ApiError {
    fn from(err: KeywordServiceError) -> Self {
        match err {
            KeywordServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            KeywordServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            KeywordServiceError::Duplicate(msg) => {
                ApiError::conflict(format!("Keyword '{}' already exists in this project", msg))
            }
            KeywordServiceError::Provider(e) => e.into(),
            KeywordServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<RankServiceError> for ApiError {
    fn from(err: RankServiceError) -> Self {
        match err {
            RankServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            RankServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            RankServiceError::AlreadyTracking => {
                ApiError::conflict("Tracking is already enabled for this keyword and URL")
            }
            RankServiceError::Provider(e) => e.into(),
            RankServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<CompetitorServiceError> for ApiError {
    fn from(err: CompetitorServiceError) -> Self {
        match err {
            CompetitorServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", what))
            }
            CompetitorServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CompetitorServiceError::Duplicate(domain) => {
                ApiError::conflict(format!("Competitor '{}' is already added", domain))
            }
            CompetitorServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<CredentialServiceError> for ApiError {
    fn from(err: CredentialServiceError) -> Self {
        match err {
            CredentialServiceError::NotConfigured(_) => ApiError::not_found(err.to_string()),
            CredentialServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CredentialServiceError::Provider(e) => e.into(),
            CredentialServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<AssistantServiceError> for ApiError {
    fn from(err: AssistantServiceError) -> Self {
        match err {
            AssistantServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", what))
            }
            AssistantServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AssistantServiceError::Provider(e) => e.into(),
            AssistantServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!("Provider call failed: {}", err);
        ApiError::provider_error(err.to_string())
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", err);
    ApiError::internal_error("An internal error occurred")
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract the bearer session token from a request
fn extract_session_token(request: &Request) -> Option<String> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::to_string)
}

/// Authentication middleware
///
/// Validates the bearer token against the session store and inserts the
/// user into request extensions for handlers to pick up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

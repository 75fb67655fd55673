//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create an account
//! - POST /api/v1/auth/login - Open a session
//! - POST /api/v1/auth/logout - Close the current session
//! - GET /api/v1/auth/me - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::CreateUserInput;
use crate::services::UserServiceError;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// User info safe to return to clients
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            created_at: user.created_at,
        }
    }
}

/// Routes that do not require a session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes behind the auth middleware
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let input = CreateUserInput {
        email: body.email,
        password: body.password,
        full_name: body.full_name,
    };

    let user = state.user_service.register(input).await?;

    // Open a session right away so the client does not have to log in
    // again after registering.
    let (user, session) = state.user_service.login(&user.email, &password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // Per-IP limit guards against credential stuffing from one source
    if let Some(ip) = extract_ip_address(&headers).and_then(|s| s.parse().ok()) {
        if state.rate_limiter.is_ip_limited(ip).await {
            return Err(ApiError::with_details(
                "RATE_LIMIT",
                "Too many requests, try again later",
                serde_json::json!({"retry_after": 60}),
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    // Per-email limit guards against targeted guessing
    if state.rate_limiter.is_email_limited(&body.email).await {
        return Err(ApiError::with_details(
            "RATE_LIMIT",
            "Too many failed login attempts, try again in 15 minutes",
            serde_json::json!({"retry_after": 900}),
        ));
    }

    let (user, session) = match state.user_service.login(&body.email, &body.password).await {
        Ok(ok) => ok,
        Err(e) => {
            // Only bad credentials count toward the lockout; an internal
            // failure is not the caller's fault.
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failed_attempt(&body.email).await;
            }
            return Err(e.into());
        }
    };

    state.rate_limiter.clear_email_attempts(&body.email).await;

    Ok(Json(AuthResponse {
        user: user.into(),
        token: session.id,
        expires_at: session.expires_at,
    }))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// Extract the client IP from proxy headers
///
/// Checks X-Forwarded-For first, then X-Real-IP.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 192.168.1.1".parse().unwrap());
        assert_eq!(extract_ip_address(&headers), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_ip_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(extract_ip_address(&headers), Some("10.0.0.2".to_string()));
    }

    #[test]
    fn test_extract_ip_none() {
        assert_eq!(extract_ip_address(&HeaderMap::new()), None);
    }
}

//! User service
//!
//! Implements business logic for account management:
//! - Registration with email and password validation
//! - Login/logout with bearer session tokens
//! - Session validation and expiration cleanup

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::{Context, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// Minimum password length accepted at registration
const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }

    /// Create a new user service with a custom session lifetime
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_days,
        }
    }

    /// Register a new user
    ///
    /// Emails are normalized to lowercase before the uniqueness check.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the email is malformed or the password is too short
    /// - `UserExists` if the email is already registered
    /// - `InternalError` for database errors
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let email = input.email.trim().to_lowercase();
        validate_email(&email)?;

        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(email, password_hash, input.full_name);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Login with email and password
    ///
    /// Returns a new session on success. The error message does not reveal
    /// whether the email or the password was wrong.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = email.trim().to_lowercase();

        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid email or password".to_string())
            })?;

        let password_valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(
                "This account has been deactivated".to_string(),
            ));
        }

        let session = Session::new(user.id, self.session_ttl_days);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((user, session))
    }

    /// Logout (invalidate a session token)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Validate a session token and return the associated user
    ///
    /// Returns `None` if the session does not exist or is expired.
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| u.is_active))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Delete all expired sessions
    ///
    /// Maintenance operation, called periodically by the background worker.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

/// Basic email shape check: one '@' with non-empty local part and a dotted domain
fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::new(user_repo, session_repo);

        (pool, service)
    }

    fn input(email: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            password: password.to_string(),
            full_name: None,
        }
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[tokio::test]
    async fn test_register_success() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(input("alice@example.com", "password123"))
            .await
            .expect("Failed to register");

        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(input("  Alice@Example.COM ", "password123"))
            .await
            .expect("Failed to register");

        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("same@example.com", "password123"))
            .await
            .expect("Failed to register first user");

        let result = service
            .register(input("Same@example.com", "password456"))
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_invalid_email_fails() {
        let (_pool, service) = setup_test_service().await;

        for email in ["", "no-at-sign", "@nodomain.com", "nolocal@", "a@nodot"] {
            let result = service.register(input(email, "password123")).await;
            assert!(
                matches!(result, Err(UserServiceError::ValidationError(_))),
                "Email '{}' should be rejected",
                email
            );
        }
    }

    #[tokio::test]
    async fn test_register_short_password_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.register(input("bob@example.com", "short")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let (_pool, service) = setup_test_service().await;

        let password = "my_secret_password";
        let user = service
            .register(input("carol@example.com", password))
            .await
            .expect("Failed to register");

        assert_ne!(user.password_hash, password);
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    // ========================================================================
    // Login tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_success() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("dave@example.com", "password123"))
            .await
            .expect("Failed to register");

        let (user, session) = service
            .login("dave@example.com", "password123")
            .await
            .expect("Failed to login");

        assert_eq!(user.email, "dave@example.com");
        assert!(!session.id.is_empty());
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_login_case_insensitive_email() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("eve@example.com", "password123"))
            .await
            .expect("Failed to register");

        let result = service.login("Eve@Example.com", "password123").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("frank@example.com", "password123"))
            .await
            .expect("Failed to register");

        let result = service.login("frank@example.com", "wrongpassword").await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_login_nonexistent_user_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.login("nobody@example.com", "password123").await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    // ========================================================================
    // Session validation tests
    // ========================================================================

    #[tokio::test]
    async fn test_validate_session_success() {
        let (_pool, service) = setup_test_service().await;

        let registered = service
            .register(input("grace@example.com", "password123"))
            .await
            .expect("Failed to register");

        let (_, session) = service
            .login("grace@example.com", "password123")
            .await
            .expect("Failed to login");

        let user = service
            .validate_session(&session.id)
            .await
            .expect("Failed to validate session")
            .expect("User not found");

        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn test_validate_session_nonexistent_returns_none() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .validate_session("nonexistent-session-id")
            .await
            .expect("Failed to validate session");

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_validate_expired_session_returns_none() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());

        // -1 day lifetime: sessions are expired on creation
        let service = UserService::with_session_ttl(user_repo, session_repo, -1);

        service
            .register(input("heidi@example.com", "password123"))
            .await
            .expect("Failed to register");

        let (_, session) = service
            .login("heidi@example.com", "password123")
            .await
            .expect("Failed to login");

        let result = service
            .validate_session(&session.id)
            .await
            .expect("Failed to validate session");

        assert!(result.is_none());
    }

    // ========================================================================
    // Logout tests
    // ========================================================================

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("ivan@example.com", "password123"))
            .await
            .expect("Failed to register");

        let (_, session) = service
            .login("ivan@example.com", "password123")
            .await
            .expect("Failed to login");

        service.logout(&session.id).await.expect("Failed to logout");

        let result = service
            .validate_session(&session.id)
            .await
            .expect("Failed to validate session");

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_logout_nonexistent_session_succeeds() {
        let (_pool, service) = setup_test_service().await;

        let result = service.logout("nonexistent-session-id").await;
        assert!(result.is_ok());
    }

    // ========================================================================
    // Maintenance tests
    // ========================================================================

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::with_session_ttl(user_repo, session_repo, -1);

        service
            .register(input("judy@example.com", "password123"))
            .await
            .expect("Failed to register");

        service
            .login("judy@example.com", "password123")
            .await
            .expect("Failed to login");

        let count = service
            .cleanup_expired_sessions()
            .await
            .expect("Failed to cleanup");

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_multiple_sessions_per_user() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(input("ken@example.com", "password123"))
            .await
            .expect("Failed to register");

        let (_, session1) = service
            .login("ken@example.com", "password123")
            .await
            .expect("Failed to login");
        let (_, session2) = service
            .login("ken@example.com", "password123")
            .await
            .expect("Failed to login");

        assert!(service.validate_session(&session1.id).await.unwrap().is_some());
        assert!(service.validate_session(&session2.id).await.unwrap().is_some());
        assert_ne!(session1.id, session2.id);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

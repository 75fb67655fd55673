//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity representing a registered account.
///
/// Each user owns their projects, provider credentials, and usage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Email address (unique, login identity)
    pub email: String,
    /// Display name
    pub full_name: Option<String>,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the account can log in
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// Note: The password should already be hashed before calling this
    /// function. Use `services::password::hash_password()`.
    pub fn new(email: String, password_hash: String, full_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Display name
    pub full_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "test@example.com".to_string(),
            "hashed_password".to_string(),
            Some("Test User".to_string()),
        );

        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Test User"));
        assert!(user.is_active);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_user_ids_are_unique() {
        let a = User::new("a@example.com".to_string(), "hash".to_string(), None);
        let b = User::new("b@example.com".to_string(), "hash".to_string(), None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@example.com".to_string(), "secret-hash".to_string(), None);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("a@example.com"));
    }
}

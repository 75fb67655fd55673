//! Provider credential repository
//!
//! One row per (user, provider); saving again upserts. Deletions only flip
//! `is_active` so history and usage attribution survive.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ApiCredential, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Credential repository trait
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert or update the credentials for (user, provider)
    async fn upsert(&self, credential: &ApiCredential) -> Result<()>;

    /// Get the active credentials for a user and provider
    async fn get_active(&self, user_id: Uuid, provider: Provider) -> Result<Option<ApiCredential>>;

    /// Mark a user's provider credentials inactive
    async fn deactivate(&self, user_id: Uuid, provider: Provider) -> Result<bool>;
}

/// SQLx-based credential repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCredentialRepository {
    pool: DynDatabasePool,
}

impl SqlxCredentialRepository {
    /// Create a new SQLx credential repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CredentialRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CredentialRepository for SqlxCredentialRepository {
    async fn upsert(&self, credential: &ApiCredential) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_credential_sqlite(self.pool.as_sqlite().unwrap(), credential).await
            }
            DatabaseDriver::Mysql => {
                upsert_credential_mysql(self.pool.as_mysql().unwrap(), credential).await
            }
        }
    }

    async fn get_active(&self, user_id: Uuid, provider: Provider) -> Result<Option<ApiCredential>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_active_sqlite(self.pool.as_sqlite().unwrap(), user_id, provider).await
            }
            DatabaseDriver::Mysql => {
                get_active_mysql(self.pool.as_mysql().unwrap(), user_id, provider).await
            }
        }
    }

    async fn deactivate(&self, user_id: Uuid, provider: Provider) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                deactivate_sqlite(self.pool.as_sqlite().unwrap(), user_id, provider).await
            }
            DatabaseDriver::Mysql => {
                deactivate_mysql(self.pool.as_mysql().unwrap(), user_id, provider).await
            }
        }
    }
}

const CREDENTIAL_COLUMNS: &str =
    "id, user_id, provider, encrypted_payload, is_active, last_verified_at, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn upsert_credential_sqlite(pool: &SqlitePool, credential: &ApiCredential) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_credentials (
            id, user_id, provider, encrypted_payload, is_active,
            last_verified_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, provider) DO UPDATE SET
            encrypted_payload = excluded.encrypted_payload,
            is_active = 1,
            last_verified_at = excluded.last_verified_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(credential.id.to_string())
    .bind(credential.user_id.to_string())
    .bind(credential.provider.to_string())
    .bind(&credential.encrypted_payload)
    .bind(credential.is_active)
    .bind(credential.last_verified_at)
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(pool)
    .await
    .context("Failed to upsert credentials")?;

    Ok(())
}

async fn get_active_sqlite(
    pool: &SqlitePool,
    user_id: Uuid,
    provider: Provider,
) -> Result<Option<ApiCredential>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM api_credentials WHERE user_id = ? AND provider = ? AND is_active = 1",
        CREDENTIAL_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(provider.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get credentials")?;

    match row {
        Some(row) => Ok(Some(row_to_credential_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn deactivate_sqlite(pool: &SqlitePool, user_id: Uuid, provider: Provider) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE api_credentials SET is_active = 0 WHERE user_id = ? AND provider = ? AND is_active = 1",
    )
    .bind(user_id.to_string())
    .bind(provider.to_string())
    .execute(pool)
    .await
    .context("Failed to deactivate credentials")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_credential_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ApiCredential> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let provider: String = row.get("provider");
    Ok(ApiCredential {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        provider: Provider::from_str(&provider)?,
        encrypted_payload: row.get("encrypted_payload"),
        is_active: row.get("is_active"),
        last_verified_at: row.get("last_verified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn upsert_credential_mysql(pool: &MySqlPool, credential: &ApiCredential) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_credentials (
            id, user_id, provider, encrypted_payload, is_active,
            last_verified_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            encrypted_payload = VALUES(encrypted_payload),
            is_active = 1,
            last_verified_at = VALUES(last_verified_at),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(credential.id.to_string())
    .bind(credential.user_id.to_string())
    .bind(credential.provider.to_string())
    .bind(&credential.encrypted_payload)
    .bind(credential.is_active)
    .bind(credential.last_verified_at)
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(pool)
    .await
    .context("Failed to upsert credentials")?;

    Ok(())
}

async fn get_active_mysql(
    pool: &MySqlPool,
    user_id: Uuid,
    provider: Provider,
) -> Result<Option<ApiCredential>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM api_credentials WHERE user_id = ? AND provider = ? AND is_active = 1",
        CREDENTIAL_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(provider.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get credentials")?;

    match row {
        Some(row) => Ok(Some(row_to_credential_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn deactivate_mysql(pool: &MySqlPool, user_id: Uuid, provider: Provider) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE api_credentials SET is_active = 0 WHERE user_id = ? AND provider = ? AND is_active = 1",
    )
    .bind(user_id.to_string())
    .bind(provider.to_string())
    .execute(pool)
    .await
    .context("Failed to deactivate credentials")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_credential_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ApiCredential> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let provider: String = row.get("provider");
    Ok(ApiCredential {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        provider: Provider::from_str(&provider)?,
        encrypted_payload: row.get("encrypted_payload"),
        is_active: row.get("is_active"),
        last_verified_at: row.get("last_verified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (SqlxCredentialRepository, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = User::new("owner@example.com".to_string(), "hash".to_string(), None);
        users.create(&user).await.expect("Failed to create user");

        (SqlxCredentialRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (repo, user_id) = setup().await;

        let cred = ApiCredential::new(user_id, Provider::Dataforseo, "ciphertext-1".to_string());
        repo.upsert(&cred).await.expect("Failed to upsert");

        let found = repo
            .get_active(user_id, Provider::Dataforseo)
            .await
            .expect("Failed to get")
            .expect("Credentials not found");
        assert_eq!(found.encrypted_payload, "ciphertext-1");
        assert!(found.is_active);

        // No anthropic credentials yet
        assert!(repo
            .get_active(user_id, Provider::Anthropic)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let (repo, user_id) = setup().await;

        let first = ApiCredential::new(user_id, Provider::Anthropic, "old".to_string());
        repo.upsert(&first).await.expect("Failed to upsert");

        let second = ApiCredential::new(user_id, Provider::Anthropic, "new".to_string());
        repo.upsert(&second).await.expect("Failed to upsert");

        let found = repo
            .get_active(user_id, Provider::Anthropic)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.encrypted_payload, "new");
        // The original row id is kept on conflict
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_deactivate_hides_credentials() {
        let (repo, user_id) = setup().await;

        let cred = ApiCredential::new(user_id, Provider::Dataforseo, "secret".to_string());
        repo.upsert(&cred).await.expect("Failed to upsert");

        let removed = repo
            .deactivate(user_id, Provider::Dataforseo)
            .await
            .expect("Failed to deactivate");
        assert!(removed);

        assert!(repo
            .get_active(user_id, Provider::Dataforseo)
            .await
            .unwrap()
            .is_none());

        // Second deactivate is a no-op
        assert!(!repo.deactivate(user_id, Provider::Dataforseo).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_reactivates() {
        let (repo, user_id) = setup().await;

        let cred = ApiCredential::new(user_id, Provider::Dataforseo, "secret".to_string());
        repo.upsert(&cred).await.expect("Failed to upsert");
        repo.deactivate(user_id, Provider::Dataforseo).await.unwrap();

        let again = ApiCredential::new(user_id, Provider::Dataforseo, "secret-2".to_string());
        repo.upsert(&again).await.expect("Failed to upsert");

        let found = repo
            .get_active(user_id, Provider::Dataforseo)
            .await
            .unwrap()
            .expect("Credentials should be active again");
        assert_eq!(found.encrypted_payload, "secret-2");
    }
}

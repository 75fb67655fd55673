//! API usage log repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Provider, UsageRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Usage log repository trait
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Append a usage record
    async fn create(&self, record: &UsageRecord) -> Result<()>;

    /// Total estimated cost and call count for a user
    async fn totals_for_user(&self, user_id: Uuid) -> Result<(f64, i64)>;

    /// Most recent records for a user, newest first
    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageRecord>>;
}

/// SQLx-based usage log repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUsageRepository {
    pool: DynDatabasePool,
}

impl SqlxUsageRepository {
    /// Create a new SQLx usage repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UsageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UsageRepository for SqlxUsageRepository {
    async fn create(&self, record: &UsageRecord) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_record_sqlite(self.pool.as_sqlite().unwrap(), record).await
            }
            DatabaseDriver::Mysql => {
                create_record_mysql(self.pool.as_mysql().unwrap(), record).await
            }
        }
    }

    async fn totals_for_user(&self, user_id: Uuid) -> Result<(f64, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                totals_for_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                totals_for_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recent_sqlite(self.pool.as_sqlite().unwrap(), user_id, limit).await
            }
            DatabaseDriver::Mysql => {
                list_recent_mysql(self.pool.as_mysql().unwrap(), user_id, limit).await
            }
        }
    }
}

const USAGE_COLUMNS: &str = "id, user_id, provider, endpoint, cost, status, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_record_sqlite(pool: &SqlitePool, record: &UsageRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_usage_log (id, user_id, provider, endpoint, cost, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.user_id.to_string())
    .bind(record.provider.to_string())
    .bind(&record.endpoint)
    .bind(record.cost)
    .bind(record.status)
    .bind(record.created_at)
    .execute(pool)
    .await
    .context("Failed to log usage")?;

    Ok(())
}

async fn totals_for_user_sqlite(pool: &SqlitePool, user_id: Uuid) -> Result<(f64, i64)> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(cost), 0.0) as total_cost, COUNT(*) as total_calls \
         FROM api_usage_log WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_one(pool)
    .await
    .context("Failed to sum usage")?;

    Ok((row.get("total_cost"), row.get("total_calls")))
}

async fn list_recent_sqlite(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<UsageRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM api_usage_log WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        USAGE_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list usage")?;

    rows.iter().map(row_to_record_sqlite).collect()
}

fn row_to_record_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UsageRecord> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let provider: String = row.get("provider");
    Ok(UsageRecord {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        provider: Provider::from_str(&provider)?,
        endpoint: row.get("endpoint"),
        cost: row.get("cost"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_record_mysql(pool: &MySqlPool, record: &UsageRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_usage_log (id, user_id, provider, endpoint, cost, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.user_id.to_string())
    .bind(record.provider.to_string())
    .bind(&record.endpoint)
    .bind(record.cost)
    .bind(record.status)
    .bind(record.created_at)
    .execute(pool)
    .await
    .context("Failed to log usage")?;

    Ok(())
}

async fn totals_for_user_mysql(pool: &MySqlPool, user_id: Uuid) -> Result<(f64, i64)> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(cost), 0.0) as total_cost, COUNT(*) as total_calls \
         FROM api_usage_log WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_one(pool)
    .await
    .context("Failed to sum usage")?;

    Ok((row.get("total_cost"), row.get("total_calls")))
}

async fn list_recent_mysql(
    pool: &MySqlPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<UsageRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM api_usage_log WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        USAGE_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list usage")?;

    rows.iter().map(row_to_record_mysql).collect()
}

fn row_to_record_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UsageRecord> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let provider: String = row.get("provider");
    Ok(UsageRecord {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        provider: Provider::from_str(&provider)?,
        endpoint: row.get("endpoint"),
        cost: row.get("cost"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (SqlxUsageRepository, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = User::new("owner@example.com".to_string(), "hash".to_string(), None);
        users.create(&user).await.expect("Failed to create user");

        (SqlxUsageRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_log_and_totals() {
        let (repo, user_id) = setup().await;

        repo.create(&UsageRecord::new(
            user_id,
            Provider::Dataforseo,
            "serp/google/organic/live/advanced",
            0.002,
            Some(200),
        ))
        .await
        .expect("Failed to log");
        repo.create(&UsageRecord::new(
            user_id,
            Provider::Anthropic,
            "messages",
            0.015,
            Some(200),
        ))
        .await
        .expect("Failed to log");

        let (total_cost, total_calls) = repo.totals_for_user(user_id).await.unwrap();
        assert_eq!(total_calls, 2);
        assert!((total_cost - 0.017).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_totals_empty_user() {
        let (repo, _user_id) = setup().await;
        let (cost, calls) = repo.totals_for_user(Uuid::new_v4()).await.unwrap();
        assert_eq!(cost, 0.0);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_list_recent_respects_limit() {
        let (repo, user_id) = setup().await;

        for i in 0..5 {
            let mut record = UsageRecord::new(
                user_id,
                Provider::Dataforseo,
                format!("endpoint-{}", i),
                0.001,
                Some(200),
            );
            record.created_at = record.created_at + chrono::Duration::seconds(i);
            repo.create(&record).await.expect("Failed to log");
        }

        let recent = repo.list_recent(user_id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].endpoint, "endpoint-4");
    }
}

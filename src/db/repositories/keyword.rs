//! Keyword repository
//!
//! Database operations for keywords, including metric refreshes and the
//! tracking flags consumed by the rank-check scheduler.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Keyword, KeywordMetrics};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Keyword repository trait
#[async_trait]
pub trait KeywordRepository: Send + Sync {
    /// Create a new keyword
    async fn create(&self, keyword: &Keyword) -> Result<Keyword>;

    /// Get a keyword by ID, restricted to a project
    async fn get_for_project(&self, id: Uuid, project_id: Uuid) -> Result<Option<Keyword>>;

    /// List all keywords in a project, newest first
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Keyword>>;

    /// Whether a keyword phrase already exists in a project
    async fn exists(&self, project_id: Uuid, phrase: &str) -> Result<bool>;

    /// Delete a keyword (cascades to rank checks and snapshots)
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Write provider metrics and stamp last_refreshed_at
    async fn update_metrics(
        &self,
        id: Uuid,
        metrics: &KeywordMetrics,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Persist tracking settings (is_tracking, tracked_url, engine, location, language)
    async fn update_tracking(&self, keyword: &Keyword) -> Result<()>;

    /// All tracked keywords together with the owning user, for the scheduler
    async fn list_tracked_with_owner(&self) -> Result<Vec<(Keyword, Uuid)>>;
}

/// SQLx-based keyword repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxKeywordRepository {
    pool: DynDatabasePool,
}

impl SqlxKeywordRepository {
    /// Create a new SQLx keyword repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn KeywordRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl KeywordRepository for SqlxKeywordRepository {
    async fn create(&self, keyword: &Keyword) -> Result<Keyword> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_keyword_sqlite(self.pool.as_sqlite().unwrap(), keyword).await
            }
            DatabaseDriver::Mysql => {
                create_keyword_mysql(self.pool.as_mysql().unwrap(), keyword).await
            }
        }
    }

    async fn get_for_project(&self, id: Uuid, project_id: Uuid) -> Result<Option<Keyword>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_keyword_sqlite(self.pool.as_sqlite().unwrap(), id, project_id).await
            }
            DatabaseDriver::Mysql => {
                get_keyword_mysql(self.pool.as_mysql().unwrap(), id, project_id).await
            }
        }
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Keyword>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_keywords_sqlite(self.pool.as_sqlite().unwrap(), project_id).await
            }
            DatabaseDriver::Mysql => {
                list_keywords_mysql(self.pool.as_mysql().unwrap(), project_id).await
            }
        }
    }

    async fn exists(&self, project_id: Uuid, phrase: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                keyword_exists_sqlite(self.pool.as_sqlite().unwrap(), project_id, phrase).await
            }
            DatabaseDriver::Mysql => {
                keyword_exists_mysql(self.pool.as_mysql().unwrap(), project_id, phrase).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_keyword_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_keyword_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn update_metrics(
        &self,
        id: Uuid,
        metrics: &KeywordMetrics,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_metrics_sqlite(self.pool.as_sqlite().unwrap(), id, metrics, refreshed_at)
                    .await
            }
            DatabaseDriver::Mysql => {
                update_metrics_mysql(self.pool.as_mysql().unwrap(), id, metrics, refreshed_at)
                    .await
            }
        }
    }

    async fn update_tracking(&self, keyword: &Keyword) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_tracking_sqlite(self.pool.as_sqlite().unwrap(), keyword).await
            }
            DatabaseDriver::Mysql => {
                update_tracking_mysql(self.pool.as_mysql().unwrap(), keyword).await
            }
        }
    }

    async fn list_tracked_with_owner(&self) -> Result<Vec<(Keyword, Uuid)>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_tracked_with_owner_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_tracked_with_owner_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

const KEYWORD_COLUMNS: &str = "id, project_id, keyword, location_code, language_code, \
    search_volume, keyword_difficulty, cpc, competition, last_refreshed_at, \
    is_tracking, tracked_url, search_engine, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_keyword_sqlite(pool: &SqlitePool, keyword: &Keyword) -> Result<Keyword> {
    sqlx::query(
        r#"
        INSERT INTO keywords (
            id, project_id, keyword, location_code, language_code,
            search_volume, keyword_difficulty, cpc, competition, last_refreshed_at,
            is_tracking, tracked_url, search_engine, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(keyword.id.to_string())
    .bind(keyword.project_id.to_string())
    .bind(&keyword.keyword)
    .bind(keyword.location_code)
    .bind(&keyword.language_code)
    .bind(keyword.search_volume)
    .bind(keyword.keyword_difficulty)
    .bind(keyword.cpc)
    .bind(keyword.competition)
    .bind(keyword.last_refreshed_at)
    .bind(keyword.is_tracking)
    .bind(&keyword.tracked_url)
    .bind(keyword.search_engine.to_string())
    .bind(keyword.created_at)
    .bind(keyword.updated_at)
    .execute(pool)
    .await
    .context("Failed to create keyword")?;

    Ok(keyword.clone())
}

async fn get_keyword_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    project_id: Uuid,
) -> Result<Option<Keyword>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM keywords WHERE id = ? AND project_id = ?",
        KEYWORD_COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get keyword")?;

    match row {
        Some(row) => Ok(Some(row_to_keyword_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_keywords_sqlite(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Keyword>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM keywords WHERE project_id = ? ORDER BY created_at DESC",
        KEYWORD_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list keywords")?;

    rows.iter().map(row_to_keyword_sqlite).collect()
}

async fn keyword_exists_sqlite(pool: &SqlitePool, project_id: Uuid, phrase: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as cnt FROM keywords WHERE project_id = ? AND keyword = ?")
        .bind(project_id.to_string())
        .bind(phrase)
        .fetch_one(pool)
        .await
        .context("Failed to check keyword existence")?;

    let count: i64 = row.get("cnt");
    Ok(count > 0)
}

async fn delete_keyword_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM keywords WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete keyword")?;

    Ok(())
}

async fn update_metrics_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    metrics: &KeywordMetrics,
    refreshed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE keywords
        SET search_volume = ?, keyword_difficulty = ?, cpc = ?, competition = ?,
            last_refreshed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(metrics.search_volume)
    .bind(metrics.keyword_difficulty)
    .bind(metrics.cpc)
    .bind(metrics.competition)
    .bind(refreshed_at)
    .bind(refreshed_at)
    .bind(id.to_string())
    .execute(pool)
    .await
    .context("Failed to update keyword metrics")?;

    Ok(())
}

async fn update_tracking_sqlite(pool: &SqlitePool, keyword: &Keyword) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE keywords
        SET is_tracking = ?, tracked_url = ?, search_engine = ?,
            location_code = ?, language_code = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(keyword.is_tracking)
    .bind(&keyword.tracked_url)
    .bind(keyword.search_engine.to_string())
    .bind(keyword.location_code)
    .bind(&keyword.language_code)
    .bind(keyword.updated_at)
    .bind(keyword.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update keyword tracking")?;

    Ok(())
}

async fn list_tracked_with_owner_sqlite(pool: &SqlitePool) -> Result<Vec<(Keyword, Uuid)>> {
    let rows = sqlx::query(
        r#"
        SELECT k.id, k.project_id, k.keyword, k.location_code, k.language_code,
               k.search_volume, k.keyword_difficulty, k.cpc, k.competition, k.last_refreshed_at,
               k.is_tracking, k.tracked_url, k.search_engine, k.created_at, k.updated_at,
               p.user_id as owner_id
        FROM keywords k
        JOIN projects p ON p.id = k.project_id
        WHERE k.is_tracking = 1
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tracked keywords")?;

    let mut result = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.get("owner_id");
        result.push((row_to_keyword_sqlite(row)?, parse_uuid(&owner, "owner_id")?));
    }
    Ok(result)
}

fn row_to_keyword_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Keyword> {
    let id: String = row.get("id");
    let project_id: String = row.get("project_id");
    let search_engine: String = row.get("search_engine");
    Ok(Keyword {
        id: parse_uuid(&id, "id")?,
        project_id: parse_uuid(&project_id, "project_id")?,
        keyword: row.get("keyword"),
        location_code: row.get("location_code"),
        language_code: row.get("language_code"),
        search_volume: row.get("search_volume"),
        keyword_difficulty: row.get("keyword_difficulty"),
        cpc: row.get("cpc"),
        competition: row.get("competition"),
        last_refreshed_at: row.get("last_refreshed_at"),
        is_tracking: row.get("is_tracking"),
        tracked_url: row.get("tracked_url"),
        search_engine: crate::models::SearchEngine::from_str(&search_engine)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_keyword_mysql(pool: &MySqlPool, keyword: &Keyword) -> Result<Keyword> {
    sqlx::query(
        r#"
        INSERT INTO keywords (
            id, project_id, keyword, location_code, language_code,
            search_volume, keyword_difficulty, cpc, competition, last_refreshed_at,
            is_tracking, tracked_url, search_engine, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(keyword.id.to_string())
    .bind(keyword.project_id.to_string())
    .bind(&keyword.keyword)
    .bind(keyword.location_code)
    .bind(&keyword.language_code)
    .bind(keyword.search_volume)
    .bind(keyword.keyword_difficulty)
    .bind(keyword.cpc)
    .bind(keyword.competition)
    .bind(keyword.last_refreshed_at)
    .bind(keyword.is_tracking)
    .bind(&keyword.tracked_url)
    .bind(keyword.search_engine.to_string())
    .bind(keyword.created_at)
    .bind(keyword.updated_at)
    .execute(pool)
    .await
    .context("Failed to create keyword")?;

    Ok(keyword.clone())
}

async fn get_keyword_mysql(
    pool: &MySqlPool,
    id: Uuid,
    project_id: Uuid,
) -> Result<Option<Keyword>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM keywords WHERE id = ? AND project_id = ?",
        KEYWORD_COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get keyword")?;

    match row {
        Some(row) => Ok(Some(row_to_keyword_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_keywords_mysql(pool: &MySqlPool, project_id: Uuid) -> Result<Vec<Keyword>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM keywords WHERE project_id = ? ORDER BY created_at DESC",
        KEYWORD_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list keywords")?;

    rows.iter().map(row_to_keyword_mysql).collect()
}

async fn keyword_exists_mysql(pool: &MySqlPool, project_id: Uuid, phrase: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as cnt FROM keywords WHERE project_id = ? AND keyword = ?")
        .bind(project_id.to_string())
        .bind(phrase)
        .fetch_one(pool)
        .await
        .context("Failed to check keyword existence")?;

    let count: i64 = row.get("cnt");
    Ok(count > 0)
}

async fn delete_keyword_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM keywords WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete keyword")?;

    Ok(())
}

async fn update_metrics_mysql(
    pool: &MySqlPool,
    id: Uuid,
    metrics: &KeywordMetrics,
    refreshed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE keywords
        SET search_volume = ?, keyword_difficulty = ?, cpc = ?, competition = ?,
            last_refreshed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(metrics.search_volume)
    .bind(metrics.keyword_difficulty)
    .bind(metrics.cpc)
    .bind(metrics.competition)
    .bind(refreshed_at)
    .bind(refreshed_at)
    .bind(id.to_string())
    .execute(pool)
    .await
    .context("Failed to update keyword metrics")?;

    Ok(())
}

async fn update_tracking_mysql(pool: &MySqlPool, keyword: &Keyword) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE keywords
        SET is_tracking = ?, tracked_url = ?, search_engine = ?,
            location_code = ?, language_code = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(keyword.is_tracking)
    .bind(&keyword.tracked_url)
    .bind(keyword.search_engine.to_string())
    .bind(keyword.location_code)
    .bind(&keyword.language_code)
    .bind(keyword.updated_at)
    .bind(keyword.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update keyword tracking")?;

    Ok(())
}

async fn list_tracked_with_owner_mysql(pool: &MySqlPool) -> Result<Vec<(Keyword, Uuid)>> {
    let rows = sqlx::query(
        r#"
        SELECT k.id, k.project_id, k.keyword, k.location_code, k.language_code,
               k.search_volume, k.keyword_difficulty, k.cpc, k.competition, k.last_refreshed_at,
               k.is_tracking, k.tracked_url, k.search_engine, k.created_at, k.updated_at,
               p.user_id as owner_id
        FROM keywords k
        JOIN projects p ON p.id = k.project_id
        WHERE k.is_tracking = 1
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tracked keywords")?;

    let mut result = Vec::with_capacity(rows.len());
    for row in &rows {
        let owner: String = row.get("owner_id");
        result.push((row_to_keyword_mysql(row)?, parse_uuid(&owner, "owner_id")?));
    }
    Ok(result)
}

fn row_to_keyword_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Keyword> {
    let id: String = row.get("id");
    let project_id: String = row.get("project_id");
    let search_engine: String = row.get("search_engine");
    Ok(Keyword {
        id: parse_uuid(&id, "id")?,
        project_id: parse_uuid(&project_id, "project_id")?,
        keyword: row.get("keyword"),
        location_code: row.get("location_code"),
        language_code: row.get("language_code"),
        search_volume: row.get("search_volume"),
        keyword_difficulty: row.get("keyword_difficulty"),
        cpc: row.get("cpc"),
        competition: row.get("competition"),
        last_refreshed_at: row.get("last_refreshed_at"),
        is_tracking: row.get("is_tracking"),
        tracked_url: row.get("tracked_url"),
        search_engine: crate::models::SearchEngine::from_str(&search_engine)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

//! Rank check repository
//!
//! Database operations for rank-check history rows.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CheckOrigin, RankCheck, SearchEngine};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Rank check repository trait
#[async_trait]
pub trait RankCheckRepository: Send + Sync {
    /// Insert a new rank check
    async fn create(&self, check: &RankCheck) -> Result<RankCheck>;

    /// The most recent check for a keyword
    async fn latest_for_keyword(&self, keyword_id: Uuid) -> Result<Option<RankCheck>>;

    /// All checks for a keyword since a point in time, oldest first
    async fn list_since(&self, keyword_id: Uuid, since: DateTime<Utc>) -> Result<Vec<RankCheck>>;

    /// The latest check per keyword across a whole project
    async fn latest_per_keyword(&self, project_id: Uuid) -> Result<Vec<RankCheck>>;

    /// Drop all history for a keyword (stop tracking)
    async fn delete_by_keyword(&self, keyword_id: Uuid) -> Result<()>;
}

/// SQLx-based rank check repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRankCheckRepository {
    pool: DynDatabasePool,
}

impl SqlxRankCheckRepository {
    /// Create a new SQLx rank check repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RankCheckRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RankCheckRepository for SqlxRankCheckRepository {
    async fn create(&self, check: &RankCheck) -> Result<RankCheck> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_check_sqlite(self.pool.as_sqlite().unwrap(), check).await
            }
            DatabaseDriver::Mysql => create_check_mysql(self.pool.as_mysql().unwrap(), check).await,
        }
    }

    async fn latest_for_keyword(&self, keyword_id: Uuid) -> Result<Option<RankCheck>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                latest_for_keyword_sqlite(self.pool.as_sqlite().unwrap(), keyword_id).await
            }
            DatabaseDriver::Mysql => {
                latest_for_keyword_mysql(self.pool.as_mysql().unwrap(), keyword_id).await
            }
        }
    }

    async fn list_since(&self, keyword_id: Uuid, since: DateTime<Utc>) -> Result<Vec<RankCheck>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_since_sqlite(self.pool.as_sqlite().unwrap(), keyword_id, since).await
            }
            DatabaseDriver::Mysql => {
                list_since_mysql(self.pool.as_mysql().unwrap(), keyword_id, since).await
            }
        }
    }

    async fn latest_per_keyword(&self, project_id: Uuid) -> Result<Vec<RankCheck>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                latest_per_keyword_sqlite(self.pool.as_sqlite().unwrap(), project_id).await
            }
            DatabaseDriver::Mysql => {
                latest_per_keyword_mysql(self.pool.as_mysql().unwrap(), project_id).await
            }
        }
    }

    async fn delete_by_keyword(&self, keyword_id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_by_keyword_sqlite(self.pool.as_sqlite().unwrap(), keyword_id).await
            }
            DatabaseDriver::Mysql => {
                delete_by_keyword_mysql(self.pool.as_mysql().unwrap(), keyword_id).await
            }
        }
    }
}

const CHECK_COLUMNS: &str = "id, keyword_id, position, found_url, search_engine, origin, checked_at";

// Latest check per keyword via a correlated subquery; works on both backends.
const LATEST_PER_KEYWORD_SQL: &str = r#"
    SELECT rc.id, rc.keyword_id, rc.position, rc.found_url, rc.search_engine, rc.origin, rc.checked_at
    FROM rank_checks rc
    JOIN keywords k ON k.id = rc.keyword_id
    WHERE k.project_id = ?
      AND rc.checked_at = (
          SELECT MAX(inner_rc.checked_at)
          FROM rank_checks inner_rc
          WHERE inner_rc.keyword_id = rc.keyword_id
      )
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_check_sqlite(pool: &SqlitePool, check: &RankCheck) -> Result<RankCheck> {
    sqlx::query(
        r#"
        INSERT INTO rank_checks (id, keyword_id, position, found_url, search_engine, origin, checked_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(check.id.to_string())
    .bind(check.keyword_id.to_string())
    .bind(check.position)
    .bind(&check.found_url)
    .bind(check.search_engine.to_string())
    .bind(check.origin.to_string())
    .bind(check.checked_at)
    .execute(pool)
    .await
    .context("Failed to create rank check")?;

    Ok(check.clone())
}

async fn latest_for_keyword_sqlite(
    pool: &SqlitePool,
    keyword_id: Uuid,
) -> Result<Option<RankCheck>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rank_checks WHERE keyword_id = ? ORDER BY checked_at DESC LIMIT 1",
        CHECK_COLUMNS
    ))
    .bind(keyword_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get latest rank check")?;

    match row {
        Some(row) => Ok(Some(row_to_check_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_since_sqlite(
    pool: &SqlitePool,
    keyword_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<RankCheck>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM rank_checks WHERE keyword_id = ? AND checked_at >= ? ORDER BY checked_at ASC",
        CHECK_COLUMNS
    ))
    .bind(keyword_id.to_string())
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Failed to list rank checks")?;

    rows.iter().map(row_to_check_sqlite).collect()
}

async fn latest_per_keyword_sqlite(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<RankCheck>> {
    let rows = sqlx::query(LATEST_PER_KEYWORD_SQL)
        .bind(project_id.to_string())
        .fetch_all(pool)
        .await
        .context("Failed to list latest rank checks")?;

    rows.iter().map(row_to_check_sqlite).collect()
}

async fn delete_by_keyword_sqlite(pool: &SqlitePool, keyword_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM rank_checks WHERE keyword_id = ?")
        .bind(keyword_id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete rank checks")?;

    Ok(())
}

fn row_to_check_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<RankCheck> {
    let id: String = row.get("id");
    let keyword_id: String = row.get("keyword_id");
    let search_engine: String = row.get("search_engine");
    let origin: String = row.get("origin");
    Ok(RankCheck {
        id: parse_uuid(&id, "id")?,
        keyword_id: parse_uuid(&keyword_id, "keyword_id")?,
        position: row.get("position"),
        found_url: row.get("found_url"),
        search_engine: SearchEngine::from_str(&search_engine)?,
        origin: CheckOrigin::from_str(&origin)?,
        checked_at: row.get("checked_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_check_mysql(pool: &MySqlPool, check: &RankCheck) -> Result<RankCheck> {
    sqlx::query(
        r#"
        INSERT INTO rank_checks (id, keyword_id, position, found_url, search_engine, origin, checked_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(check.id.to_string())
    .bind(check.keyword_id.to_string())
    .bind(check.position)
    .bind(&check.found_url)
    .bind(check.search_engine.to_string())
    .bind(check.origin.to_string())
    .bind(check.checked_at)
    .execute(pool)
    .await
    .context("Failed to create rank check")?;

    Ok(check.clone())
}

async fn latest_for_keyword_mysql(
    pool: &MySqlPool,
    keyword_id: Uuid,
) -> Result<Option<RankCheck>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rank_checks WHERE keyword_id = ? ORDER BY checked_at DESC LIMIT 1",
        CHECK_COLUMNS
    ))
    .bind(keyword_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get latest rank check")?;

    match row {
        Some(row) => Ok(Some(row_to_check_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_since_mysql(
    pool: &MySqlPool,
    keyword_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<RankCheck>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM rank_checks WHERE keyword_id = ? AND checked_at >= ? ORDER BY checked_at ASC",
        CHECK_COLUMNS
    ))
    .bind(keyword_id.to_string())
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Failed to list rank checks")?;

    rows.iter().map(row_to_check_mysql).collect()
}

async fn latest_per_keyword_mysql(pool: &MySqlPool, project_id: Uuid) -> Result<Vec<RankCheck>> {
    let rows = sqlx::query(LATEST_PER_KEYWORD_SQL)
        .bind(project_id.to_string())
        .fetch_all(pool)
        .await
        .context("Failed to list latest rank checks")?;

    rows.iter().map(row_to_check_mysql).collect()
}

async fn delete_by_keyword_mysql(pool: &MySqlPool, keyword_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM rank_checks WHERE keyword_id = ?")
        .bind(keyword_id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete rank checks")?;

    Ok(())
}

fn row_to_check_mysql(row: &sqlx::mysql::MySqlRow) -> Result<RankCheck> {
    let id: String = row.get("id");
    let keyword_id: String = row.get("keyword_id");
    let search_engine: String = row.get("search_engine");
    let origin: String = row.get("origin");
    Ok(RankCheck {
        id: parse_uuid(&id, "id")?,
        keyword_id: parse_uuid(&keyword_id, "keyword_id")?,
        position: row.get("position"),
        found_url: row.get("found_url"),
        search_engine: SearchEngine::from_str(&search_engine)?,
        origin: CheckOrigin::from_str(&origin)?,
        checked_at: row.get("checked_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        KeywordRepository, ProjectRepository, SqlxKeywordRepository, SqlxProjectRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Keyword, Project, User};
    use chrono::Duration;

    async fn setup() -> (SqlxRankCheckRepository, Uuid, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = User::new("owner@example.com".to_string(), "hash".to_string(), None);
        users.create(&user).await.expect("Failed to create user");

        let projects = SqlxProjectRepository::new(pool.clone());
        let project = Project::new(user.id, "Site".to_string(), "example.com".to_string(), None);
        projects
            .create(&project)
            .await
            .expect("Failed to create project");

        let keywords = SqlxKeywordRepository::new(pool.clone());
        let kw = Keyword::new(project.id, "rank me".to_string());
        keywords.create(&kw).await.expect("Failed to create keyword");

        (SqlxRankCheckRepository::new(pool), project.id, kw.id)
    }

    #[tokio::test]
    async fn test_create_and_latest() {
        let (repo, _project_id, keyword_id) = setup().await;

        let mut older = RankCheck::new(
            keyword_id,
            Some(12),
            Some("https://example.com/a".to_string()),
            SearchEngine::Google,
            CheckOrigin::Live,
        );
        older.checked_at = Utc::now() - Duration::hours(2);
        let newer = RankCheck::new(
            keyword_id,
            Some(8),
            Some("https://example.com/a".to_string()),
            SearchEngine::Google,
            CheckOrigin::Scheduled,
        );

        repo.create(&older).await.expect("Failed to create check");
        repo.create(&newer).await.expect("Failed to create check");

        let latest = repo
            .latest_for_keyword(keyword_id)
            .await
            .expect("Failed to get latest")
            .expect("No check found");
        assert_eq!(latest.position, Some(8));
        assert_eq!(latest.origin, CheckOrigin::Scheduled);
    }

    #[tokio::test]
    async fn test_list_since_window() {
        let (repo, _project_id, keyword_id) = setup().await;

        let mut old = RankCheck::new(keyword_id, Some(30), None, SearchEngine::Google, CheckOrigin::Live);
        old.checked_at = Utc::now() - Duration::days(60);
        let recent = RankCheck::new(keyword_id, Some(5), None, SearchEngine::Google, CheckOrigin::Live);

        repo.create(&old).await.expect("Failed to create check");
        repo.create(&recent).await.expect("Failed to create check");

        let window = repo
            .list_since(keyword_id, Utc::now() - Duration::days(30))
            .await
            .expect("Failed to list checks");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].position, Some(5));
    }

    #[tokio::test]
    async fn test_latest_per_keyword_project_wide() {
        let (repo, project_id, keyword_id) = setup().await;

        let mut first = RankCheck::new(keyword_id, Some(20), None, SearchEngine::Google, CheckOrigin::Live);
        first.checked_at = Utc::now() - Duration::hours(1);
        let second = RankCheck::new(keyword_id, Some(3), None, SearchEngine::Google, CheckOrigin::Live);

        repo.create(&first).await.expect("Failed to create check");
        repo.create(&second).await.expect("Failed to create check");

        let latest = repo
            .latest_per_keyword(project_id)
            .await
            .expect("Failed to list latest");
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].position, Some(3));
    }

    #[tokio::test]
    async fn test_delete_by_keyword() {
        let (repo, _project_id, keyword_id) = setup().await;

        let check = RankCheck::new(keyword_id, None, None, SearchEngine::Google, CheckOrigin::Live);
        repo.create(&check).await.expect("Failed to create check");

        repo.delete_by_keyword(keyword_id)
            .await
            .expect("Failed to delete checks");

        assert!(repo.latest_for_keyword(keyword_id).await.unwrap().is_none());
    }
}

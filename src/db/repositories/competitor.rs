//! Competitor repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Competitor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Competitor repository trait
#[async_trait]
pub trait CompetitorRepository: Send + Sync {
    /// Add a competitor to a project
    async fn create(&self, competitor: &Competitor) -> Result<Competitor>;

    /// Get a competitor by ID, restricted to a project
    async fn get_for_project(&self, id: Uuid, project_id: Uuid) -> Result<Option<Competitor>>;

    /// List competitors for a project
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Competitor>>;

    /// Whether a domain is already registered for a project
    async fn exists(&self, project_id: Uuid, domain: &str) -> Result<bool>;

    /// Remove a competitor
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// SQLx-based competitor repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCompetitorRepository {
    pool: DynDatabasePool,
}

impl SqlxCompetitorRepository {
    /// Create a new SQLx competitor repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CompetitorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CompetitorRepository for SqlxCompetitorRepository {
    async fn create(&self, competitor: &Competitor) -> Result<Competitor> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_competitor_sqlite(self.pool.as_sqlite().unwrap(), competitor).await
            }
            DatabaseDriver::Mysql => {
                create_competitor_mysql(self.pool.as_mysql().unwrap(), competitor).await
            }
        }
    }

    async fn get_for_project(&self, id: Uuid, project_id: Uuid) -> Result<Option<Competitor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_competitor_sqlite(self.pool.as_sqlite().unwrap(), id, project_id).await
            }
            DatabaseDriver::Mysql => {
                get_competitor_mysql(self.pool.as_mysql().unwrap(), id, project_id).await
            }
        }
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Competitor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_competitors_sqlite(self.pool.as_sqlite().unwrap(), project_id).await
            }
            DatabaseDriver::Mysql => {
                list_competitors_mysql(self.pool.as_mysql().unwrap(), project_id).await
            }
        }
    }

    async fn exists(&self, project_id: Uuid, domain: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                competitor_exists_sqlite(self.pool.as_sqlite().unwrap(), project_id, domain).await
            }
            DatabaseDriver::Mysql => {
                competitor_exists_mysql(self.pool.as_mysql().unwrap(), project_id, domain).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_competitor_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                delete_competitor_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }
}

const COMPETITOR_COLUMNS: &str = "id, project_id, domain, name, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_competitor_sqlite(pool: &SqlitePool, competitor: &Competitor) -> Result<Competitor> {
    sqlx::query(
        r#"
        INSERT INTO competitors (id, project_id, domain, name, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(competitor.id.to_string())
    .bind(competitor.project_id.to_string())
    .bind(&competitor.domain)
    .bind(&competitor.name)
    .bind(competitor.created_at)
    .execute(pool)
    .await
    .context("Failed to create competitor")?;

    Ok(competitor.clone())
}

async fn get_competitor_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    project_id: Uuid,
) -> Result<Option<Competitor>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM competitors WHERE id = ? AND project_id = ?",
        COMPETITOR_COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get competitor")?;

    match row {
        Some(row) => Ok(Some(row_to_competitor_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_competitors_sqlite(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Competitor>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM competitors WHERE project_id = ? ORDER BY domain ASC",
        COMPETITOR_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list competitors")?;

    rows.iter().map(row_to_competitor_sqlite).collect()
}

async fn competitor_exists_sqlite(
    pool: &SqlitePool,
    project_id: Uuid,
    domain: &str,
) -> Result<bool> {
    let row =
        sqlx::query("SELECT COUNT(*) as cnt FROM competitors WHERE project_id = ? AND domain = ?")
            .bind(project_id.to_string())
            .bind(domain)
            .fetch_one(pool)
            .await
            .context("Failed to check competitor existence")?;

    let count: i64 = row.get("cnt");
    Ok(count > 0)
}

async fn delete_competitor_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM competitors WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete competitor")?;

    Ok(())
}

fn row_to_competitor_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Competitor> {
    let id: String = row.get("id");
    let project_id: String = row.get("project_id");
    Ok(Competitor {
        id: parse_uuid(&id, "id")?,
        project_id: parse_uuid(&project_id, "project_id")?,
        domain: row.get("domain"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_competitor_mysql(pool: &MySqlPool, competitor: &Competitor) -> Result<Competitor> {
    sqlx::query(
        r#"
        INSERT INTO competitors (id, project_id, domain, name, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(competitor.id.to_string())
    .bind(competitor.project_id.to_string())
    .bind(&competitor.domain)
    .bind(&competitor.name)
    .bind(competitor.created_at)
    .execute(pool)
    .await
    .context("Failed to create competitor")?;

    Ok(competitor.clone())
}

async fn get_competitor_mysql(
    pool: &MySqlPool,
    id: Uuid,
    project_id: Uuid,
) -> Result<Option<Competitor>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM competitors WHERE id = ? AND project_id = ?",
        COMPETITOR_COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get competitor")?;

    match row {
        Some(row) => Ok(Some(row_to_competitor_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_competitors_mysql(pool: &MySqlPool, project_id: Uuid) -> Result<Vec<Competitor>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM competitors WHERE project_id = ? ORDER BY domain ASC",
        COMPETITOR_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list competitors")?;

    rows.iter().map(row_to_competitor_mysql).collect()
}

async fn competitor_exists_mysql(
    pool: &MySqlPool,
    project_id: Uuid,
    domain: &str,
) -> Result<bool> {
    let row =
        sqlx::query("SELECT COUNT(*) as cnt FROM competitors WHERE project_id = ? AND domain = ?")
            .bind(project_id.to_string())
            .bind(domain)
            .fetch_one(pool)
            .await
            .context("Failed to check competitor existence")?;

    let count: i64 = row.get("cnt");
    Ok(count > 0)
}

async fn delete_competitor_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM competitors WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete competitor")?;

    Ok(())
}

fn row_to_competitor_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Competitor> {
    let id: String = row.get("id");
    let project_id: String = row.get("project_id");
    Ok(Competitor {
        id: parse_uuid(&id, "id")?,
        project_id: parse_uuid(&project_id, "project_id")?,
        domain: row.get("domain"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ProjectRepository, SqlxProjectRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Project, User};

    async fn setup() -> (SqlxCompetitorRepository, Uuid) {
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

        (SqlxCompetitorRepository::new(pool), project.id)
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let (repo, project_id) = setup().await;

        let competitor = Competitor::new(project_id, "rival.com".to_string(), None);
        repo.create(&competitor)
            .await
            .expect("Failed to create competitor");

        let list = repo.list_by_project(project_id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].domain, "rival.com");

        repo.delete(competitor.id)
            .await
            .expect("Failed to delete competitor");
        assert!(repo.list_by_project(project_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_domain_rejected() {
        let (repo, project_id) = setup().await;

        let first = Competitor::new(project_id, "rival.com".to_string(), None);
        repo.create(&first).await.expect("Failed to create competitor");

        let dup = Competitor::new(project_id, "rival.com".to_string(), None);
        assert!(repo.create(&dup).await.is_err());
        assert!(repo.exists(project_id, "rival.com").await.unwrap());
    }
}

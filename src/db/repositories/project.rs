//! Project repository
//!
//! Database operations for projects. Lookups are scoped to the owning user
//! so a foreign project behaves exactly like a missing one.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Project;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Project repository trait
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create a new project
    async fn create(&self, project: &Project) -> Result<Project>;

    /// Get a project by ID, restricted to its owner
    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Project>>;

    /// List projects owned by a user, newest first
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Project>>;

    /// Persist name/domain/description changes
    async fn update(&self, project: &Project) -> Result<Project>;

    /// Delete a project (cascades to keywords and their history)
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// SQLx-based project repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxProjectRepository {
    pool: DynDatabasePool,
}

impl SqlxProjectRepository {
    /// Create a new SQLx project repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProjectRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProjectRepository for SqlxProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_project_sqlite(self.pool.as_sqlite().unwrap(), project).await
            }
            DatabaseDriver::Mysql => {
                create_project_mysql(self.pool.as_mysql().unwrap(), project).await
            }
        }
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_project_for_user_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => {
                get_project_for_user_mysql(self.pool.as_mysql().unwrap(), id, user_id).await
            }
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Project>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_projects_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                list_projects_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn update(&self, project: &Project) -> Result<Project> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_project_sqlite(self.pool.as_sqlite().unwrap(), project).await
            }
            DatabaseDriver::Mysql => {
                update_project_mysql(self.pool.as_mysql().unwrap(), project).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_project_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_project_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const PROJECT_COLUMNS: &str = "id, user_id, name, domain, description, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_project_sqlite(pool: &SqlitePool, project: &Project) -> Result<Project> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, user_id, name, domain, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(project.user_id.to_string())
    .bind(&project.name)
    .bind(&project.domain)
    .bind(&project.description)
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(pool)
    .await
    .context("Failed to create project")?;

    Ok(project.clone())
}

async fn get_project_for_user_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Project>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM projects WHERE id = ? AND user_id = ?",
        PROJECT_COLUMNS
    ))
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get project")?;

    match row {
        Some(row) => Ok(Some(row_to_project_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_projects_by_user_sqlite(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM projects WHERE user_id = ? ORDER BY created_at DESC",
        PROJECT_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list projects")?;

    rows.iter().map(row_to_project_sqlite).collect()
}

async fn update_project_sqlite(pool: &SqlitePool, project: &Project) -> Result<Project> {
    sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, domain = ?, description = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&project.name)
    .bind(&project.domain)
    .bind(&project.description)
    .bind(project.updated_at)
    .bind(project.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update project")?;

    Ok(project.clone())
}

async fn delete_project_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete project")?;

    Ok(())
}

fn row_to_project_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Project> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    Ok(Project {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        name: row.get("name"),
        domain: row.get("domain"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_project_mysql(pool: &MySqlPool, project: &Project) -> Result<Project> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, user_id, name, domain, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(project.user_id.to_string())
    .bind(&project.name)
    .bind(&project.domain)
    .bind(&project.description)
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(pool)
    .await
    .context("Failed to create project")?;

    Ok(project.clone())
}

async fn get_project_for_user_mysql(
    pool: &MySqlPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Project>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM projects WHERE id = ? AND user_id = ?",
        PROJECT_COLUMNS
    ))
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get project")?;

    match row {
        Some(row) => Ok(Some(row_to_project_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_projects_by_user_mysql(pool: &MySqlPool, user_id: Uuid) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM projects WHERE user_id = ? ORDER BY created_at DESC",
        PROJECT_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list projects")?;

    rows.iter().map(row_to_project_mysql).collect()
}

async fn update_project_mysql(pool: &MySqlPool, project: &Project) -> Result<Project> {
    sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, domain = ?, description = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&project.name)
    .bind(&project.domain)
    .bind(&project.description)
    .bind(project.updated_at)
    .bind(project.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update project")?;

    Ok(project.clone())
}

async fn delete_project_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete project")?;

    Ok(())
}

fn row_to_project_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Project> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    Ok(Project {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        name: row.get("name"),
        domain: row.get("domain"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

//! SERP snapshot repository
//!
//! Database operations for SERP snapshots. A snapshot is the set of entries
//! for one (keyword, date); re-checks replace the whole set for that day.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::SerpEntry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// SERP snapshot repository trait
#[async_trait]
pub trait SerpRepository: Send + Sync {
    /// Replace a keyword's snapshot for one day (delete-then-insert)
    async fn replace_snapshot(
        &self,
        keyword_id: Uuid,
        date: NaiveDate,
        entries: &[SerpEntry],
    ) -> Result<()>;

    /// The most recent snapshot for a keyword, ordered by position
    async fn latest_snapshot(&self, keyword_id: Uuid) -> Result<Vec<SerpEntry>>;

    /// Drop all snapshots for a keyword (stop tracking)
    async fn delete_by_keyword(&self, keyword_id: Uuid) -> Result<()>;
}

/// SQLx-based SERP snapshot repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSerpRepository {
    pool: DynDatabasePool,
}

impl SqlxSerpRepository {
    /// Create a new SQLx SERP repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SerpRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SerpRepository for SqlxSerpRepository {
    async fn replace_snapshot(
        &self,
        keyword_id: Uuid,
        date: NaiveDate,
        entries: &[SerpEntry],
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                replace_snapshot_sqlite(self.pool.as_sqlite().unwrap(), keyword_id, date, entries)
                    .await
            }
            DatabaseDriver::Mysql => {
                replace_snapshot_mysql(self.pool.as_mysql().unwrap(), keyword_id, date, entries)
                    .await
            }
        }
    }

    async fn latest_snapshot(&self, keyword_id: Uuid) -> Result<Vec<SerpEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                latest_snapshot_sqlite(self.pool.as_sqlite().unwrap(), keyword_id).await
            }
            DatabaseDriver::Mysql => {
                latest_snapshot_mysql(self.pool.as_mysql().unwrap(), keyword_id).await
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

const ENTRY_COLUMNS: &str = "id, keyword_id, position, url, title, domain, snapshot_date, created_at";

const LATEST_SNAPSHOT_SQL: &str = r#"
    SELECT id, keyword_id, position, url, title, domain, snapshot_date, created_at
    FROM serp_entries
    WHERE keyword_id = ?
      AND snapshot_date = (
          SELECT MAX(snapshot_date) FROM serp_entries WHERE keyword_id = ?
      )
    ORDER BY position ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn replace_snapshot_sqlite(
    pool: &SqlitePool,
    keyword_id: Uuid,
    date: NaiveDate,
    entries: &[SerpEntry],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM serp_entries WHERE keyword_id = ? AND snapshot_date = ?")
        .bind(keyword_id.to_string())
        .bind(date)
        .execute(&mut *tx)
        .await
        .context("Failed to clear snapshot")?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO serp_entries (id, keyword_id, position, url, title, domain, snapshot_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.keyword_id.to_string())
        .bind(entry.position)
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(&entry.domain)
        .bind(entry.snapshot_date)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert snapshot entry")?;
    }

    tx.commit().await.context("Failed to commit snapshot")?;
    Ok(())
}

async fn latest_snapshot_sqlite(pool: &SqlitePool, keyword_id: Uuid) -> Result<Vec<SerpEntry>> {
    let rows = sqlx::query(LATEST_SNAPSHOT_SQL)
        .bind(keyword_id.to_string())
        .bind(keyword_id.to_string())
        .fetch_all(pool)
        .await
        .context("Failed to get latest snapshot")?;

    rows.iter().map(row_to_entry_sqlite).collect()
}

async fn delete_by_keyword_sqlite(pool: &SqlitePool, keyword_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM serp_entries WHERE keyword_id = ?")
        .bind(keyword_id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete snapshots")?;

    Ok(())
}

fn row_to_entry_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<SerpEntry> {
    let id: String = row.get("id");
    let keyword_id: String = row.get("keyword_id");
    Ok(SerpEntry {
        id: parse_uuid(&id, "id")?,
        keyword_id: parse_uuid(&keyword_id, "keyword_id")?,
        position: row.get("position"),
        url: row.get("url"),
        title: row.get("title"),
        domain: row.get("domain"),
        snapshot_date: row.get("snapshot_date"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn replace_snapshot_mysql(
    pool: &MySqlPool,
    keyword_id: Uuid,
    date: NaiveDate,
    entries: &[SerpEntry],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM serp_entries WHERE keyword_id = ? AND snapshot_date = ?")
        .bind(keyword_id.to_string())
        .bind(date)
        .execute(&mut *tx)
        .await
        .context("Failed to clear snapshot")?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO serp_entries (id, keyword_id, position, url, title, domain, snapshot_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.keyword_id.to_string())
        .bind(entry.position)
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(&entry.domain)
        .bind(entry.snapshot_date)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert snapshot entry")?;
    }

    tx.commit().await.context("Failed to commit snapshot")?;
    Ok(())
}

async fn latest_snapshot_mysql(pool: &MySqlPool, keyword_id: Uuid) -> Result<Vec<SerpEntry>> {
    let rows = sqlx::query(LATEST_SNAPSHOT_SQL)
        .bind(keyword_id.to_string())
        .bind(keyword_id.to_string())
        .fetch_all(pool)
        .await
        .context("Failed to get latest snapshot")?;

    rows.iter().map(row_to_entry_mysql).collect()
}

async fn delete_by_keyword_mysql(pool: &MySqlPool, keyword_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM serp_entries WHERE keyword_id = ?")
        .bind(keyword_id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete snapshots")?;

    Ok(())
}

fn row_to_entry_mysql(row: &sqlx::mysql::MySqlRow) -> Result<SerpEntry> {
    let id: String = row.get("id");
    let keyword_id: String = row.get("keyword_id");
    Ok(SerpEntry {
        id: parse_uuid(&id, "id")?,
        keyword_id: parse_uuid(&keyword_id, "keyword_id")?,
        position: row.get("position"),
        url: row.get("url"),
        title: row.get("title"),
        domain: row.get("domain"),
        snapshot_date: row.get("snapshot_date"),
        created_at: row.get("created_at"),
    })
}

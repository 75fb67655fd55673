//! Database migrations
//!
//! Code-based migrations embedded directly as SQL strings, with variants for
//! both SQLite and MySQL so the server stays a single binary.
//!
//! Each migration is a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite
//! - `up_mysql`: SQL for MySQL

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    /// Migration version number
    pub version: i64,
    /// Migration name/description
    pub name: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in order. UUIDs are stored as CHAR(36) text so the same
/// bind code works on both drivers.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id CHAR(36) PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255),
                password_hash VARCHAR(255) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id CHAR(36) PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255),
                password_hash VARCHAR(255) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_projects",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS projects (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                name VARCHAR(255) NOT NULL,
                domain VARCHAR(255) NOT NULL,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_projects_user_id ON projects(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS projects (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                name VARCHAR(255) NOT NULL,
                domain VARCHAR(255) NOT NULL,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_projects_user_id ON projects(user_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_keywords",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS keywords (
                id CHAR(36) PRIMARY KEY,
                project_id CHAR(36) NOT NULL,
                keyword VARCHAR(500) NOT NULL,
                location_code BIGINT NOT NULL DEFAULT 2840,
                language_code VARCHAR(10) NOT NULL DEFAULT 'en',
                search_volume BIGINT,
                keyword_difficulty REAL,
                cpc REAL,
                competition REAL,
                last_refreshed_at TIMESTAMP,
                is_tracking BOOLEAN NOT NULL DEFAULT 0,
                tracked_url VARCHAR(1000),
                search_engine VARCHAR(20) NOT NULL DEFAULT 'google',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                UNIQUE (project_id, keyword)
            );
            CREATE INDEX IF NOT EXISTS idx_keywords_project_id ON keywords(project_id);
            CREATE INDEX IF NOT EXISTS idx_keywords_is_tracking ON keywords(is_tracking);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS keywords (
                id CHAR(36) PRIMARY KEY,
                project_id CHAR(36) NOT NULL,
                keyword VARCHAR(500) NOT NULL,
                location_code BIGINT NOT NULL DEFAULT 2840,
                language_code VARCHAR(10) NOT NULL DEFAULT 'en',
                search_volume BIGINT,
                keyword_difficulty DOUBLE,
                cpc DOUBLE,
                competition DOUBLE,
                last_refreshed_at TIMESTAMP NULL,
                is_tracking BOOLEAN NOT NULL DEFAULT 0,
                tracked_url VARCHAR(1000),
                search_engine VARCHAR(20) NOT NULL DEFAULT 'google',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                UNIQUE KEY uq_keywords_project_keyword (project_id, keyword)
            );
            CREATE INDEX idx_keywords_project_id ON keywords(project_id);
            CREATE INDEX idx_keywords_is_tracking ON keywords(is_tracking);
        "#,
    },
    Migration {
        version: 5,
        name: "create_rank_tracking",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS rank_checks (
                id CHAR(36) PRIMARY KEY,
                keyword_id CHAR(36) NOT NULL,
                position BIGINT,
                found_url VARCHAR(1000),
                search_engine VARCHAR(20) NOT NULL DEFAULT 'google',
                origin VARCHAR(20) NOT NULL DEFAULT 'live',
                checked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_rank_checks_keyword_id ON rank_checks(keyword_id);
            CREATE INDEX IF NOT EXISTS idx_rank_checks_checked_at ON rank_checks(checked_at);
            CREATE TABLE IF NOT EXISTS serp_entries (
                id CHAR(36) PRIMARY KEY,
                keyword_id CHAR(36) NOT NULL,
                position BIGINT NOT NULL,
                url VARCHAR(2000) NOT NULL,
                title VARCHAR(1000),
                domain VARCHAR(255),
                snapshot_date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_serp_entries_keyword_date ON serp_entries(keyword_id, snapshot_date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS rank_checks (
                id CHAR(36) PRIMARY KEY,
                keyword_id CHAR(36) NOT NULL,
                position BIGINT,
                found_url VARCHAR(1000),
                search_engine VARCHAR(20) NOT NULL DEFAULT 'google',
                origin VARCHAR(20) NOT NULL DEFAULT 'live',
                checked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_rank_checks_keyword_id ON rank_checks(keyword_id);
            CREATE INDEX idx_rank_checks_checked_at ON rank_checks(checked_at);
            CREATE TABLE IF NOT EXISTS serp_entries (
                id CHAR(36) PRIMARY KEY,
                keyword_id CHAR(36) NOT NULL,
                position BIGINT NOT NULL,
                url VARCHAR(2000) NOT NULL,
                title VARCHAR(1000),
                domain VARCHAR(255),
                snapshot_date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_serp_entries_keyword_date ON serp_entries(keyword_id, snapshot_date);
        "#,
    },
    Migration {
        version: 6,
        name: "create_competitors",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS competitors (
                id CHAR(36) PRIMARY KEY,
                project_id CHAR(36) NOT NULL,
                domain VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                UNIQUE (project_id, domain)
            );
            CREATE INDEX IF NOT EXISTS idx_competitors_project_id ON competitors(project_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS competitors (
                id CHAR(36) PRIMARY KEY,
                project_id CHAR(36) NOT NULL,
                domain VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                UNIQUE KEY uq_competitors_project_domain (project_id, domain)
            );
            CREATE INDEX idx_competitors_project_id ON competitors(project_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_credentials_and_usage",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS api_credentials (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                provider VARCHAR(20) NOT NULL,
                encrypted_payload TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                last_verified_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE (user_id, provider)
            );
            CREATE TABLE IF NOT EXISTS api_usage_log (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                provider VARCHAR(20) NOT NULL,
                endpoint VARCHAR(255) NOT NULL,
                cost REAL NOT NULL DEFAULT 0,
                status BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_api_usage_log_user_id ON api_usage_log(user_id);
            CREATE INDEX IF NOT EXISTS idx_api_usage_log_created_at ON api_usage_log(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS api_credentials (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                provider VARCHAR(20) NOT NULL,
                encrypted_payload TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                last_verified_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE KEY uq_api_credentials_user_provider (user_id, provider)
            );
            CREATE TABLE IF NOT EXISTS api_usage_log (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                provider VARCHAR(20) NOT NULL,
                endpoint VARCHAR(255) NOT NULL,
                cost DOUBLE NOT NULL DEFAULT 0,
                status BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_api_usage_log_user_id ON api_usage_log(user_id);
            CREATE INDEX idx_api_usage_log_created_at ON api_usage_log(created_at);
        "#,
    },
    Migration {
        version: 8,
        name: "create_conversations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                project_id CHAR(36),
                title VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_user_id ON conversations(user_id);
            CREATE TABLE IF NOT EXISTS conversation_messages (
                id CHAR(36) PRIMARY KEY,
                conversation_id CHAR(36) NOT NULL,
                role VARCHAR(20) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_conversation_messages_conversation_id ON conversation_messages(conversation_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id CHAR(36) PRIMARY KEY,
                user_id CHAR(36) NOT NULL,
                project_id CHAR(36),
                title VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_conversations_user_id ON conversations(user_id);
            CREATE TABLE IF NOT EXISTS conversation_messages (
                id CHAR(36) PRIMARY KEY,
                conversation_id CHAR(36) NOT NULL,
                role VARCHAR(20) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_conversation_messages_conversation_id ON conversation_messages(conversation_id);
        "#,
    },
];

/// Run all pending migrations.
///
/// Creates the tracking table if needed, then applies any migration not yet
/// recorded, in version order. Returns the number applied.
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.as_sqlite().unwrap()).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.as_mysql().unwrap()).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            apply_migration_sqlite(pool.as_sqlite().unwrap(), migration).await
        }
        DatabaseDriver::Mysql => apply_migration_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    // Migration SQL may contain multiple statements
    for statement in split_sql_statements(migration.up_sqlite) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.len() > 100 {
        format!("{}...", &sql[..100])
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_migration_versions_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
        }
    }

    #[tokio::test]
    async fn test_users_table_created() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let sqlite_pool = pool.as_sqlite().unwrap();
        let result = sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind("00000000-0000-0000-0000-000000000001")
            .bind("test@example.com")
            .bind("hash123")
            .execute(sqlite_pool)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let sqlite_pool = pool.as_sqlite().unwrap();
        for id in ["00000000-0000-0000-0000-000000000001", "00000000-0000-0000-0000-000000000002"] {
            let result =
                sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind("dup@example.com")
                    .bind("hash")
                    .execute(sqlite_pool)
                    .await;
            if id.ends_with('1') {
                assert!(result.is_ok());
            } else {
                assert!(result.is_err());
            }
        }
    }

    #[tokio::test]
    async fn test_cascade_delete_project_removes_keywords() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let sqlite_pool = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind("u-1")
            .bind("a@example.com")
            .bind("hash")
            .execute(sqlite_pool)
            .await
            .expect("insert user");
        sqlx::query("INSERT INTO projects (id, user_id, name, domain) VALUES (?, ?, ?, ?)")
            .bind("p-1")
            .bind("u-1")
            .bind("Site")
            .bind("example.com")
            .execute(sqlite_pool)
            .await
            .expect("insert project");
        sqlx::query("INSERT INTO keywords (id, project_id, keyword) VALUES (?, ?, ?)")
            .bind("k-1")
            .bind("p-1")
            .bind("rust")
            .execute(sqlite_pool)
            .await
            .expect("insert keyword");

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind("p-1")
            .execute(sqlite_pool)
            .await
            .expect("delete project");

        let row = sqlx::query("SELECT COUNT(*) as cnt FROM keywords")
            .fetch_one(sqlite_pool)
            .await
            .expect("count keywords");
        let count: i64 = row.get("cnt");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n-- comment\nCREATE INDEX idx ON a(id);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE"));
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- just a comment"));
        assert!(!is_comment_only("SELECT 1 -- trailing"));
    }
}

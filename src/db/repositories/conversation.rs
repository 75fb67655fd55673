//! Conversation repository
//!
//! Database operations for assistant conversations and their messages.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ChatMessage, ChatRole, Conversation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// Conversation repository trait
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Create a new conversation
    async fn create(&self, conversation: &Conversation) -> Result<Conversation>;

    /// Get a conversation by ID, restricted to its owner
    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Conversation>>;

    /// List a user's conversations, most recently updated first
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Conversation>>;

    /// Append a message and bump the conversation's updated_at
    async fn add_message(&self, message: &ChatMessage) -> Result<()>;

    /// All messages in a conversation, oldest first
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>>;

    /// Delete a conversation and its messages
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// SQLx-based conversation repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxConversationRepository {
    pool: DynDatabasePool,
}

impl SqlxConversationRepository {
    /// Create a new SQLx conversation repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ConversationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ConversationRepository for SqlxConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_conversation_sqlite(self.pool.as_sqlite().unwrap(), conversation).await
            }
            DatabaseDriver::Mysql => {
                create_conversation_mysql(self.pool.as_mysql().unwrap(), conversation).await
            }
        }
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Conversation>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_conversation_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => {
                get_conversation_mysql(self.pool.as_mysql().unwrap(), id, user_id).await
            }
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_conversations_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                list_conversations_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn add_message(&self, message: &ChatMessage) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_message_sqlite(self.pool.as_sqlite().unwrap(), message).await
            }
            DatabaseDriver::Mysql => {
                add_message_mysql(self.pool.as_mysql().unwrap(), message).await
            }
        }
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_messages_sqlite(self.pool.as_sqlite().unwrap(), conversation_id).await
            }
            DatabaseDriver::Mysql => {
                list_messages_mysql(self.pool.as_mysql().unwrap(), conversation_id).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_conversation_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                delete_conversation_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }
}

const CONVERSATION_COLUMNS: &str = "id, user_id, project_id, title, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_conversation_sqlite(
    pool: &SqlitePool,
    conversation: &Conversation,
) -> Result<Conversation> {
    sqlx::query(
        r#"
        INSERT INTO conversations (id, user_id, project_id, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(conversation.id.to_string())
    .bind(conversation.user_id.to_string())
    .bind(conversation.project_id.map(|id| id.to_string()))
    .bind(&conversation.title)
    .bind(conversation.created_at)
    .bind(conversation.updated_at)
    .execute(pool)
    .await
    .context("Failed to create conversation")?;

    Ok(conversation.clone())
}

async fn get_conversation_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Conversation>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE id = ? AND user_id = ?",
        CONVERSATION_COLUMNS
    ))
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get conversation")?;

    match row {
        Some(row) => Ok(Some(row_to_conversation_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_conversations_sqlite(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Conversation>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE user_id = ? ORDER BY updated_at DESC",
        CONVERSATION_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list conversations")?;

    rows.iter().map(row_to_conversation_sqlite).collect()
}

async fn add_message_sqlite(pool: &SqlitePool, message: &ChatMessage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages (id, conversation_id, role, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.role.to_string())
    .bind(&message.content)
    .bind(message.created_at)
    .execute(pool)
    .await
    .context("Failed to add message")?;

    touch_conversation_sqlite(pool, message.conversation_id, message.created_at).await
}

async fn touch_conversation_sqlite(
    pool: &SqlitePool,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
        .bind(at)
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to touch conversation")?;
    Ok(())
}

async fn list_messages_sqlite(
    pool: &SqlitePool,
    conversation_id: Uuid,
) -> Result<Vec<ChatMessage>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conversation_messages WHERE conversation_id = ? ORDER BY created_at ASC",
        MESSAGE_COLUMNS
    ))
    .bind(conversation_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list messages")?;

    rows.iter().map(row_to_message_sqlite).collect()
}

async fn delete_conversation_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete conversation")?;
    Ok(())
}

fn row_to_conversation_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let project_id: Option<String> = row.get("project_id");
    Ok(Conversation {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        project_id: project_id
            .map(|p| parse_uuid(&p, "project_id"))
            .transpose()?,
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_message_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage> {
    let id: String = row.get("id");
    let conversation_id: String = row.get("conversation_id");
    let role: String = row.get("role");
    Ok(ChatMessage {
        id: parse_uuid(&id, "id")?,
        conversation_id: parse_uuid(&conversation_id, "conversation_id")?,
        role: ChatRole::from_str(&role)?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_conversation_mysql(
    pool: &MySqlPool,
    conversation: &Conversation,
) -> Result<Conversation> {
    sqlx::query(
        r#"
        INSERT INTO conversations (id, user_id, project_id, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(conversation.id.to_string())
    .bind(conversation.user_id.to_string())
    .bind(conversation.project_id.map(|id| id.to_string()))
    .bind(&conversation.title)
    .bind(conversation.created_at)
    .bind(conversation.updated_at)
    .execute(pool)
    .await
    .context("Failed to create conversation")?;

    Ok(conversation.clone())
}

async fn get_conversation_mysql(
    pool: &MySqlPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Conversation>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE id = ? AND user_id = ?",
        CONVERSATION_COLUMNS
    ))
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get conversation")?;

    match row {
        Some(row) => Ok(Some(row_to_conversation_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_conversations_mysql(pool: &MySqlPool, user_id: Uuid) -> Result<Vec<Conversation>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conversations WHERE user_id = ? ORDER BY updated_at DESC",
        CONVERSATION_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list conversations")?;

    rows.iter().map(row_to_conversation_mysql).collect()
}

async fn add_message_mysql(pool: &MySqlPool, message: &ChatMessage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages (id, conversation_id, role, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.role.to_string())
    .bind(&message.content)
    .bind(message.created_at)
    .execute(pool)
    .await
    .context("Failed to add message")?;

    sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
        .bind(message.created_at)
        .bind(message.conversation_id.to_string())
        .execute(pool)
        .await
        .context("Failed to touch conversation")?;

    Ok(())
}

async fn list_messages_mysql(
    pool: &MySqlPool,
    conversation_id: Uuid,
) -> Result<Vec<ChatMessage>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conversation_messages WHERE conversation_id = ? ORDER BY created_at ASC",
        MESSAGE_COLUMNS
    ))
    .bind(conversation_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list messages")?;

    rows.iter().map(row_to_message_mysql).collect()
}

async fn delete_conversation_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete conversation")?;
    Ok(())
}

fn row_to_conversation_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Conversation> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let project_id: Option<String> = row.get("project_id");
    Ok(Conversation {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        project_id: project_id
            .map(|p| parse_uuid(&p, "project_id"))
            .transpose()?,
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_message_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ChatMessage> {
    let id: String = row.get("id");
    let conversation_id: String = row.get("conversation_id");
    let role: String = row.get("role");
    Ok(ChatMessage {
        id: parse_uuid(&id, "id")?,
        conversation_id: parse_uuid(&conversation_id, "conversation_id")?,
        role: ChatRole::from_str(&role)?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (SqlxConversationRepository, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = User::new("owner@example.com".to_string(), "hash".to_string(), None);
        users.create(&user).await.expect("Failed to create user");

        (SqlxConversationRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_and_get_conversation() {
        let (repo, user_id) = setup().await;

        let conv = Conversation::new(user_id, None, Some("SEO questions".to_string()));
        repo.create(&conv).await.expect("Failed to create conversation");

        let found = repo
            .get_for_user(conv.id, user_id)
            .await
            .expect("Failed to get conversation")
            .expect("Conversation not found");
        assert_eq!(found.title.as_deref(), Some("SEO questions"));

        // Another user can't see it
        assert!(repo
            .get_for_user(conv.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_messages_ordered_and_touch() {
        let (repo, user_id) = setup().await;

        let conv = Conversation::new(user_id, None, None);
        repo.create(&conv).await.expect("Failed to create conversation");

        let mut question = ChatMessage::new(conv.id, ChatRole::User, "How do I rank?".to_string());
        question.created_at = Utc::now() - chrono::Duration::seconds(5);
        let answer = ChatMessage::new(conv.id, ChatRole::Assistant, "Content and links.".to_string());

        repo.add_message(&question).await.expect("Failed to add message");
        repo.add_message(&answer).await.expect("Failed to add message");

        let messages = repo.list_messages(conv.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);

        let refreshed = repo.get_for_user(conv.id, user_id).await.unwrap().unwrap();
        assert!(refreshed.updated_at >= conv.updated_at);
    }

    #[tokio::test]
    async fn test_delete_cascades_messages() {
        let (repo, user_id) = setup().await;

        let conv = Conversation::new(user_id, None, None);
        repo.create(&conv).await.expect("Failed to create conversation");
        repo.add_message(&ChatMessage::new(conv.id, ChatRole::User, "hi".to_string()))
            .await
            .expect("Failed to add message");

        repo.delete(conv.id).await.expect("Failed to delete");

        assert!(repo.get_for_user(conv.id, user_id).await.unwrap().is_none());
        assert!(repo.list_messages(conv.id).await.unwrap().is_empty());
    }
}

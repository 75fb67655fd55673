//! AI assistant conversation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A persisted assistant conversation, optionally tied to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Project whose context is folded into the system prompt
    pub project_id: Option<Uuid>,
    /// Title, derived from the first user message
    pub title: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: Uuid, project_id: Option<Uuid>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            project_id,
            title,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One message within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier
    pub id: Uuid,
    /// Owning conversation
    pub conversation_id: Uuid,
    /// Who authored the message
    pub role: ChatRole,
    /// Message text
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(conversation_id: Uuid, role: ChatRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Message author role, matching the wire format of the Messages API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "system" => Ok(ChatRole::System),
            _ => Err(anyhow::anyhow!("Invalid chat role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_round_trip() {
        assert_eq!(ChatRole::from_str("user").unwrap(), ChatRole::User);
        assert_eq!(
            ChatRole::from_str("Assistant").unwrap(),
            ChatRole::Assistant
        );
        assert!(ChatRole::from_str("tool").is_err());
    }

    #[test]
    fn test_conversation_new() {
        let user_id = Uuid::new_v4();
        let conv = Conversation::new(user_id, None, Some("First question".to_string()));
        assert_eq!(conv.user_id, user_id);
        assert!(conv.project_id.is_none());
    }
}

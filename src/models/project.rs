//! Project model
//!
//! A project is a tracked website owned by a user. Keywords, competitors,
//! and rank history all hang off a project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Tracked domain (e.g. "example.com")
    pub domain: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(user_id: Uuid, name: String, domain: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            domain,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Input for updating a project; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
}

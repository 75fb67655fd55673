//! Competitor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Competitor domain tracked against a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    /// Unique identifier
    pub id: Uuid,
    /// Owning project
    pub project_id: Uuid,
    /// Competitor domain, lowercased (unique per project)
    pub domain: String,
    /// Optional display name
    pub name: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Competitor {
    pub fn new(project_id: Uuid, domain: String, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            domain: domain.to_lowercase(),
            name,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_competitor_domain_lowercased() {
        let c = Competitor::new(Uuid::new_v4(), "Example.COM".to_string(), None);
        assert_eq!(c.domain, "example.com");
    }
}

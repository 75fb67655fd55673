//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod competitor;
pub mod conversation;
pub mod credential;
pub mod keyword;
pub mod project;
pub mod rank;
pub mod serp;
pub mod session;
pub mod usage;
pub mod user;

pub use competitor::{CompetitorRepository, SqlxCompetitorRepository};
pub use conversation::{ConversationRepository, SqlxConversationRepository};
pub use credential::{CredentialRepository, SqlxCredentialRepository};
pub use keyword::{KeywordRepository, SqlxKeywordRepository};
pub use project::{ProjectRepository, SqlxProjectRepository};
pub use rank::{RankCheckRepository, SqlxRankCheckRepository};
pub use serp::{SerpRepository, SqlxSerpRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use usage::{SqlxUsageRepository, UsageRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};
use uuid::Uuid;

/// Parse a CHAR(36) column back into a Uuid
pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid UUID in column {}: {}", column, value))
}

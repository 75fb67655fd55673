//! Data models
//!
//! This module contains all data structures used throughout serptrack.
//! Models represent:
//! - Database entities (User, Session, Project, Keyword, RankCheck, SerpEntry,
//!   Competitor, ApiCredential, UsageRecord, Conversation, ChatMessage)
//! - Internal data transfer objects

mod competitor;
mod conversation;
mod credential;
mod keyword;
mod project;
mod rank;
mod serp;
mod session;
mod usage;
mod user;

pub use competitor::Competitor;
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use credential::{ApiCredential, CredentialPayload, Provider};
pub use keyword::{Keyword, KeywordMetrics, SearchEngine};
pub use project::{CreateProjectInput, Project, UpdateProjectInput};
pub use rank::{CheckOrigin, RankCheck, RankHistoryPoint};
pub use serp::SerpEntry;
pub use session::Session;
pub use usage::{UsageRecord, UsageSummary};
pub use user::{CreateUserInput, User};

//! Services layer - Business logic
//!
//! This module contains all business logic for the rank-tracking platform.
//! Services are responsible for:
//! - Implementing business rules and ownership checks
//! - Coordinating repositories and provider clients
//! - Handling validation and error cases

pub mod assistant;
pub mod claude;
pub mod competitor;
pub mod credentials;
pub mod crypto;
pub mod dataforseo;
pub mod keyword;
pub mod password;
pub mod project;
pub mod rank;
pub mod rate_limiter;
pub mod usage;
pub mod user;

pub use assistant::{AssistantService, AssistantServiceError, ChatInput, ChatReply};
pub use claude::{ClaudeClient, ClaudeMessage, ClaudeResponse};
pub use competitor::{CompetitorService, CompetitorServiceError, KeywordOverlap};
pub use credentials::{CredentialService, CredentialServiceError, CredentialStatus};
pub use crypto::CredentialCipher;
pub use dataforseo::{DataForSeoClient, ProviderError};
pub use keyword::{BulkAddResult, KeywordService, KeywordServiceError, RefreshEstimate};
pub use password::{hash_password, verify_password};
pub use project::{ProjectService, ProjectServiceError};
pub use rank::{
    EnableTrackingInput, ProjectOverview, RankServiceError, RankTrackingService, TrackedKeyword,
};
pub use rate_limiter::LoginRateLimiter;
pub use usage::UsageService;
pub use user::{UserService, UserServiceError};

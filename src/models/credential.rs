//! Provider credential model
//!
//! Secrets are encrypted before they reach the repository layer; this model
//! only ever carries the ciphertext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stored provider credentials for a user (one active row per provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredential {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Which provider the credentials are for
    pub provider: Provider,
    /// AES-256-GCM sealed credential payload, base64
    #[serde(skip_serializing)]
    pub encrypted_payload: String,
    /// Whether the row is usable (delete deactivates instead of removing)
    pub is_active: bool,
    /// When the credentials last passed provider verification
    pub last_verified_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ApiCredential {
    pub fn new(user_id: Uuid, provider: Provider, encrypted_payload: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider,
            encrypted_payload,
            is_active: true,
            last_verified_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Supported external providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// DataForSEO (keyword metrics, SERP, backlinks)
    Dataforseo,
    /// Anthropic (AI analysis and chat)
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Dataforseo => write!(f, "dataforseo"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dataforseo" => Ok(Provider::Dataforseo),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(anyhow::anyhow!("Invalid provider: {}", s)),
        }
    }
}

/// Decrypted credential payload, serialized to JSON before sealing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialPayload {
    /// DataForSEO uses basic auth
    Dataforseo { login: String, password: String },
    /// Anthropic uses an API key header
    Anthropic { api_key: String },
}

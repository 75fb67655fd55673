//! Credential service
//!
//! Stores per-user provider credentials. Secrets are verified against the
//! provider before saving, sealed with AES-256-GCM at rest, and decrypted on
//! demand to build ready-to-use API clients.

use crate::config::ProviderConfig;
use crate::db::repositories::CredentialRepository;
use crate::models::{ApiCredential, CredentialPayload, Provider};
use crate::services::claude::ClaudeClient;
use crate::services::crypto::CredentialCipher;
use crate::services::dataforseo::{DataForSeoClient, ProviderError};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for credential operations
#[derive(Debug, thiserror::Error)]
pub enum CredentialServiceError {
    /// No active credentials stored for this provider
    #[error("No {0} credentials configured. Add them under settings/credentials first.")]
    NotConfigured(Provider),

    /// Payload does not match the provider
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The provider rejected the credentials or the call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Stored-credential status safe to return to clients
#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub provider: Provider,
    pub configured: bool,
    pub last_verified_at: Option<DateTime<Utc>>,
}

/// Credential service
pub struct CredentialService {
    credential_repo: Arc<dyn CredentialRepository>,
    cipher: CredentialCipher,
    providers: ProviderConfig,
}

impl CredentialService {
    pub fn new(
        credential_repo: Arc<dyn CredentialRepository>,
        cipher: CredentialCipher,
        providers: ProviderConfig,
    ) -> Self {
        Self {
            credential_repo,
            cipher,
            providers,
        }
    }

    /// Verify credentials against the provider, then seal and upsert them
    pub async fn save(
        &self,
        user_id: Uuid,
        provider: Provider,
        payload: CredentialPayload,
    ) -> Result<CredentialStatus, CredentialServiceError> {
        validate_payload(provider, &payload)?;
        self.verify_with_provider(provider, &payload).await?;
        self.store(user_id, provider, &payload).await
    }

    /// Report whether credentials exist without revealing secrets
    pub async fn check(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<CredentialStatus, CredentialServiceError> {
        let credential = self
            .credential_repo
            .get_active(user_id, provider)
            .await
            .context("Failed to look up credentials")?;

        Ok(match credential {
            Some(c) => CredentialStatus {
                provider,
                configured: true,
                last_verified_at: c.last_verified_at,
            },
            None => CredentialStatus {
                provider,
                configured: false,
                last_verified_at: None,
            },
        })
    }

    /// Deactivate stored credentials. Returns false when none were active.
    pub async fn delete(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<bool, CredentialServiceError> {
        let removed = self
            .credential_repo
            .deactivate(user_id, provider)
            .await
            .context("Failed to deactivate credentials")?;

        Ok(removed)
    }

    /// Build a DataForSEO client from the user's stored credentials
    pub async fn dataforseo_client(
        &self,
        user_id: Uuid,
    ) -> Result<DataForSeoClient, CredentialServiceError> {
        match self.open_payload(user_id, Provider::Dataforseo).await? {
            CredentialPayload::Dataforseo { login, password } => Ok(DataForSeoClient::new(
                &self.providers.dataforseo.base_url,
                &login,
                &password,
            )?),
            _ => Err(CredentialServiceError::ValidationError(
                "Stored credentials do not match the provider".to_string(),
            )),
        }
    }

    /// Build a Claude client from the user's stored credentials
    pub async fn claude_client(
        &self,
        user_id: Uuid,
    ) -> Result<ClaudeClient, CredentialServiceError> {
        match self.open_payload(user_id, Provider::Anthropic).await? {
            CredentialPayload::Anthropic { api_key } => Ok(ClaudeClient::new(
                &self.providers.anthropic.base_url,
                &api_key,
                &self.providers.anthropic.model,
            )?),
            _ => Err(CredentialServiceError::ValidationError(
                "Stored credentials do not match the provider".to_string(),
            )),
        }
    }

    /// Seal and upsert a payload without contacting the provider
    async fn store(
        &self,
        user_id: Uuid,
        provider: Provider,
        payload: &CredentialPayload,
    ) -> Result<CredentialStatus, CredentialServiceError> {
        let plaintext =
            serde_json::to_string(payload).context("Failed to serialize credential payload")?;
        let sealed = self.cipher.seal(&plaintext)?;

        let credential = ApiCredential::new(user_id, provider, sealed);
        self.credential_repo
            .upsert(&credential)
            .await
            .context("Failed to save credentials")?;

        Ok(CredentialStatus {
            provider,
            configured: true,
            last_verified_at: credential.last_verified_at,
        })
    }

    /// Fetch and decrypt the active payload for a provider
    async fn open_payload(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<CredentialPayload, CredentialServiceError> {
        let credential = self
            .credential_repo
            .get_active(user_id, provider)
            .await
            .context("Failed to look up credentials")?
            .ok_or(CredentialServiceError::NotConfigured(provider))?;

        let plaintext = self.cipher.open(&credential.encrypted_payload)?;
        let payload: CredentialPayload =
            serde_json::from_str(&plaintext).context("Failed to parse credential payload")?;

        Ok(payload)
    }

    async fn verify_with_provider(
        &self,
        provider: Provider,
        payload: &CredentialPayload,
    ) -> Result<(), CredentialServiceError> {
        match (provider, payload) {
            (Provider::Dataforseo, CredentialPayload::Dataforseo { login, password }) => {
                let client =
                    DataForSeoClient::new(&self.providers.dataforseo.base_url, login, password)?;
                client.verify().await?;
            }
            (Provider::Anthropic, CredentialPayload::Anthropic { api_key }) => {
                let client = ClaudeClient::new(
                    &self.providers.anthropic.base_url,
                    api_key,
                    &self.providers.anthropic.model,
                )?;
                client.verify().await?;
            }
            _ => {
                return Err(CredentialServiceError::ValidationError(
                    "Credential payload does not match the provider".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// Reject payloads whose shape does not match the provider
fn validate_payload(
    provider: Provider,
    payload: &CredentialPayload,
) -> Result<(), CredentialServiceError> {
    let matches = matches!(
        (provider, payload),
        (Provider::Dataforseo, CredentialPayload::Dataforseo { .. })
            | (Provider::Anthropic, CredentialPayload::Anthropic { .. })
    );

    if !matches {
        return Err(CredentialServiceError::ValidationError(format!(
            "Credential payload does not match provider '{}'",
            provider
        )));
    }

    match payload {
        CredentialPayload::Dataforseo { login, password } => {
            if login.trim().is_empty() || password.trim().is_empty() {
                return Err(CredentialServiceError::ValidationError(
                    "DataForSEO login and password cannot be empty".to_string(),
                ));
            }
        }
        CredentialPayload::Anthropic { api_key } => {
            if api_key.trim().is_empty() {
                return Err(CredentialServiceError::ValidationError(
                    "Anthropic API key cannot be empty".to_string(),
                ));
            }
        }
    }

    Ok(())
}

//! Usage tracking service
//!
//! Appends a log row for every billable provider call and aggregates
//! per-user spend. Logging failures are swallowed with a warning so a
//! bookkeeping problem never fails the triggering request.

use crate::db::repositories::UsageRepository;
use crate::models::{Provider, UsageRecord, UsageSummary};
use anyhow::{Context, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Number of recent entries included in a summary
const RECENT_ENTRIES: i64 = 20;

/// Usage tracking service
pub struct UsageService {
    usage_repo: Arc<dyn UsageRepository>,
}

impl UsageService {
    pub fn new(usage_repo: Arc<dyn UsageRepository>) -> Self {
        Self { usage_repo }
    }

    /// Record a billable provider call, best-effort
    pub async fn log(
        &self,
        user_id: Uuid,
        provider: Provider,
        endpoint: &str,
        cost: f64,
        status: Option<i64>,
    ) {
        let record = UsageRecord::new(user_id, provider, endpoint, cost, status);
        if let Err(e) = self.usage_repo.create(&record).await {
            tracing::warn!(
                provider = %provider,
                endpoint,
                "Failed to record API usage: {:#}",
                e
            );
        }
    }

    /// Total spend and recent entries for a user
    pub async fn summary(&self, user_id: Uuid) -> Result<UsageSummary> {
        let (total_cost, total_calls) = self
            .usage_repo
            .totals_for_user(user_id)
            .await
            .context("Failed to aggregate usage")?;

        let recent = self
            .usage_repo
            .list_recent(user_id, RECENT_ENTRIES)
            .await
            .context("Failed to list recent usage")?;

        Ok(UsageSummary {
            total_cost,
            total_calls,
            recent,
        })
    }
}

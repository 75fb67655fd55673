//! API usage log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Provider;

/// One billable provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique identifier
    pub id: Uuid,
    /// User whose credentials were billed
    pub user_id: Uuid,
    /// Provider that was called
    pub provider: Provider,
    /// Provider endpoint path
    pub endpoint: String,
    /// Estimated cost in USD
    pub cost: f64,
    /// HTTP status returned by the provider
    pub status: Option<i64>,
    /// When the call happened
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        user_id: Uuid,
        provider: Provider,
        endpoint: impl Into<String>,
        cost: f64,
        status: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider,
            endpoint: endpoint.into(),
            cost,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated usage for one user
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    /// Total estimated cost across all calls
    pub total_cost: f64,
    /// Number of logged calls
    pub total_calls: i64,
    /// Most recent entries, newest first
    pub recent: Vec<UsageRecord>,
}

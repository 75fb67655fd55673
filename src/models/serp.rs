//! SERP snapshot model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One organic result from a SERP snapshot.
///
/// Snapshots are keyed by (keyword, snapshot_date); re-checking a keyword on
/// the same day replaces that day's entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Keyword the snapshot belongs to
    pub keyword_id: Uuid,
    /// Organic position (1-based)
    pub position: i64,
    /// Result URL
    pub url: String,
    /// Result title
    pub title: Option<String>,
    /// Result domain, lowercased
    pub domain: Option<String>,
    /// Day the snapshot was taken (UTC)
    pub snapshot_date: NaiveDate,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl SerpEntry {
    pub fn new(
        keyword_id: Uuid,
        position: i64,
        url: String,
        title: Option<String>,
        domain: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            keyword_id,
            position,
            url,
            title,
            domain,
            snapshot_date: now.date_naive(),
            created_at: now,
        }
    }
}

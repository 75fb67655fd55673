//! Rank check model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::SearchEngine;

/// One recorded rank check for a tracked keyword.
///
/// `position` is absent when the tracked URL did not appear within the
/// requested SERP depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankCheck {
    /// Unique identifier
    pub id: Uuid,
    /// Checked keyword
    pub keyword_id: Uuid,
    /// Position in organic results (1-based), None if unranked
    pub position: Option<i64>,
    /// The actual result URL that matched the tracked URL
    pub found_url: Option<String>,
    /// Search engine queried
    pub search_engine: SearchEngine,
    /// What initiated the check
    pub origin: CheckOrigin,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

impl RankCheck {
    pub fn new(
        keyword_id: Uuid,
        position: Option<i64>,
        found_url: Option<String>,
        search_engine: SearchEngine,
        origin: CheckOrigin,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyword_id,
            position,
            found_url,
            search_engine,
            origin,
            checked_at: Utc::now(),
        }
    }
}

/// What initiated a rank check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOrigin {
    /// User-initiated (enable tracking or check-now)
    Live,
    /// Background scheduler sweep
    Scheduled,
}

impl fmt::Display for CheckOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOrigin::Live => write!(f, "live"),
            CheckOrigin::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for CheckOrigin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(CheckOrigin::Live),
            "scheduled" => Ok(CheckOrigin::Scheduled),
            _ => Err(anyhow::anyhow!("Invalid check origin: {}", s)),
        }
    }
}

/// Daily average position over a history window
#[derive(Debug, Clone, Serialize)]
pub struct RankHistoryPoint {
    /// Day (UTC)
    pub date: chrono::NaiveDate,
    /// Average position across that day's checks, None if all were unranked
    pub average_position: Option<f64>,
    /// Number of checks that day
    pub checks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_check_unranked() {
        let check = RankCheck::new(
            Uuid::new_v4(),
            None,
            None,
            SearchEngine::Google,
            CheckOrigin::Live,
        );
        assert!(check.position.is_none());
        assert_eq!(check.origin, CheckOrigin::Live);
    }

    #[test]
    fn test_check_origin_round_trip() {
        assert_eq!(CheckOrigin::from_str("live").unwrap(), CheckOrigin::Live);
        assert_eq!(
            CheckOrigin::from_str("SCHEDULED").unwrap(),
            CheckOrigin::Scheduled
        );
        assert!(CheckOrigin::from_str("cron").is_err());
    }
}

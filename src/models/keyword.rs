//! Keyword model
//!
//! Keywords belong to a project. Metric fields are populated lazily from the
//! provider; tracking fields are set when rank tracking is enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Keyword entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    /// Unique identifier
    pub id: Uuid,
    /// Owning project
    pub project_id: Uuid,
    /// The keyword phrase itself
    pub keyword: String,
    /// DataForSEO location code (2840 = United States)
    pub location_code: i64,
    /// Language code (e.g. "en")
    pub language_code: String,
    /// Monthly search volume
    pub search_volume: Option<i64>,
    /// Keyword difficulty score (0-100)
    pub keyword_difficulty: Option<f64>,
    /// Cost per click in USD
    pub cpc: Option<f64>,
    /// Paid competition level (0.0-1.0)
    pub competition: Option<f64>,
    /// When metrics were last fetched
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Whether rank tracking is enabled
    pub is_tracking: bool,
    /// URL to look for in SERP results when tracking
    pub tracked_url: Option<String>,
    /// Search engine used for rank checks
    pub search_engine: SearchEngine,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Keyword {
    pub fn new(project_id: Uuid, keyword: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            keyword,
            location_code: 2840,
            language_code: "en".to_string(),
            search_volume: None,
            keyword_difficulty: None,
            cpc: None,
            competition: None,
            last_refreshed_at: None,
            is_tracking: false,
            tracked_url: None,
            search_engine: SearchEngine::Google,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether metric fields have ever been populated
    pub fn has_metrics(&self) -> bool {
        self.last_refreshed_at.is_some()
    }
}

/// Metric values fetched from the provider for one keyword
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetrics {
    pub search_volume: Option<i64>,
    pub keyword_difficulty: Option<f64>,
    pub cpc: Option<f64>,
    pub competition: Option<f64>,
}

/// Search engine used for rank checks.
///
/// Only Google is queried today; the column exists so history stays
/// attributable if more engines are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchEngine::Google => write!(f, "google"),
        }
    }
}

impl FromStr for SearchEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            _ => Err(anyhow::anyhow!("Invalid search engine: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_new_defaults() {
        let kw = Keyword::new(Uuid::new_v4(), "rust web framework".to_string());
        assert_eq!(kw.location_code, 2840);
        assert_eq!(kw.language_code, "en");
        assert!(!kw.is_tracking);
        assert!(!kw.has_metrics());
        assert_eq!(kw.search_engine, SearchEngine::Google);
    }

    #[test]
    fn test_search_engine_round_trip() {
        assert_eq!(SearchEngine::Google.to_string(), "google");
        assert_eq!(
            SearchEngine::from_str("Google").unwrap(),
            SearchEngine::Google
        );
        assert!(SearchEngine::from_str("altavista").is_err());
    }
}

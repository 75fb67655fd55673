//! Rank tracking service
//!
//! Owns the tracking lifecycle for keywords: enabling with an initial SERP
//! fetch, live and scheduled checks, daily history, snapshots, and project
//! overview stats. Checks are billed to the usage log at a lower rate when
//! they come from the scheduler.

use crate::db::repositories::{
    KeywordRepository, ProjectRepository, RankCheckRepository, SerpRepository,
};
use crate::models::{
    CheckOrigin, Keyword, Provider, RankCheck, RankHistoryPoint, SearchEngine, SerpEntry,
};
use crate::services::dataforseo::{DataForSeoClient, ProviderError, SerpItem};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::usage::UsageService;

/// Cost of a user-triggered SERP check
const LIVE_CHECK_COST: f64 = 0.002;

/// Cost of a scheduler-triggered SERP check
const SCHEDULED_CHECK_COST: f64 = 0.0006;

/// Endpoint name used in the usage log
const SERP_ENDPOINT: &str = "serp/google/organic/live/advanced";

/// Default history window in days
const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Error types for rank tracking operations
#[derive(Debug, thiserror::Error)]
pub enum RankServiceError {
    /// Project or keyword missing, or owned by another user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Tracking already enabled for this keyword and URL
    #[error("Tracking is already enabled for this keyword and URL")]
    AlreadyTracking,

    /// Provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for enabling tracking on a keyword
#[derive(Debug, Clone, Deserialize)]
pub struct EnableTrackingInput {
    pub tracked_url: String,
    #[serde(default)]
    pub search_engine: Option<SearchEngine>,
    #[serde(default)]
    pub location_code: Option<i64>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// A tracked keyword with its most recent check
#[derive(Debug, Serialize)]
pub struct TrackedKeyword {
    #[serde(flatten)]
    pub keyword: Keyword,
    pub latest_check: Option<RankCheck>,
}

/// Position distribution for a project's tracked keywords
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ProjectOverview {
    pub total_tracked: usize,
    pub average_position: Option<f64>,
    pub top_3: usize,
    pub top_10: usize,
    pub top_20: usize,
    pub below_20: usize,
}

/// Rank tracking service
pub struct RankTrackingService {
    project_repo: Arc<dyn ProjectRepository>,
    keyword_repo: Arc<dyn KeywordRepository>,
    rank_repo: Arc<dyn RankCheckRepository>,
    serp_repo: Arc<dyn SerpRepository>,
    usage: Arc<UsageService>,
    serp_depth: u32,
}

impl RankTrackingService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        keyword_repo: Arc<dyn KeywordRepository>,
        rank_repo: Arc<dyn RankCheckRepository>,
        serp_repo: Arc<dyn SerpRepository>,
        usage: Arc<UsageService>,
        serp_depth: u32,
    ) -> Self {
        Self {
            project_repo,
            keyword_repo,
            rank_repo,
            serp_repo,
            usage,
            serp_depth,
        }
    }

    /// Enable tracking for a keyword and run the initial check
    pub async fn enable_tracking(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
        input: EnableTrackingInput,
        client: &DataForSeoClient,
    ) -> Result<RankCheck, RankServiceError> {
        let mut keyword = self.require_keyword(user_id, project_id, keyword_id).await?;

        let tracked_url = input.tracked_url.trim().to_string();
        if tracked_url.is_empty() {
            return Err(RankServiceError::ValidationError(
                "Tracked URL cannot be empty".to_string(),
            ));
        }

        if keyword.is_tracking && keyword.tracked_url.as_deref() == Some(tracked_url.as_str()) {
            return Err(RankServiceError::AlreadyTracking);
        }

        keyword.is_tracking = true;
        keyword.tracked_url = Some(tracked_url);
        if let Some(engine) = input.search_engine {
            keyword.search_engine = engine;
        }
        if let Some(location_code) = input.location_code {
            keyword.location_code = location_code;
        }
        if let Some(language_code) = input.language_code {
            keyword.language_code = language_code;
        }
        keyword.updated_at = Utc::now();

        // Run the initial check first; tracking state is only persisted once
        // the provider call succeeds, so a failed fetch leaves the keyword
        // untracked instead of queued for the scheduler with no baseline.
        let check = self
            .run_check(user_id, &keyword, client, CheckOrigin::Live)
            .await?;

        self.keyword_repo
            .update_tracking(&keyword)
            .await
            .context("Failed to enable tracking")?;

        Ok(check)
    }

    /// Fetch the SERP for a tracked keyword and record the result
    ///
    /// Also used by the scheduler, which passes `CheckOrigin::Scheduled`.
    pub async fn run_check(
        &self,
        owner_id: Uuid,
        keyword: &Keyword,
        client: &DataForSeoClient,
        origin: CheckOrigin,
    ) -> Result<RankCheck, RankServiceError> {
        let tracked_url = keyword
            .tracked_url
            .as_deref()
            .ok_or_else(|| {
                RankServiceError::ValidationError(
                    "Keyword has no tracked URL".to_string(),
                )
            })?;

        let items = client
            .serp_organic(
                &keyword.keyword,
                keyword.location_code,
                &keyword.language_code,
                self.serp_depth,
            )
            .await?;

        let cost = match origin {
            CheckOrigin::Live => LIVE_CHECK_COST,
            CheckOrigin::Scheduled => SCHEDULED_CHECK_COST,
        };
        self.usage
            .log(owner_id, Provider::Dataforseo, SERP_ENDPOINT, cost, Some(200))
            .await;

        let found = find_position(&items, tracked_url);
        let check = RankCheck::new(
            keyword.id,
            found.as_ref().map(|(position, _)| *position),
            found.map(|(_, url)| url),
            keyword.search_engine,
            origin,
        );

        let check = self
            .rank_repo
            .create(&check)
            .await
            .context("Failed to record rank check")?;

        let entries: Vec<SerpEntry> = items
            .into_iter()
            .map(|item| SerpEntry::new(keyword.id, item.position, item.url, item.title, item.domain))
            .collect();
        let snapshot_date = Utc::now().date_naive();
        self.serp_repo
            .replace_snapshot(keyword.id, snapshot_date, &entries)
            .await
            .context("Failed to store SERP snapshot")?;

        Ok(check)
    }

    /// Run a user-triggered check for a tracked keyword
    pub async fn check_now(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
        client: &DataForSeoClient,
    ) -> Result<RankCheck, RankServiceError> {
        let keyword = self.require_keyword(user_id, project_id, keyword_id).await?;
        if !keyword.is_tracking {
            return Err(RankServiceError::ValidationError(
                "Tracking is not enabled for this keyword".to_string(),
            ));
        }

        self.run_check(user_id, &keyword, client, CheckOrigin::Live)
            .await
    }

    /// List the project's tracked keywords with their latest checks
    pub async fn list_tracked(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<TrackedKeyword>, RankServiceError> {
        self.require_project(user_id, project_id).await?;

        let keywords = self
            .keyword_repo
            .list_by_project(project_id)
            .await
            .context("Failed to list keywords")?;

        let latest = self
            .rank_repo
            .latest_per_keyword(project_id)
            .await
            .context("Failed to load latest checks")?;
        let mut latest_by_keyword: std::collections::HashMap<Uuid, RankCheck> =
            latest.into_iter().map(|c| (c.keyword_id, c)).collect();

        Ok(keywords
            .into_iter()
            .filter(|k| k.is_tracking)
            .map(|keyword| {
                let latest_check = latest_by_keyword.remove(&keyword.id);
                TrackedKeyword {
                    keyword,
                    latest_check,
                }
            })
            .collect())
    }

    /// Daily average position over the last `days` days (default 30)
    pub async fn history(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
        days: Option<i64>,
    ) -> Result<Vec<RankHistoryPoint>, RankServiceError> {
        self.require_keyword(user_id, project_id, keyword_id).await?;

        let days = days.unwrap_or(DEFAULT_HISTORY_DAYS).clamp(1, 365);
        let since = Utc::now() - Duration::days(days);

        let checks = self
            .rank_repo
            .list_since(keyword_id, since)
            .await
            .context("Failed to load rank history")?;

        Ok(daily_history(&checks))
    }

    /// Latest stored SERP snapshot for a keyword
    pub async fn latest_serp(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Vec<SerpEntry>, RankServiceError> {
        self.require_keyword(user_id, project_id, keyword_id).await?;

        let entries = self
            .serp_repo
            .latest_snapshot(keyword_id)
            .await
            .context("Failed to load SERP snapshot")?;

        Ok(entries)
    }

    /// Disable tracking and delete the keyword's checks and snapshots
    pub async fn stop_tracking(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<(), RankServiceError> {
        let mut keyword = self.require_keyword(user_id, project_id, keyword_id).await?;
        if !keyword.is_tracking {
            return Err(RankServiceError::ValidationError(
                "Tracking is not enabled for this keyword".to_string(),
            ));
        }

        self.rank_repo
            .delete_by_keyword(keyword_id)
            .await
            .context("Failed to delete rank checks")?;
        self.serp_repo
            .delete_by_keyword(keyword_id)
            .await
            .context("Failed to delete SERP snapshots")?;

        keyword.is_tracking = false;
        keyword.tracked_url = None;
        keyword.updated_at = Utc::now();
        self.keyword_repo
            .update_tracking(&keyword)
            .await
            .context("Failed to disable tracking")?;

        Ok(())
    }

    /// Position distribution across the project's tracked keywords
    pub async fn overview(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectOverview, RankServiceError> {
        let tracked = self.list_tracked(user_id, project_id).await?;
        Ok(summarize_positions(&tracked))
    }

    async fn require_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<(), RankServiceError> {
        self.project_repo
            .get_for_user(project_id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(RankServiceError::NotFound("Project"))?;
        Ok(())
    }

    async fn require_keyword(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Keyword, RankServiceError> {
        self.require_project(user_id, project_id).await?;

        self.keyword_repo
            .get_for_project(keyword_id, project_id)
            .await
            .context("Failed to get keyword")?
            .ok_or(RankServiceError::NotFound("Keyword"))
    }
}

/// First organic result whose URL contains the tracked URL
fn find_position(items: &[SerpItem], tracked_url: &str) -> Option<(i64, String)> {
    let needle = tracked_url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/');

    items
        .iter()
        .find(|item| item.url.contains(needle))
        .map(|item| (item.position, item.url.clone()))
}

/// Collapse checks into one point per day with the average ranked position
fn daily_history(checks: &[RankCheck]) -> Vec<RankHistoryPoint> {
    let mut by_day: BTreeMap<chrono::NaiveDate, (Vec<i64>, i64)> = BTreeMap::new();

    for check in checks {
        let entry = by_day.entry(check.checked_at.date_naive()).or_default();
        if let Some(position) = check.position {
            entry.0.push(position);
        }
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (positions, checks))| RankHistoryPoint {
            date,
            average_position: if positions.is_empty() {
                None
            } else {
                Some(positions.iter().sum::<i64>() as f64 / positions.len() as f64)
            },
            checks,
        })
        .collect()
}

/// Overview stats from the latest checks of tracked keywords
///
/// Bucket counts are cumulative: top_10 includes top_3, top_20 includes
/// both. below_20 is the remainder.
fn summarize_positions(tracked: &[TrackedKeyword]) -> ProjectOverview {
    let mut overview = ProjectOverview {
        total_tracked: tracked.len(),
        ..Default::default()
    };

    let mut positions = Vec::new();
    for entry in tracked {
        let position = match entry.latest_check.as_ref().and_then(|c| c.position) {
            Some(p) => p,
            None => continue,
        };
        positions.push(position);

        if position <= 3 {
            overview.top_3 += 1;
        }
        if position <= 10 {
            overview.top_10 += 1;
        }
        if position <= 20 {
            overview.top_20 += 1;
        } else {
            overview.below_20 += 1;
        }
    }

    if !positions.is_empty() {
        overview.average_position =
            Some(positions.iter().sum::<i64>() as f64 / positions.len() as f64);
    }

    overview
}

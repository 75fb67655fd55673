//! Keyword service
//!
//! Manages the keywords attached to a project and their DataForSEO metrics.
//! Refreshes run against a client built from the owner's stored credentials
//! and are billed to the usage log.

use crate::db::repositories::{KeywordRepository, ProjectRepository};
use crate::models::{Keyword, KeywordMetrics, Provider};
use crate::services::dataforseo::{DataForSeoClient, KeywordMetricsItem, ProviderError};
use crate::services::usage::UsageService;
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// DataForSEO bulk metrics limit per request
const METRICS_BATCH_SIZE: usize = 1000;

/// Cost per 1000 keywords for a metrics refresh
const METRICS_COST_PER_1000: f64 = 0.07;

/// Endpoint name used in the usage log
const METRICS_ENDPOINT: &str = "dataforseo_labs/google/bulk_keyword_difficulty/live";

/// Error types for keyword operations
#[derive(Debug, thiserror::Error)]
pub enum KeywordServiceError {
    /// Project or keyword missing, or owned by another user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Keyword already exists in the project
    #[error("Keyword '{0}' already exists in this project")]
    Duplicate(String),

    /// Provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Outcome of a bulk add
#[derive(Debug, Serialize)]
pub struct BulkAddResult {
    pub added: Vec<Keyword>,
    pub skipped: usize,
}

/// Cost estimate for refreshing a whole project
#[derive(Debug, Serialize)]
pub struct RefreshEstimate {
    pub keyword_count: usize,
    pub estimated_cost: f64,
}

/// Keyword service
pub struct KeywordService {
    project_repo: Arc<dyn ProjectRepository>,
    keyword_repo: Arc<dyn KeywordRepository>,
    usage: Arc<UsageService>,
}

impl KeywordService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        keyword_repo: Arc<dyn KeywordRepository>,
        usage: Arc<UsageService>,
    ) -> Self {
        Self {
            project_repo,
            keyword_repo,
            usage,
        }
    }

    /// Add a single keyword to a project
    pub async fn add(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        phrase: &str,
    ) -> Result<Keyword, KeywordServiceError> {
        self.require_project(user_id, project_id).await?;

        let phrase = normalize_phrase(phrase)?;
        if self
            .keyword_repo
            .exists(project_id, &phrase)
            .await
            .context("Failed to check keyword")?
        {
            return Err(KeywordServiceError::Duplicate(phrase));
        }

        let keyword = Keyword::new(project_id, phrase);
        let created = self
            .keyword_repo
            .create(&keyword)
            .await
            .context("Failed to create keyword")?;

        Ok(created)
    }

    /// Add many keywords at once, skipping duplicates and blanks
    pub async fn bulk_add(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        phrases: Vec<String>,
    ) -> Result<BulkAddResult, KeywordServiceError> {
        self.require_project(user_id, project_id).await?;

        let mut added = Vec::new();
        let mut skipped = 0usize;
        let mut seen = std::collections::HashSet::new();

        for raw in phrases {
            let phrase = match normalize_phrase(&raw) {
                Ok(p) => p,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            if !seen.insert(phrase.clone())
                || self
                    .keyword_repo
                    .exists(project_id, &phrase)
                    .await
                    .context("Failed to check keyword")?
            {
                skipped += 1;
                continue;
            }

            let keyword = Keyword::new(project_id, phrase);
            let created = self
                .keyword_repo
                .create(&keyword)
                .await
                .context("Failed to create keyword")?;
            added.push(created);
        }

        Ok(BulkAddResult { added, skipped })
    }

    /// List all keywords in a project
    pub async fn list(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Keyword>, KeywordServiceError> {
        self.require_project(user_id, project_id).await?;

        let keywords = self
            .keyword_repo
            .list_by_project(project_id)
            .await
            .context("Failed to list keywords")?;

        Ok(keywords)
    }

    /// Get one keyword, scoped to the project and its owner
    pub async fn get(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Keyword, KeywordServiceError> {
        self.require_project(user_id, project_id).await?;

        self.keyword_repo
            .get_for_project(keyword_id, project_id)
            .await
            .context("Failed to get keyword")?
            .ok_or(KeywordServiceError::NotFound("Keyword"))
    }

    /// Delete a keyword and its tracking data
    pub async fn delete(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<(), KeywordServiceError> {
        self.get(user_id, project_id, keyword_id).await?;

        self.keyword_repo
            .delete(keyword_id)
            .await
            .context("Failed to delete keyword")?;

        Ok(())
    }

    /// Refresh metrics for a single keyword
    pub async fn refresh_one(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
        client: &DataForSeoClient,
    ) -> Result<Keyword, KeywordServiceError> {
        let keyword = self.get(user_id, project_id, keyword_id).await?;

        let items = client
            .keyword_metrics(
                std::slice::from_ref(&keyword.keyword),
                keyword.location_code,
                &keyword.language_code,
            )
            .await?;

        self.usage
            .log(
                user_id,
                Provider::Dataforseo,
                METRICS_ENDPOINT,
                estimate_metrics_cost(1),
                Some(200),
            )
            .await;

        self.apply_metric_items(std::slice::from_ref(&keyword), &items)
            .await?;

        self.get(user_id, project_id, keyword_id).await
    }

    /// Refresh metrics for every keyword in a project, batched
    ///
    /// Returns the number of keywords that received fresh metrics.
    pub async fn refresh_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        client: &DataForSeoClient,
    ) -> Result<usize, KeywordServiceError> {
        let keywords = self.list(user_id, project_id).await?;
        if keywords.is_empty() {
            return Ok(0);
        }

        let mut refreshed = 0;
        for batch in keywords.chunks(METRICS_BATCH_SIZE) {
            let phrases: Vec<String> = batch.iter().map(|k| k.keyword.clone()).collect();
            // All keywords in a project share location and language today
            let items = client
                .keyword_metrics(&phrases, batch[0].location_code, &batch[0].language_code)
                .await?;

            self.usage
                .log(
                    user_id,
                    Provider::Dataforseo,
                    METRICS_ENDPOINT,
                    estimate_metrics_cost(batch.len()),
                    Some(200),
                )
                .await;

            refreshed += self.apply_metric_items(batch, &items).await?;
        }

        Ok(refreshed)
    }

    /// Cost estimate for refreshing every keyword in a project
    pub async fn estimate_refresh(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<RefreshEstimate, KeywordServiceError> {
        let keywords = self.list(user_id, project_id).await?;
        Ok(RefreshEstimate {
            keyword_count: keywords.len(),
            estimated_cost: estimate_metrics_cost(keywords.len()),
        })
    }

    /// Write fetched metric items back to the matching keyword rows
    async fn apply_metric_items(
        &self,
        keywords: &[Keyword],
        items: &[KeywordMetricsItem],
    ) -> Result<usize, KeywordServiceError> {
        let by_phrase: HashMap<&str, &KeywordMetricsItem> =
            items.iter().map(|i| (i.keyword.as_str(), i)).collect();

        let now = Utc::now();
        let mut updated = 0;
        for keyword in keywords {
            if let Some(item) = by_phrase.get(keyword.keyword.as_str()) {
                let metrics = KeywordMetrics {
                    search_volume: item.search_volume,
                    keyword_difficulty: item.keyword_difficulty,
                    cpc: item.cpc,
                    competition: item.competition,
                };
                self.keyword_repo
                    .update_metrics(keyword.id, &metrics, now)
                    .await
                    .context("Failed to update keyword metrics")?;
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn require_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<(), KeywordServiceError> {
        self.project_repo
            .get_for_user(project_id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(KeywordServiceError::NotFound("Project"))?;
        Ok(())
    }
}

/// Cost of a metrics refresh for the given keyword count
pub fn estimate_metrics_cost(keyword_count: usize) -> f64 {
    keyword_count as f64 / 1000.0 * METRICS_COST_PER_1000
}

/// Normalize a keyword phrase: trim and lowercase, collapse inner whitespace
fn normalize_phrase(raw: &str) -> Result<String, KeywordServiceError> {
    let phrase = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    if phrase.is_empty() {
        return Err(KeywordServiceError::ValidationError(
            "Keyword cannot be empty".to_string(),
        ));
    }

    Ok(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxKeywordRepository, SqlxProjectRepository, SqlxUsageRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::Project;

    async fn setup() -> (KeywordService, Uuid, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
             VALUES (?, 'kw@example.com', 'hash', 1, datetime('now'), datetime('now'))",
        )
        .bind(user_id.to_string())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert user");

        let project_repo = SqlxProjectRepository::boxed(pool.clone());
        let project = Project::new(user_id, "Site".to_string(), "example.com".to_string(), None);
        project_repo.create(&project).await.expect("Failed to create project");

        let service = KeywordService::new(
            project_repo,
            SqlxKeywordRepository::boxed(pool.clone()),
            Arc::new(UsageService::new(SqlxUsageRepository::boxed(pool))),
        );

        (service, user_id, project.id)
    }

    #[tokio::test]
    async fn test_add_normalizes_and_rejects_duplicates() {
        let (service, user_id, project_id) = setup().await;

        let keyword = service
            .add(user_id, project_id, "  Best   SEO Tools ")
            .await
            .expect("Failed to add");
        assert_eq!(keyword.keyword, "best seo tools");

        let result = service.add(user_id, project_id, "best seo tools").await;
        assert!(matches!(result, Err(KeywordServiceError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_add_empty_keyword_fails() {
        let (service, user_id, project_id) = setup().await;

        let result = service.add(user_id, project_id, "   ").await;
        assert!(matches!(result, Err(KeywordServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_add_to_foreign_project_fails() {
        let (service, _, project_id) = setup().await;

        let result = service.add(Uuid::new_v4(), project_id, "keyword").await;
        assert!(matches!(result, Err(KeywordServiceError::NotFound("Project"))));
    }

    #[tokio::test]
    async fn test_bulk_add_reports_counts() {
        let (service, user_id, project_id) = setup().await;

        service
            .add(user_id, project_id, "existing keyword")
            .await
            .expect("Failed to add");

        let result = service
            .bulk_add(
                user_id,
                project_id,
                vec![
                    "new keyword".to_string(),
                    "Existing Keyword".to_string(),
                    "new keyword".to_string(),
                    "  ".to_string(),
                    "another keyword".to_string(),
                ],
            )
            .await
            .expect("Failed to bulk add");

        assert_eq!(result.added.len(), 2);
        assert_eq!(result.skipped, 3);
    }

    #[tokio::test]
    async fn test_get_delete_scoped() {
        let (service, user_id, project_id) = setup().await;

        let keyword = service
            .add(user_id, project_id, "tracked phrase")
            .await
            .expect("Failed to add");

        let found = service
            .get(user_id, project_id, keyword.id)
            .await
            .expect("Failed to get");
        assert_eq!(found.id, keyword.id);

        service
            .delete(user_id, project_id, keyword.id)
            .await
            .expect("Failed to delete");

        let result = service.get(user_id, project_id, keyword.id).await;
        assert!(matches!(result, Err(KeywordServiceError::NotFound("Keyword"))));
    }

    #[tokio::test]
    async fn test_apply_metric_items_matches_by_phrase() {
        let (service, user_id, project_id) = setup().await;

        let keyword = service
            .add(user_id, project_id, "seo tools")
            .await
            .expect("Failed to add");
        assert!(!keyword.has_metrics());

        let items = vec![
            KeywordMetricsItem {
                keyword: "seo tools".to_string(),
                search_volume: Some(8100),
                keyword_difficulty: Some(62.0),
                cpc: Some(4.5),
                competition: Some(0.78),
            },
            KeywordMetricsItem {
                keyword: "unrelated".to_string(),
                search_volume: Some(10),
                keyword_difficulty: None,
                cpc: None,
                competition: None,
            },
        ];

        let updated = service
            .apply_metric_items(std::slice::from_ref(&keyword), &items)
            .await
            .expect("Failed to apply");
        assert_eq!(updated, 1);

        let refreshed = service
            .get(user_id, project_id, keyword.id)
            .await
            .expect("Failed to get");
        assert_eq!(refreshed.search_volume, Some(8100));
        assert_eq!(refreshed.keyword_difficulty, Some(62.0));
        assert!(refreshed.last_refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_estimate_refresh() {
        let (service, user_id, project_id) = setup().await;

        for phrase in ["one", "two", "three"] {
            service.add(user_id, project_id, phrase).await.expect("add");
        }

        let estimate = service
            .estimate_refresh(user_id, project_id)
            .await
            .expect("Failed to estimate");
        assert_eq!(estimate.keyword_count, 3);
        assert!((estimate.estimated_cost - 0.00021).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_metrics_cost() {
        assert!((estimate_metrics_cost(1000) - 0.07).abs() < 1e-12);
        assert!((estimate_metrics_cost(0)).abs() < 1e-12);
    }
}

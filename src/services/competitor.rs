//! Competitor service
//!
//! Tracks competitor domains per project and computes keyword overlap from
//! stored SERP snapshots. No provider calls here: the analysis runs entirely
//! against data the rank checks have already persisted.

use crate::db::repositories::{
    CompetitorRepository, KeywordRepository, ProjectRepository, SerpRepository,
};
use crate::models::{Competitor, SerpEntry};
use crate::services::project::normalize_domain;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for competitor operations
#[derive(Debug, thiserror::Error)]
pub enum CompetitorServiceError {
    /// Project or competitor missing, or owned by another user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Competitor domain already added to the project
    #[error("Competitor '{0}' is already added to this project")]
    Duplicate(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A competitor's appearance in one keyword's SERP
#[derive(Debug, PartialEq, Serialize)]
pub struct CompetitorPosition {
    pub domain: String,
    pub position: i64,
    pub url: String,
}

/// Overlap between a project keyword and its competitors
#[derive(Debug, Serialize)]
pub struct KeywordOverlap {
    pub keyword_id: Uuid,
    pub keyword: String,
    pub competitors: Vec<CompetitorPosition>,
}

/// Competitor service
pub struct CompetitorService {
    project_repo: Arc<dyn ProjectRepository>,
    competitor_repo: Arc<dyn CompetitorRepository>,
    keyword_repo: Arc<dyn KeywordRepository>,
    serp_repo: Arc<dyn SerpRepository>,
}

impl CompetitorService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        competitor_repo: Arc<dyn CompetitorRepository>,
        keyword_repo: Arc<dyn KeywordRepository>,
        serp_repo: Arc<dyn SerpRepository>,
    ) -> Self {
        Self {
            project_repo,
            competitor_repo,
            keyword_repo,
            serp_repo,
        }
    }

    /// Add a competitor domain to a project
    pub async fn add(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        domain: &str,
        name: Option<String>,
    ) -> Result<Competitor, CompetitorServiceError> {
        self.require_project(user_id, project_id).await?;

        let domain = normalize_domain(domain).map_err(|_| {
            CompetitorServiceError::ValidationError(format!("Invalid domain: '{}'", domain.trim()))
        })?;

        if self
            .competitor_repo
            .exists(project_id, &domain)
            .await
            .context("Failed to check competitor")?
        {
            return Err(CompetitorServiceError::Duplicate(domain));
        }

        let competitor = Competitor::new(project_id, domain, name);
        let created = self
            .competitor_repo
            .create(&competitor)
            .await
            .context("Failed to create competitor")?;

        Ok(created)
    }

    /// List a project's competitors
    pub async fn list(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Competitor>, CompetitorServiceError> {
        self.require_project(user_id, project_id).await?;

        let competitors = self
            .competitor_repo
            .list_by_project(project_id)
            .await
            .context("Failed to list competitors")?;

        Ok(competitors)
    }

    /// Remove a competitor from a project
    pub async fn remove(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        competitor_id: Uuid,
    ) -> Result<(), CompetitorServiceError> {
        self.require_project(user_id, project_id).await?;

        self.competitor_repo
            .get_for_project(competitor_id, project_id)
            .await
            .context("Failed to get competitor")?
            .ok_or(CompetitorServiceError::NotFound("Competitor"))?;

        self.competitor_repo
            .delete(competitor_id)
            .await
            .context("Failed to delete competitor")?;

        Ok(())
    }

    /// Keyword overlap: where competitors rank in each keyword's latest SERP
    ///
    /// Keywords without a stored snapshot are omitted.
    pub async fn keyword_overlap(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<KeywordOverlap>, CompetitorServiceError> {
        let competitors = self.list(user_id, project_id).await?;
        if competitors.is_empty() {
            return Ok(Vec::new());
        }
        let domains: Vec<String> = competitors.into_iter().map(|c| c.domain).collect();

        let keywords = self
            .keyword_repo
            .list_by_project(project_id)
            .await
            .context("Failed to list keywords")?;

        let mut overlaps = Vec::new();
        for keyword in keywords {
            let snapshot = self
                .serp_repo
                .latest_snapshot(keyword.id)
                .await
                .context("Failed to load SERP snapshot")?;
            if snapshot.is_empty() {
                continue;
            }

            let positions = match_competitors(&snapshot, &domains);
            overlaps.push(KeywordOverlap {
                keyword_id: keyword.id,
                keyword: keyword.keyword,
                competitors: positions,
            });
        }

        Ok(overlaps)
    }

    async fn require_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<(), CompetitorServiceError> {
        self.project_repo
            .get_for_user(project_id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(CompetitorServiceError::NotFound("Project"))?;
        Ok(())
    }
}

/// Best (lowest) position of each competitor domain in a snapshot
fn match_competitors(snapshot: &[SerpEntry], domains: &[String]) -> Vec<CompetitorPosition> {
    let mut positions = Vec::new();

    for domain in domains {
        let hit = snapshot.iter().find(|entry| {
            entry
                .domain
                .as_deref()
                .map(|d| d == domain || d.ends_with(&format!(".{}", domain)))
                .unwrap_or_else(|| entry.url.contains(domain.as_str()))
        });

        if let Some(entry) = hit {
            positions.push(CompetitorPosition {
                domain: domain.clone(),
                position: entry.position,
                url: entry.url.clone(),
            });
        }
    }

    positions.sort_by_key(|p| p.position);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCompetitorRepository, SqlxKeywordRepository, SqlxProjectRepository, SqlxSerpRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Keyword, Project};

    async fn setup() -> (CompetitorService, Uuid, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
             VALUES (?, 'comp@example.com', 'hash', 1, datetime('now'), datetime('now'))",
        )
        .bind(user_id.to_string())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert user");

        let project_repo = SqlxProjectRepository::boxed(pool.clone());
        let project = Project::new(user_id, "Site".to_string(), "example.com".to_string(), None);
        project_repo.create(&project).await.expect("Failed to create project");

        let service = CompetitorService::new(
            project_repo,
            SqlxCompetitorRepository::boxed(pool.clone()),
            SqlxKeywordRepository::boxed(pool.clone()),
            SqlxSerpRepository::boxed(pool),
        );

        (service, user_id, project.id)
    }

    #[tokio::test]
    async fn test_add_normalizes_and_rejects_duplicates() {
        let (service, user_id, project_id) = setup().await;

        let competitor = service
            .add(user_id, project_id, "https://www.Rival.com/", None)
            .await
            .expect("Failed to add");
        assert_eq!(competitor.domain, "rival.com");

        let result = service.add(user_id, project_id, "rival.com", None).await;
        assert!(matches!(result, Err(CompetitorServiceError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_remove_scoped_to_project() {
        let (service, user_id, project_id) = setup().await;

        let competitor = service
            .add(user_id, project_id, "rival.com", None)
            .await
            .expect("Failed to add");

        let result = service.remove(Uuid::new_v4(), project_id, competitor.id).await;
        assert!(matches!(result, Err(CompetitorServiceError::NotFound("Project"))));

        service
            .remove(user_id, project_id, competitor.id)
            .await
            .expect("Failed to remove");

        let remaining = service.list(user_id, project_id).await.expect("list");
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_overlap_from_snapshots() {
        let (service, user_id, project_id) = setup().await;

        service
            .add(user_id, project_id, "rival.com", None)
            .await
            .expect("Failed to add competitor");
        service
            .add(user_id, project_id, "absent.com", None)
            .await
            .expect("Failed to add competitor");

        let keyword = Keyword::new(project_id, "seo tools".to_string());
        service
            .keyword_repo
            .create(&keyword)
            .await
            .expect("Failed to create keyword");

        let snapshot_date = chrono::Utc::now().date_naive();
        let entries = vec![
            SerpEntry::new(
                keyword.id,
                2,
                "https://rival.com/tools".to_string(),
                None,
                Some("rival.com".to_string()),
            ),
            SerpEntry::new(
                keyword.id,
                7,
                "https://blog.rival.com/post".to_string(),
                None,
                Some("blog.rival.com".to_string()),
            ),
        ];
        service
            .serp_repo
            .replace_snapshot(keyword.id, snapshot_date, &entries)
            .await
            .expect("Failed to store snapshot");

        let overlaps = service
            .keyword_overlap(user_id, project_id)
            .await
            .expect("Failed to analyze");

        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].keyword, "seo tools");
        assert_eq!(overlaps[0].competitors.len(), 1);
        assert_eq!(overlaps[0].competitors[0].domain, "rival.com");
        assert_eq!(overlaps[0].competitors[0].position, 2);
    }

    #[test]
    fn test_match_competitors_subdomains_and_order() {
        let keyword_id = Uuid::new_v4();
        let snapshot = vec![
            SerpEntry::new(
                keyword_id,
                1,
                "https://shop.alpha.com/x".to_string(),
                None,
                Some("shop.alpha.com".to_string()),
            ),
            SerpEntry::new(
                keyword_id,
                4,
                "https://beta.com/y".to_string(),
                None,
                Some("beta.com".to_string()),
            ),
        ];

        let positions = match_competitors(
            &snapshot,
            &["beta.com".to_string(), "alpha.com".to_string()],
        );

        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].domain, "alpha.com");
        assert_eq!(positions[0].position, 1);
        assert_eq!(positions[1].domain, "beta.com");
    }
}

//! Scheduled rank checks and maintenance
//!
//! Every `interval_hours` the scheduler re-checks every tracked keyword,
//! reusing one DataForSEO client per owner. Keywords whose owner has no
//! stored credentials are skipped, and a failing check never aborts the
//! pass. A second task cleans up expired sessions and stale rate-limiter
//! entries hourly.

use crate::config::SchedulerConfig;
use crate::db::repositories::KeywordRepository;
use crate::models::CheckOrigin;
use crate::services::{
    CredentialService, CredentialServiceError, DataForSeoClient, LoginRateLimiter,
    RankTrackingService, UserService,
};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Interval between maintenance sweeps
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

/// Background scheduler
pub struct Scheduler {
    config: SchedulerConfig,
    keyword_repo: Arc<dyn KeywordRepository>,
    credentials: Arc<CredentialService>,
    rank: Arc<RankTrackingService>,
    users: Arc<UserService>,
    rate_limiter: Arc<LoginRateLimiter>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        keyword_repo: Arc<dyn KeywordRepository>,
        credentials: Arc<CredentialService>,
        rank: Arc<RankTrackingService>,
        users: Arc<UserService>,
        rate_limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            config,
            keyword_repo,
            credentials,
            rank,
            users,
            rate_limiter,
        }
    }

    /// Spawn the rank-check and maintenance loops
    pub fn spawn(self: Arc<Self>) {
        if self.config.enabled {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(check_period(scheduler.config.interval_hours));
                // First tick fires immediately; skip it so startup stays quiet
                interval.tick().await;
                loop {
                    interval.tick().await;
                    scheduler.run_rank_pass().await;
                }
            });
            tracing::info!(
                interval_hours = self.config.interval_hours,
                concurrency = self.config.concurrency,
                "Rank check scheduler started"
            );
        } else {
            tracing::info!("Rank check scheduler disabled by config");
        }

        let scheduler = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                interval.tick().await;
                scheduler.run_maintenance().await;
            }
        });
    }

    /// Re-check every tracked keyword with bounded concurrency
    pub async fn run_rank_pass(&self) {
        let tracked = match self.keyword_repo.list_tracked_with_owner().await {
            Ok(tracked) => tracked,
            Err(e) => {
                tracing::error!("Failed to enumerate tracked keywords: {:#}", e);
                return;
            }
        };
        if tracked.is_empty() {
            return;
        }

        tracing::info!(keywords = tracked.len(), "Starting scheduled rank pass");

        // One client per owner; owners without credentials are skipped
        let mut clients: HashMap<Uuid, Option<Arc<DataForSeoClient>>> = HashMap::new();
        for (_, owner_id) in &tracked {
            if clients.contains_key(owner_id) {
                continue;
            }
            let client = match self.credentials.dataforseo_client(*owner_id).await {
                Ok(client) => Some(Arc::new(client)),
                Err(CredentialServiceError::NotConfigured(_)) => {
                    tracing::debug!(owner = %owner_id, "No DataForSEO credentials, skipping owner");
                    None
                }
                Err(e) => {
                    tracing::warn!(owner = %owner_id, "Failed to build provider client: {}", e);
                    None
                }
            };
            clients.insert(*owner_id, client);
        }

        let checked = stream::iter(tracked)
            .filter_map(|(keyword, owner_id)| {
                let client = clients.get(&owner_id).cloned().flatten();
                async move { client.map(|client| (keyword, owner_id, client)) }
            })
            .map(|(keyword, owner_id, client)| async move {
                match self
                    .rank
                    .run_check(owner_id, &keyword, &client, CheckOrigin::Scheduled)
                    .await
                {
                    Ok(check) => {
                        tracing::debug!(
                            keyword = %keyword.keyword,
                            position = ?check.position,
                            "Scheduled check complete"
                        );
                        1usize
                    }
                    Err(e) => {
                        tracing::warn!(keyword = %keyword.keyword, "Scheduled check failed: {}", e);
                        0
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .fold(0usize, |total, n| async move { total + n })
            .await;

        tracing::info!(checked, "Scheduled rank pass finished");
    }

    /// Delete expired sessions and prune rate-limiter state
    pub async fn run_maintenance(&self) {
        match self.users.cleanup_expired_sessions().await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Removed expired sessions"),
            Err(e) => tracing::warn!("Session cleanup failed: {}", e),
        }

        self.rate_limiter.cleanup().await;
    }
}

/// Period between rank passes, never shorter than one hour
///
/// `tokio::time::interval` panics on a zero duration, so a misconfigured
/// `interval_hours = 0` is rounded up instead of killing the task.
fn check_period(interval_hours: u64) -> Duration {
    Duration::from_secs(interval_hours.max(1) * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::db::repositories::{
        SqlxCredentialRepository, SqlxKeywordRepository, SqlxProjectRepository,
        SqlxRankCheckRepository, SqlxSerpRepository, SqlxSessionRepository, SqlxUsageRepository,
        SqlxUserRepository, ProjectRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Keyword, Project, User};
    use crate::services::{CredentialCipher, UsageService};

    async fn setup() -> (Scheduler, Arc<dyn KeywordRepository>, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let user = User::new("sched@example.com".to_string(), "hash".to_string(), None);
        user_repo.create(&user).await.expect("Failed to create user");

        let project_repo = SqlxProjectRepository::boxed(pool.clone());
        let project = Project::new(user.id, "Site".to_string(), "example.com".to_string(), None);
        project_repo.create(&project).await.expect("Failed to create project");

        let keyword_repo = SqlxKeywordRepository::boxed(pool.clone());
        let usage = Arc::new(UsageService::new(SqlxUsageRepository::boxed(pool.clone())));

        let rank = Arc::new(crate::services::RankTrackingService::new(
            project_repo.clone(),
            keyword_repo.clone(),
            SqlxRankCheckRepository::boxed(pool.clone()),
            SqlxSerpRepository::boxed(pool.clone()),
            usage,
            100,
        ));
        let credentials = Arc::new(CredentialService::new(
            SqlxCredentialRepository::boxed(pool.clone()),
            CredentialCipher::new("test-key"),
            ProviderConfig::default(),
        ));
        let users = Arc::new(UserService::new(
            user_repo,
            SqlxSessionRepository::boxed(pool),
        ));

        let scheduler = Scheduler::new(
            SchedulerConfig::default(),
            keyword_repo.clone(),
            credentials,
            rank,
            users,
            Arc::new(LoginRateLimiter::new()),
        );

        (scheduler, keyword_repo, project.id)
    }

    #[tokio::test]
    async fn test_rank_pass_skips_owners_without_credentials() {
        let (scheduler, keyword_repo, project_id) = setup().await;

        let mut keyword = Keyword::new(project_id, "tracked phrase".to_string());
        keyword.is_tracking = true;
        keyword.tracked_url = Some("example.com/page".to_string());
        keyword_repo.create(&keyword).await.expect("Failed to create keyword");
        keyword_repo
            .update_tracking(&keyword)
            .await
            .expect("Failed to set tracking");

        // No credentials stored: the pass must finish without touching the network
        scheduler.run_rank_pass().await;
    }

    #[tokio::test]
    async fn test_rank_pass_empty_is_noop() {
        let (scheduler, _, _) = setup().await;
        scheduler.run_rank_pass().await;
    }

    #[tokio::test]
    async fn test_maintenance_runs() {
        let (scheduler, _, _) = setup().await;
        scheduler.run_maintenance().await;
    }

    #[test]
    fn test_check_period_clamps_zero_hours() {
        assert_eq!(check_period(0), Duration::from_secs(3600));
        assert_eq!(check_period(1), Duration::from_secs(3600));
        assert_eq!(check_period(24), Duration::from_secs(24 * 3600));
    }
}

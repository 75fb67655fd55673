//! serptrack - SEO rank tracking and analytics backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use serptrack::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCompetitorRepository, SqlxConversationRepository, SqlxCredentialRepository,
            SqlxKeywordRepository, SqlxProjectRepository, SqlxRankCheckRepository,
            SqlxSerpRepository, SqlxSessionRepository, SqlxUsageRepository, SqlxUserRepository,
        },
    },
    services::{
        AssistantService, CompetitorService, CredentialCipher, CredentialService, KeywordService,
        LoginRateLimiter, ProjectService, RankTrackingService, UsageService, UserService,
    },
    tasks::Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "serptrack=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting serptrack backend...");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yml".to_string());
    let config = Arc::new(Config::load_with_env(Path::new(&config_path))?);
    tracing::info!("Configuration loaded from {}", config_path);

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let project_repo = SqlxProjectRepository::boxed(pool.clone());
    let keyword_repo = SqlxKeywordRepository::boxed(pool.clone());
    let rank_repo = SqlxRankCheckRepository::boxed(pool.clone());
    let serp_repo = SqlxSerpRepository::boxed(pool.clone());
    let competitor_repo = SqlxCompetitorRepository::boxed(pool.clone());
    let credential_repo = SqlxCredentialRepository::boxed(pool.clone());
    let usage_repo = SqlxUsageRepository::boxed(pool.clone());
    let conversation_repo = SqlxConversationRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::with_session_ttl(
        user_repo,
        session_repo,
        config.auth.session_ttl_days,
    ));
    let usage_service = Arc::new(UsageService::new(usage_repo));
    let project_service = Arc::new(ProjectService::new(project_repo.clone()));
    let keyword_service = Arc::new(KeywordService::new(
        project_repo.clone(),
        keyword_repo.clone(),
        usage_service.clone(),
    ));
    let rank_service = Arc::new(RankTrackingService::new(
        project_repo.clone(),
        keyword_repo.clone(),
        rank_repo.clone(),
        serp_repo.clone(),
        usage_service.clone(),
        config.scheduler.serp_depth,
    ));
    let competitor_service = Arc::new(CompetitorService::new(
        project_repo.clone(),
        competitor_repo,
        keyword_repo.clone(),
        serp_repo.clone(),
    ));
    let cipher = CredentialCipher::new(&config.encryption.key);
    let credential_service = Arc::new(CredentialService::new(
        credential_repo,
        cipher,
        config.providers.clone(),
    ));
    let assistant_service = Arc::new(AssistantService::new(
        conversation_repo,
        project_repo,
        keyword_repo.clone(),
        rank_repo,
        serp_repo,
        usage_service.clone(),
    ));
    let rate_limiter = Arc::new(LoginRateLimiter::new());

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        user_service: user_service.clone(),
        project_service,
        keyword_service,
        rank_service: rank_service.clone(),
        competitor_service,
        credential_service: credential_service.clone(),
        usage_service,
        assistant_service,
        rate_limiter: rate_limiter.clone(),
    };

    // Start background jobs (rank-check sweeps and maintenance)
    let scheduler = Arc::new(Scheduler::new(
        config.scheduler.clone(),
        keyword_repo,
        credential_service,
        rank_service,
        user_service,
        rate_limiter,
    ));
    scheduler.spawn();

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

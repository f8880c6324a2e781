//! Pollbox server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use pollbox_api::{AppState, router as api_router};
use pollbox_common::Config;
use pollbox_core::{ContestService, PollLocks, PollService, RotationService, TallyService, VoteService};
use pollbox_db::repositories::{ContestWinnerRepository, PollRepository, PollVoteRepository};
use pollbox_scheduler::{JobExecutor, SchedulerConfig, run_scheduler};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bridges the rotation service into the scheduler's job interface.
struct RotationExecutor {
    rotation: RotationService,
}

#[async_trait::async_trait]
impl JobExecutor for RotationExecutor {
    async fn rotate_weekly(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let promoted = self.rotation.rotate().await?;
        Ok(promoted.is_some())
    }

    async fn close_due_polls(&self) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rotation.close_due().await?)
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollbox=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting pollbox server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = Arc::new(pollbox_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    pollbox_db::migrate(&db).await?;
    info!("Migrations completed");

    // Repositories
    let poll_repo = PollRepository::new(db.clone());
    let vote_repo = PollVoteRepository::new(db.clone());
    let winner_repo = ContestWinnerRepository::new(db);

    // Services share one per-poll lock registry so vote casting and
    // contest resolution for the same poll never interleave.
    let locks = PollLocks::new();
    let poll_service = PollService::new(poll_repo.clone());
    let vote_service = VoteService::new(poll_repo.clone(), vote_repo.clone(), locks.clone());
    let tally_service = TallyService::new(poll_repo.clone(), vote_repo.clone());
    let contest_service = ContestService::new(
        poll_repo.clone(),
        vote_repo,
        winner_repo,
        locks.clone(),
    );
    let rotation_service = RotationService::new(
        poll_repo,
        contest_service.clone(),
        locks,
        config.rotation.weekly_duration_days,
    );

    if config.admin.token.is_none() {
        info!("No admin token configured; administrative endpoints are disabled");
    }

    let state = AppState {
        poll_service,
        vote_service,
        tally_service,
        contest_service,
        admin_token: config.admin.token.clone(),
    };

    // Start the weekly rotation scheduler
    if config.rotation.enabled {
        let scheduler_config = SchedulerConfig {
            rotation_interval: Duration::from_secs(config.rotation.check_interval_secs),
            close_interval: Duration::from_secs(config.rotation.close_interval_secs),
        };
        let executor = Arc::new(RotationExecutor {
            rotation: rotation_service,
        });
        run_scheduler(scheduler_config, executor);
        info!("Weekly rotation scheduler started");
    }

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

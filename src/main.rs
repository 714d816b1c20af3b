use std::{net::SocketAddr, sync::Arc};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod models;
mod services;
mod storage;

use config::{Config, MediaBackend, StorageBackend};
use services::rate_limit::{MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use storage::{
    local::LocalMediaStore, memory::MemoryPageStore, minio::MinioClient, postgres::PgPageStore,
    redis::RedisClient, MediaStore, PageStore,
};

#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<dyn PageStore>,
    pub media: Arc<dyn MediaStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purethanks_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!(
        "Starting server in {} mode with {:?} storage",
        config.server.environment,
        config.storage_backend
    );

    let (pages, limiter): (Arc<dyn PageStore>, Arc<dyn RateLimiter>) =
        match config.storage_backend {
            StorageBackend::Postgres => {
                // Initialize database pool
                let db = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .connect(&config.database_url())
                    .await?;
                tracing::info!("Connected to PostgreSQL");

                // Run migrations
                sqlx::migrate!("./migrations").run(&db).await?;
                tracing::info!("Database migrations completed");

                // Initialize Redis
                let redis = RedisClient::new(&config.redis_url()).await?;
                tracing::info!("Connected to Redis");

                let pages: Arc<dyn PageStore> = Arc::new(PgPageStore::new(db));
                let limiter: Arc<dyn RateLimiter> =
                    Arc::new(RedisRateLimiter::new(redis, &config.rate_limit));
                (pages, limiter)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; pages will not survive a restart");
                let pages: Arc<dyn PageStore> = Arc::new(MemoryPageStore::new());
                let limiter: Arc<dyn RateLimiter> =
                    Arc::new(MemoryRateLimiter::new(&config.rate_limit));
                (pages, limiter)
            }
        };

    let media: Arc<dyn MediaStore> = match config.media_backend {
        MediaBackend::Minio => {
            // Initialize MinIO
            let minio = MinioClient::new(&config.minio);
            minio.ensure_bucket().await?;
            tracing::info!("Connected to MinIO");
            Arc::new(minio)
        }
        MediaBackend::Local => {
            let local = LocalMediaStore::new(&config.local_media).await?;
            tracing::info!("Storing photos under {}", config.local_media.dir.display());
            Arc::new(local)
        }
    };

    // Spawn expiry sweeper
    tokio::spawn(services::expiry::run_sweeper(
        pages.clone(),
        config.pages.sweep_interval,
    ));

    // Create app state
    let state = AppState {
        pages,
        media,
        limiter,
        config: Arc::new(config.clone()),
    };

    let app = api::router::build_app(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

use anyhow::{Context, Result};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use video_service::{
    config::AppConfig,
    db,
    routes::routes,
    services::{
        auth::{JwtAuthenticator, ServiceAuth},
        blob_store::S3BlobStore,
        cache::{CacheBackend, MemoryCache, RedisCache, VideoCache},
        lifecycle::LifecycleManager,
        upload_service::UploadService,
        video_service::VideoService,
        video_store::SqliteVideoStore,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting video-service with config: {:?}", cfg);

    // --- Ensure the SQLite directory exists ---
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {:?}", parent))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // --- Initialize SQLite connection ---
    let db = Arc::new(
        db::connect(
            &cfg.database_url,
            cfg.db_max_connections,
            cfg.db_acquire_timeout,
        )
        .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Cache (connects lazily; never blocks startup) ---
    let backend: Arc<dyn CacheBackend> = match &cfg.redis_url {
        Some(url) => Arc::new(RedisCache::open(url).context("parsing Redis URL")?),
        None => {
            tracing::warn!(
                capacity = cfg.memory_cache_capacity,
                "No Redis URL configured, using in-process cache"
            );
            Arc::new(MemoryCache::with_capacity(cfg.memory_cache_capacity))
        }
    };
    let cache = VideoCache::new(backend, cfg.cache_ttl_secs, cfg.cache_timeout);
    tracing::info!(
        backend = cache.backend_name(),
        ttl_secs = cache.ttl_secs(),
        "video cache configured"
    );
    if let Err(err) = cache.ping().await {
        tracing::warn!(
            error = %err,
            "cache not reachable at startup, lookups will hit the database"
        );
    }

    // --- Initialize core services ---
    let lifecycle = LifecycleManager::new(cfg.allow_reprocessing);
    let store = SqliteVideoStore::new(db.clone(), lifecycle);
    let blobs = Arc::new(S3BlobStore::from_env(cfg.aws_region.clone()).await);

    let state = AppState {
        videos: VideoService::new(store, cache.clone()),
        uploads: UploadService::new(
            blobs,
            cfg.raw_videos_bucket.clone(),
            cfg.thumbnails_bucket.clone(),
            cfg.upload_url_ttl,
        ),
        auth: Arc::new(JwtAuthenticator::new(
            &cfg.jwt_secret,
            cfg.jwt_issuer.as_deref(),
            cfg.jwt_audience.as_deref(),
        )),
        service_auth: Arc::new(ServiceAuth::new(cfg.service_token.clone())),
        db: db.clone(),
        cache,
    };

    // --- Build router ---
    let app = routes::app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

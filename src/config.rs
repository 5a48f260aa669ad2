use crate::services::cache::{DEFAULT_MEMORY_CAPACITY, DEFAULT_TTL_SECS};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// No URL means the in-process cache is used.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub cache_timeout: Duration,
    /// Entry bound for the in-process cache.
    pub memory_cache_capacity: u64,
    pub aws_region: Option<String>,
    pub raw_videos_bucket: String,
    pub thumbnails_bucket: String,
    pub upload_url_ttl: Duration,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub service_token: Option<String>,
    pub allow_reprocessing: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video metadata API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_SERVICE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_SERVICE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_SERVICE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Redis URL for the read cache (overrides VIDEO_SERVICE_REDIS_URL)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Cache entry lifetime in seconds (overrides VIDEO_SERVICE_CACHE_TTL_SECS)
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Allow COMPLETED/FAILED -> IN_PROGRESS (overrides VIDEO_SERVICE_ALLOW_REPROCESSING)
    #[arg(long)]
    pub allow_reprocessing: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env_or("VIDEO_SERVICE_HOST", "0.0.0.0");
        let env_port = env_parse("VIDEO_SERVICE_PORT", 8000u16)?;
        let env_db = env_or("VIDEO_SERVICE_DATABASE_URL", "sqlite://./data/videos.db");
        let env_redis = env_opt("VIDEO_SERVICE_REDIS_URL");
        let env_ttl = env_parse("VIDEO_SERVICE_CACHE_TTL_SECS", DEFAULT_TTL_SECS)?;
        let env_reprocessing = env_parse("VIDEO_SERVICE_ALLOW_REPROCESSING", false)?;

        let jwt_secret = env_opt("VIDEO_SERVICE_JWT_SECRET")
            .context("VIDEO_SERVICE_JWT_SECRET must be set")?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            db_max_connections: env_parse("VIDEO_SERVICE_DB_MAX_CONNECTIONS", 5u32)?,
            db_acquire_timeout: Duration::from_secs(env_parse(
                "VIDEO_SERVICE_DB_ACQUIRE_TIMEOUT_SECS",
                5u64,
            )?),
            redis_url: args.redis_url.or(env_redis),
            cache_ttl_secs: args.cache_ttl_secs.unwrap_or(env_ttl),
            cache_timeout: Duration::from_millis(env_parse(
                "VIDEO_SERVICE_CACHE_TIMEOUT_MS",
                250u64,
            )?),
            memory_cache_capacity: env_parse(
                "VIDEO_SERVICE_MEMORY_CACHE_CAPACITY",
                DEFAULT_MEMORY_CAPACITY,
            )?,
            aws_region: env_opt("VIDEO_SERVICE_AWS_REGION"),
            raw_videos_bucket: env_or("VIDEO_SERVICE_RAW_VIDEOS_BUCKET", "raw-videos"),
            thumbnails_bucket: env_or("VIDEO_SERVICE_THUMBNAILS_BUCKET", "video-thumbnails"),
            upload_url_ttl: Duration::from_secs(env_parse(
                "VIDEO_SERVICE_UPLOAD_URL_TTL_SECS",
                3600u64,
            )?),
            jwt_secret,
            jwt_issuer: env_opt("VIDEO_SERVICE_JWT_ISSUER"),
            jwt_audience: env_opt("VIDEO_SERVICE_JWT_AUDIENCE"),
            service_token: env_opt("VIDEO_SERVICE_SERVICE_TOKEN"),
            allow_reprocessing: args.allow_reprocessing || env_reprocessing,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Secrets stay out of startup logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout", &self.db_acquire_timeout)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_timeout", &self.cache_timeout)
            .field("memory_cache_capacity", &self.memory_cache_capacity)
            .field("aws_region", &self.aws_region)
            .field("raw_videos_bucket", &self.raw_videos_bucket)
            .field("thumbnails_bucket", &self.thumbnails_bucket)
            .field("upload_url_ttl", &self.upload_url_ttl)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("service_token", &self.service_token.as_ref().map(|_| "<set>"))
            .field("allow_reprocessing", &self.allow_reprocessing)
            .finish_non_exhaustive()
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.into())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

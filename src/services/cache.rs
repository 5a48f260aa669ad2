//! Best-effort read cache for serialized video views.
//!
//! Backends report failures as [`CacheError`]; [`VideoCache`] is the only
//! consumer and turns every failure or timeout into a miss (for reads) or a
//! logged no-op (for writes). Nothing outside this module sees a cache error.

use async_trait::async_trait;
use moka::{Expiry, future::Cache};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default entry lifetime in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default bound on entries held by [`MemoryCache`].
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    async fn ping(&self) -> CacheResult<()>;

    /// Short label used in logs and readiness output.
    fn name(&self) -> &'static str;
}

/// Redis-backed cache.
///
/// The connection is established on first use, not at construction, so the
/// service starts even while Redis is down. A failed connection attempt is
/// retried by the next call.
pub struct RedisCache {
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// Parse `redis_url`; does not connect.
    pub fn open(redis_url: &str) -> CacheResult<Self> {
        Ok(Self {
            client: Client::open(redis_url)?,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let manager = self
            .conn
            .get_or_try_init(|| async {
                info!("Initializing Redis connection manager");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Expiry taken from the TTL stored next to each value, so `set_ex` behaves
/// like Redis `SET .. EX` and an overwrite restarts the clock.
struct EntryTtl;

impl Expiry<String, (String, Duration)> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(String, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(String, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-process cache used when no Redis URL is configured.
///
/// Bounded by entry count; expired entries are evicted by moka's
/// housekeeping whether or not they are read again.
pub struct MemoryCache {
    entries: Cache<String, (String, Duration)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryTtl)
            .build();
        Self { entries }
    }

    /// Live entries after pending evictions have been applied.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.get(key).await.map(|(value, _)| value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.entries
            .insert(
                key.to_string(),
                (value.to_string(), Duration::from_secs(ttl_secs)),
            )
            .await;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Degrading front for a [`CacheBackend`].
///
/// Every call is bounded by `timeout`. Reads answer `None` on miss, error or
/// timeout; writes never report failure.
#[derive(Clone)]
pub struct VideoCache {
    backend: Arc<dyn CacheBackend>,
    ttl_secs: u64,
    timeout: Duration,
}

impl VideoCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl_secs: u64, timeout: Duration) -> Self {
        Self {
            backend,
            ttl_secs,
            timeout,
        }
    }

    /// Cache key for a video view: `video:{id}`.
    pub fn video_key(id: Uuid) -> String {
        format!("video:{id}")
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.backend.get(key)).await {
            Ok(Ok(Some(value))) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(Ok(None)) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Ok(Err(err)) => {
                warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %err,
                    "cache get failed, treating as miss"
                );
                None
            }
            Err(_) => {
                warn!(
                    key = %key,
                    backend = self.backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "cache get timed out, treating as miss"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str) {
        match tokio::time::timeout(self.timeout, self.backend.set_ex(key, value, self.ttl_secs))
            .await
        {
            Ok(Ok(())) => debug!(key = %key, ttl = self.ttl_secs, "Cache set"),
            Ok(Err(err)) => {
                warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %err,
                    "cache set failed, ignoring"
                )
            }
            Err(_) => {
                warn!(
                    key = %key,
                    backend = self.backend.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "cache set timed out, ignoring"
                )
            }
        }
    }

    /// Reachability check for readiness reporting. Not used on request paths.
    pub async fn ping(&self) -> CacheResult<()> {
        match tokio::time::timeout(self.timeout, self.backend.ping()).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Unavailable(format!(
                "ping timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

//! VideoService: the operations exposed to the transport layer.
//!
//! Reads by id go cache first, then the store of record, and populate the
//! cache on a store hit. Writes go to the store only; cached views stay as
//! they are until their TTL runs out.

use crate::{
    errors::{VideoError, VideoResult},
    models::video::{
        CreateVideoRequest, DIRECT_ACCESS_VISIBILITIES, NewVideo, VideoRecord, VideoView,
        Visibility,
    },
    services::{
        auth::Principal, cache::VideoCache, upload_service::ensure_owned_video_key,
        video_store::SqliteVideoStore,
    },
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct VideoService {
    store: SqliteVideoStore,
    cache: VideoCache,
}

impl VideoService {
    pub fn new(store: SqliteVideoStore, cache: VideoCache) -> Self {
        Self { store, cache }
    }

    /// Register metadata for an uploaded blob. The record starts `IN_PROGRESS`.
    ///
    /// The content key must sit under the owner's own `videos/{subject}/`
    /// prefix, so nobody can claim another user's upload.
    pub async fn create_video_metadata(
        &self,
        owner: &Principal,
        request: CreateVideoRequest,
    ) -> VideoResult<VideoRecord> {
        let visibility: Visibility = request.visibility.parse()?;

        let title = request.title.trim();
        if title.is_empty() {
            return Err(VideoError::Validation("title must not be empty".into()));
        }
        let content_key = request.content_key.trim();
        if content_key.is_empty() {
            return Err(VideoError::Validation("content_key must not be empty".into()));
        }
        ensure_owned_video_key(owner, content_key)?;
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let record = self
            .store
            .save(NewVideo {
                owner_id: owner.subject_id.clone(),
                title: title.to_string(),
                description,
                content_key: content_key.to_string(),
                visibility,
            })
            .await?;

        info!(
            video_id = %record.id,
            owner = %record.owner_id,
            visibility = %record.visibility,
            "video metadata created"
        );
        Ok(record)
    }

    /// Completed public or unlisted video by id.
    ///
    /// Ids that are not UUIDs are reported like any other missing video.
    pub async fn get_video_by_id(&self, raw_id: &str) -> VideoResult<VideoView> {
        let id = parse_id(raw_id)?;
        let key = VideoCache::video_key(id);

        if let Some(payload) = self.cache.get(&key).await {
            match serde_json::from_str::<VideoView>(&payload) {
                Ok(view) => return Ok(view),
                Err(err) => {
                    warn!(key = %key, error = %err, "discarding undecodable cache entry");
                }
            }
        }

        let view = VideoView::from(self.store.find_by_id(id, &DIRECT_ACCESS_VISIBILITIES).await?);

        match serde_json::to_string(&view) {
            Ok(payload) => self.cache.set(&key, &payload).await,
            Err(err) => warn!(key = %key, error = %err, "could not serialize view for cache"),
        }

        Ok(view)
    }

    /// Every completed public video. Not cached.
    pub async fn list_public_videos(&self) -> VideoResult<Vec<VideoView>> {
        let records = self.store.list_public().await?;
        debug!(count = records.len(), "listed public videos");
        Ok(records.into_iter().map(VideoView::from).collect())
    }

    /// Resolve an object-store key to the video id, whatever its status.
    pub async fn get_video_id_by_content_key(&self, content_key: &str) -> VideoResult<Uuid> {
        Ok(self.store.find_by_content_key(content_key).await?.id)
    }

    /// Apply a status token reported by the processing pipeline.
    ///
    /// The token is parsed before anything is read or written.
    pub async fn update_processing_status(
        &self,
        raw_id: &str,
        raw_status: &str,
    ) -> VideoResult<()> {
        let status = self.store.lifecycle().parse_status(raw_status)?;
        let id = parse_id(raw_id)?;
        self.store.update_status(id, status).await
    }
}

fn parse_id(raw: &str) -> VideoResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| VideoError::NotFound(format!("video `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::video::ProcessingStatus,
        services::{
            cache::{CacheBackend, CacheError, CacheResult, MemoryCache},
            lifecycle::LifecycleManager,
        },
    };
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    #[derive(Default)]
    struct CountingCache {
        inner: MemoryCache,
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    #[async_trait]
    impl CacheBackend for CountingCache {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set_ex(key, value, ttl_secs).await
        }

        async fn ping(&self) -> CacheResult<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct DownCache;

    #[async_trait]
    impl CacheBackend for DownCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Unavailable("down".into()))
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".into()))
        }

        async fn ping(&self) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".into()))
        }

        fn name(&self) -> &'static str {
            "down"
        }
    }

    struct Fixture {
        service: VideoService,
        pool: Arc<SqlitePool>,
    }

    async fn fixture(backend: Arc<dyn CacheBackend>, lifecycle: LifecycleManager) -> Fixture {
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let store = SqliteVideoStore::new(pool.clone(), lifecycle);
        let cache = VideoCache::new(backend, 3600, Duration::from_secs(1));
        Fixture {
            service: VideoService::new(store, cache),
            pool,
        }
    }

    fn owner() -> Principal {
        Principal {
            subject_id: "sub-42".into(),
            email: "owner@example.com".into(),
            email_verified: true,
            display_name: Some("Owner".into()),
        }
    }

    fn request(key: &str, visibility: &str) -> CreateVideoRequest {
        CreateVideoRequest {
            title: "  Trip to the coast ".into(),
            description: Some("   ".into()),
            content_key: key.into(),
            visibility: visibility.into(),
        }
    }

    async fn completed(service: &VideoService, key: &str, visibility: &str) -> VideoRecord {
        let rec = service
            .create_video_metadata(&owner(), request(key, visibility))
            .await
            .unwrap();
        service
            .update_processing_status(&rec.id.to_string(), "completed")
            .await
            .unwrap();
        rec
    }

    #[tokio::test]
    async fn create_normalizes_input_and_starts_in_progress() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;

        let rec = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/a", "Unlisted"))
            .await
            .unwrap();

        assert_eq!(rec.processing_status, ProcessingStatus::InProgress);
        assert_eq!(rec.visibility, Visibility::Unlisted);
        assert_eq!(rec.title, "Trip to the coast");
        assert_eq!(rec.description, None);
        assert_eq!(rec.owner_id, "sub-42");
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;

        let bad_visibility = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/a", "secret"))
            .await;
        assert!(matches!(bad_visibility, Err(VideoError::Validation(_))));

        let mut empty_title = request("videos/sub-42/a", "public");
        empty_title.title = "   ".into();
        assert!(matches!(
            fx.service.create_video_metadata(&owner(), empty_title).await,
            Err(VideoError::Validation(_))
        ));

        fx.service
            .create_video_metadata(&owner(), request("videos/sub-42/a", "public"))
            .await
            .unwrap();
        assert!(matches!(
            fx.service
                .create_video_metadata(&owner(), request("videos/sub-42/a", "public"))
                .await,
            Err(VideoError::DuplicateContentKey(_))
        ));
    }

    #[tokio::test]
    async fn foreign_content_key_cannot_be_claimed() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;

        for key in ["videos/sub-7/clip", "videos/clip", "thumbnails/sub-42/clip"] {
            assert!(matches!(
                fx.service
                    .create_video_metadata(&owner(), request(key, "public"))
                    .await,
                Err(VideoError::Validation(_))
            ));
        }

        let owned = fx
            .service
            .create_video_metadata(&owner(), request(" videos/sub-42/clip ", "public"))
            .await
            .unwrap();
        assert_eq!(owned.content_key, "videos/sub-42/clip");
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let backend = Arc::new(CountingCache::default());
        let fx = fixture(backend.clone(), LifecycleManager::default()).await;
        let rec = completed(&fx.service, "videos/sub-42/a", "public").await;
        let id = rec.id.to_string();

        let first = fx.service.get_video_by_id(&id).await.unwrap();

        // hide the row from the store's filter; a store read would now miss
        sqlx::query("UPDATE videos SET visibility = 'PRIVATE' WHERE id = ?")
            .bind(rec.id)
            .execute(&*fx.pool)
            .await
            .unwrap();

        let second = fx.service.get_video_by_id(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.gets.load(Ordering::SeqCst), 2);
        assert_eq!(backend.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unfinished_or_private_videos_are_not_found() {
        let backend = Arc::new(CountingCache::default());
        let fx = fixture(backend.clone(), LifecycleManager::default()).await;

        let pending = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/pending", "public"))
            .await
            .unwrap();
        let private = completed(&fx.service, "videos/sub-42/private", "private").await;

        for id in [pending.id, private.id] {
            assert!(matches!(
                fx.service.get_video_by_id(&id.to_string()).await,
                Err(VideoError::NotFound(_))
            ));
        }
        assert_eq!(backend.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let backend = Arc::new(CountingCache::default());
        let fx = fixture(backend.clone(), LifecycleManager::default()).await;
        let missing = Uuid::new_v4().to_string();

        for _ in 0..3 {
            assert!(matches!(
                fx.service.get_video_by_id(&missing).await,
                Err(VideoError::NotFound(_))
            ));
        }
        assert!(matches!(
            fx.service.get_video_by_id("not-a-uuid").await,
            Err(VideoError::NotFound(_))
        ));
        assert_eq!(backend.gets.load(Ordering::SeqCst), 3);
        assert_eq!(backend.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_cache_falls_back_to_store() {
        let fx = fixture(Arc::new(DownCache), LifecycleManager::default()).await;
        let rec = completed(&fx.service, "videos/sub-42/a", "unlisted").await;

        let view = fx.service.get_video_by_id(&rec.id.to_string()).await.unwrap();
        assert_eq!(view.id, rec.id);
        assert_eq!(view.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn undecodable_cache_entry_falls_through_and_is_replaced() {
        let backend = Arc::new(MemoryCache::new());
        let fx = fixture(backend.clone(), LifecycleManager::default()).await;
        let rec = completed(&fx.service, "videos/sub-42/a", "public").await;
        let key = VideoCache::video_key(rec.id);

        backend.set_ex(&key, "{not json", 3600).await.unwrap();

        let view = fx.service.get_video_by_id(&rec.id.to_string()).await.unwrap();
        assert_eq!(view.id, rec.id);

        let cached = backend.get(&key).await.unwrap().unwrap();
        assert_eq!(serde_json::from_str::<VideoView>(&cached).unwrap(), view);
    }

    #[tokio::test]
    async fn status_writes_do_not_invalidate_cached_views() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::new(true)).await;
        let rec = completed(&fx.service, "videos/sub-42/a", "public").await;
        let id = rec.id.to_string();

        fx.service.get_video_by_id(&id).await.unwrap();
        fx.service.update_processing_status(&id, "in_progress").await.unwrap();

        // stale until TTL expiry
        let view = fx.service.get_video_by_id(&id).await.unwrap();
        assert_eq!(view.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_status_cannot_change() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;
        let rec = completed(&fx.service, "videos/sub-42/a", "public").await;

        let err = fx
            .service
            .update_processing_status(&rec.id.to_string(), "failed")
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn unknown_status_token_does_not_mutate() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;
        let rec = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/a", "public"))
            .await
            .unwrap();

        let err = fx
            .service
            .update_processing_status(&rec.id.to_string(), "done")
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::Validation(_)));

        let status: ProcessingStatus =
            sqlx::query_scalar("SELECT processing_status FROM videos WHERE id = ?")
                .bind(rec.id)
                .fetch_one(&*fx.pool)
                .await
                .unwrap();
        assert_eq!(status, ProcessingStatus::InProgress);

        assert!(matches!(
            fx.service
                .update_processing_status(&Uuid::new_v4().to_string(), "completed")
                .await,
            Err(VideoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn public_listing_appears_after_completion() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;
        let rec = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/a", "PUBLIC"))
            .await
            .unwrap();

        assert!(fx.service.list_public_videos().await.unwrap().is_empty());

        fx.service
            .update_processing_status(&rec.id.to_string(), "COMPLETED")
            .await
            .unwrap();

        let listed = fx.service.list_public_videos().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, rec.id);
    }

    #[tokio::test]
    async fn content_key_resolves_regardless_of_status() {
        let fx = fixture(Arc::new(MemoryCache::new()), LifecycleManager::default()).await;
        let rec = fx
            .service
            .create_video_metadata(&owner(), request("videos/sub-42/x", "private"))
            .await
            .unwrap();

        assert_eq!(
            fx.service
                .get_video_id_by_content_key("videos/sub-42/x")
                .await
                .unwrap(),
            rec.id
        );
        assert!(matches!(
            fx.service.get_video_id_by_content_key("videos/none").await,
            Err(VideoError::NotFound(_))
        ));
    }
}

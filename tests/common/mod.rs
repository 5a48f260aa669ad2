//! Shared helpers for the HTTP integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use video_service::db;
use video_service::routes::routes;
use video_service::services::auth::{Claims, JwtAuthenticator, SERVICE_TOKEN_HEADER, ServiceAuth};
use video_service::services::blob_store::{BlobStore, StorageError};
use video_service::services::cache::{CacheBackend, MemoryCache, VideoCache};
use video_service::services::lifecycle::LifecycleManager;
use video_service::services::upload_service::UploadService;
use video_service::services::video_service::VideoService;
use video_service::services::video_store::SqliteVideoStore;
use video_service::state::AppState;

pub const JWT_SECRET: &str = "integration-secret";
pub const SERVICE_TOKEN: &str = "pipeline-token";

/// Presigner that never leaves the process.
pub struct FakeBlobStore;

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://{bucket}.s3.example/{key}?expires={}",
            expires_in.as_secs()
        ))
    }
}

/// Build the full application router over a fresh in-memory database.
pub async fn build_test_app_with_cache(backend: Arc<dyn CacheBackend>) -> Router {
    let pool = Arc::new(db::memory_pool().await.expect("in-memory database"));
    let cache = VideoCache::new(backend, 3600, Duration::from_millis(200));
    let store = SqliteVideoStore::new(pool.clone(), LifecycleManager::default());

    let state = AppState {
        videos: VideoService::new(store, cache.clone()),
        uploads: UploadService::new(
            Arc::new(FakeBlobStore),
            "raw-videos",
            "video-thumbnails",
            Duration::from_secs(3600),
        ),
        auth: Arc::new(JwtAuthenticator::new(JWT_SECRET, None, None)),
        service_auth: Arc::new(ServiceAuth::new(Some(SERVICE_TOKEN.to_string()))),
        db: pool,
        cache,
    };

    routes::app(state)
}

pub async fn build_test_app() -> Router {
    build_test_app_with_cache(Arc::new(MemoryCache::new())).await
}

/// Signed access token for `sub`.
pub fn user_token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        email_verified: true,
        name: Some(format!("User {sub}")),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        iss: None,
        aud: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub fn user_request(method: &str, uri: &str, sub: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", user_token(sub)));
    with_body(builder, body)
}

pub fn service_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(SERVICE_TOKEN_HEADER, SERVICE_TOKEN)
        .body(Body::empty())
        .expect("request builds")
}

pub fn anonymous_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

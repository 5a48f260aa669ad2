use crate::services::{
    auth::{JwtAuthenticator, ServiceAuth},
    cache::VideoCache,
    upload_service::UploadService,
    video_service::VideoService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared handles passed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub videos: VideoService,
    pub uploads: UploadService,
    pub auth: Arc<JwtAuthenticator>,
    pub service_auth: Arc<ServiceAuth>,
    pub db: Arc<SqlitePool>,
    pub cache: VideoCache,
}

//! HTTP handlers for video metadata and upload URLs.
//! All domain logic lives in `VideoService` / `UploadService`; handlers only
//! authenticate, extract and shape responses.

use crate::{
    errors::AppError,
    handlers::extractors::{CurrentUser, ServiceCaller},
    models::video::{CreateVideoRequest, VideoIdResponse, VideoView},
    services::{auth::Principal, upload_service::MediaUploadResponse},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

/// Body of `POST /videos/thumbnail/upload-url`.
#[derive(Debug, Deserialize)]
pub struct ThumbnailUploadReq {
    pub media_id: String,
}

/// Query of `PATCH /videos/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// `GET /api/v1/auth/me`
pub async fn current_user(CurrentUser(principal): CurrentUser) -> Json<Principal> {
    Json(principal)
}

/// `POST /api/v1/videos/upload-url`
pub async fn video_upload_url(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<MediaUploadResponse>, AppError> {
    Ok(Json(state.uploads.video_upload_url(&principal).await?))
}

/// `POST /api/v1/videos/thumbnail/upload-url`
pub async fn thumbnail_upload_url(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(req): Json<ThumbnailUploadReq>,
) -> Result<Json<MediaUploadResponse>, AppError> {
    Ok(Json(
        state
            .uploads
            .thumbnail_upload_url(&principal, &req.media_id)
            .await?,
    ))
}

/// `POST /api/v1/videos/metadata`
pub async fn create_video_metadata(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(req): Json<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.videos.create_video_metadata(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(VideoView::from(record))))
}

/// `GET /api/v1/videos`
pub async fn list_public_videos(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<VideoView>>, AppError> {
    Ok(Json(state.videos.list_public_videos().await?))
}

/// `GET /api/v1/videos/{id}`
pub async fn get_video(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VideoView>, AppError> {
    Ok(Json(state.videos.get_video_by_id(&id).await?))
}

/// `GET /api/v1/videos/by-key/{*content_key}`: service-to-service.
pub async fn get_video_id_by_content_key(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(content_key): Path<String>,
) -> Result<Json<VideoIdResponse>, AppError> {
    let video_id = state.videos.get_video_id_by_content_key(&content_key).await?;
    Ok(Json(VideoIdResponse { video_id }))
}

/// `PATCH /api/v1/videos/{id}/status?status=`: service-to-service.
pub async fn update_processing_status(
    State(state): State<AppState>,
    _caller: ServiceCaller,
    Path(id): Path<String>,
    Query(q): Query<StatusQuery>,
) -> Result<StatusCode, AppError> {
    state.videos.update_processing_status(&id, &q.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Defines routes for the video metadata API.
//!
//! ## Structure
//! - **Probes** (no auth)
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **User endpoints** (`/api/v1`, provider access token)
//!   - `GET    /auth/me` : current principal
//!   - `POST   /videos/upload-url` : presigned raw-video upload
//!   - `POST   /videos/thumbnail/upload-url` : presigned thumbnail upload
//!   - `POST   /videos/metadata` : register an uploaded video
//!   - `GET    /videos` : completed public videos
//!   - `GET    /videos/{id}` : one completed public/unlisted video
//!
//! - **Service endpoints** (`/api/v1`, `x-service-token`)
//!   - `GET    /videos/by-key/{*content_key}` : id for an object-store key
//!   - `PATCH  /videos/{id}/status?status=` : processing status update
//!
//! The wildcard `*content_key` allows keys like `videos/{sub}/{uuid}`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{
            create_video_metadata, current_user, get_video, get_video_id_by_content_key,
            list_public_videos, thumbnail_upload_url, update_processing_status, video_upload_url,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

/// Build the router for all routes, still missing its state.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/auth/me", get(current_user))
        .route("/videos", get(list_public_videos))
        .route("/videos/upload-url", post(video_upload_url))
        .route("/videos/thumbnail/upload-url", post(thumbnail_upload_url))
        .route("/videos/metadata", post(create_video_metadata))
        .route(
            "/videos/by-key/{*content_key}",
            get(get_video_id_by_content_key),
        )
        .route("/videos/{id}", get(get_video))
        .route("/videos/{id}/status", patch(update_processing_status));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/api/v1", api)
}

/// The complete application: routes, access logging and shared state.
pub fn app(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}

//! Upload URL issuance for raw videos and their thumbnails.

use crate::{
    errors::{VideoError, VideoResult},
    services::{auth::Principal, blob_store::BlobStore},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

const VIDEO_PREFIX: &str = "videos/";
const THUMBNAIL_PREFIX: &str = "thumbnails/";
const VIDEO_CONTENT_TYPE: &str = "video/mp4";
const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// A presigned URL plus the object key the client uploads to.
///
/// `media_id` is what the client later submits as the video's content key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    pub url: String,
    pub media_id: String,
}

#[derive(Clone)]
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    video_bucket: String,
    thumbnail_bucket: String,
    expires_in: Duration,
}

impl UploadService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        video_bucket: impl Into<String>,
        thumbnail_bucket: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        Self {
            blobs,
            video_bucket: video_bucket.into(),
            thumbnail_bucket: thumbnail_bucket.into(),
            expires_in,
        }
    }

    /// Fresh key under `videos/{subject}/` so uploads never collide.
    pub async fn video_upload_url(
        &self,
        principal: &Principal,
    ) -> VideoResult<MediaUploadResponse> {
        let media_id = format!("{VIDEO_PREFIX}{}/{}", principal.subject_id, Uuid::new_v4());
        let url = self
            .blobs
            .presign_upload(&self.video_bucket, &media_id, VIDEO_CONTENT_TYPE, self.expires_in)
            .await?;

        tracing::info!(
            subject = %principal.subject_id,
            media_id = %media_id,
            "issued video upload URL"
        );
        Ok(MediaUploadResponse { url, media_id })
    }

    /// Thumbnail key mirrors the video key with `thumbnails/` in front. Only
    /// the uploader of the video may request it.
    pub async fn thumbnail_upload_url(
        &self,
        principal: &Principal,
        video_media_id: &str,
    ) -> VideoResult<MediaUploadResponse> {
        ensure_owned_video_key(principal, video_media_id)?;
        let media_id = thumbnail_key(video_media_id)?;
        let url = self
            .blobs
            .presign_upload(
                &self.thumbnail_bucket,
                &media_id,
                THUMBNAIL_CONTENT_TYPE,
                self.expires_in,
            )
            .await?;

        Ok(MediaUploadResponse { url, media_id })
    }
}

/// `key` must be a video key issued to `owner`, i.e. `videos/{subject}/...`.
pub fn ensure_owned_video_key(owner: &Principal, key: &str) -> VideoResult<()> {
    let owned = key
        .strip_prefix(VIDEO_PREFIX)
        .and_then(|rest| rest.strip_prefix(owner.subject_id.as_str()))
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains(".."));

    if owned {
        Ok(())
    } else {
        Err(VideoError::Validation(format!(
            "media id `{key}` is not a video uploaded by the caller"
        )))
    }
}

fn thumbnail_key(video_media_id: &str) -> VideoResult<String> {
    match video_media_id.strip_prefix(VIDEO_PREFIX) {
        Some(rest) if !rest.is_empty() && !rest.contains("..") => {
            Ok(format!("{THUMBNAIL_PREFIX}{rest}"))
        }
        _ => Err(VideoError::Validation(format!(
            "media id `{video_media_id}` is not a video key"
        ))),
    }
}

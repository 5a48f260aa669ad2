//! Video metadata records and the closed enumerations attached to them.

use crate::errors::VideoError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Access-control classification of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Unlisted => "UNLISTED",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = VideoError;

    /// Case-insensitive: `public`, `Public` and `PUBLIC` are the same token.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Visibility::Public),
            "PRIVATE" => Ok(Visibility::Private),
            "UNLISTED" => Ok(Visibility::Unlisted),
            _ => Err(VideoError::Validation(format!(
                "invalid visibility `{raw}`; expected one of public, private, unlisted"
            ))),
        }
    }
}

/// Stage of the backend processing pipeline for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    InProgress,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::InProgress => "IN_PROGRESS",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        }
    }

    /// `COMPLETED` and `FAILED` have no outgoing transitions by default.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = VideoError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Ok(ProcessingStatus::InProgress),
            "COMPLETED" => Ok(ProcessingStatus::Completed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            _ => Err(VideoError::Validation(format!(
                "invalid processing status `{raw}`; expected one of in_progress, completed, failed"
            ))),
        }
    }
}

/// Visibilities under which a completed video can be fetched directly by id.
pub const DIRECT_ACCESS_VISIBILITIES: [Visibility; 2] = [Visibility::Public, Visibility::Unlisted];

/// A persisted video metadata row.
///
/// The actual media lives in the object store under `content_key`; this
/// record only carries what the API needs to list and serve it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct VideoRecord {
    pub id: Uuid,

    /// Subject id of the principal that registered the video.
    pub owner_id: String,

    pub title: String,

    pub description: Option<String>,

    /// Object-store key of the uploaded media. Unique across records.
    pub content_key: String,

    pub visibility: Visibility,

    pub processing_status: ProcessingStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// External representation of a video, also the payload stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoView {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content_key: String,
    pub visibility: Visibility,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<VideoRecord> for VideoView {
    fn from(record: VideoRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            title: record.title,
            description: record.description,
            content_key: record.content_key,
            visibility: record.visibility,
            processing_status: record.processing_status,
            created_at: record.created_at,
        }
    }
}

/// Validated input for inserting a new record.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content_key: String,
    pub visibility: Visibility,
}

/// Request body of `POST /api/v1/videos/metadata`.
///
/// `visibility` arrives as a free-form token and is parsed by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content_key: String,
    pub visibility: String,
}

/// Response of the content-key lookup used by the processing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIdResponse {
    pub video_id: Uuid,
}

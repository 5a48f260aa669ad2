//! src/services/video_store.rs
//!
//! SqliteVideoStore: the store of record for video metadata. Every write is
//! a single statement or a transaction, so a failed call leaves no partial
//! state behind. The store knows nothing about the cache.

use crate::{
    errors::{VideoError, VideoResult},
    models::video::{NewVideo, ProcessingStatus, VideoRecord, Visibility},
    services::lifecycle::LifecycleManager,
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, content_key, visibility, \
                             processing_status, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteVideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    lifecycle: LifecycleManager,
}

impl SqliteVideoStore {
    /// `lifecycle` is consulted by [`update_status`](Self::update_status)
    /// before anything is written.
    pub fn new(db: Arc<SqlitePool>, lifecycle: LifecycleManager) -> Self {
        Self { db, lifecycle }
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Insert a new record with a fresh id and `IN_PROGRESS` status.
    ///
    /// Returns DuplicateContentKey if another record already points at the
    /// same blob.
    pub async fn save(&self, video: NewVideo) -> VideoResult<VideoRecord> {
        let now = Utc::now();

        let result = sqlx::query_as::<_, VideoRecord>(&format!(
            "INSERT INTO videos ({VIDEO_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&video.owner_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.content_key)
        .bind(video.visibility)
        .bind(ProcessingStatus::InProgress)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(record) => {
                debug!(
                    video_id = %record.id,
                    content_key = %record.content_key,
                    "saved video metadata"
                );
                Ok(record)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(VideoError::DuplicateContentKey(video.content_key))
            }
            Err(err) => Err(VideoError::Persistence(err)),
        }
    }

    /// Fetch a completed record whose visibility is one of `visible`.
    ///
    /// A missing row and a row hidden by the filter both yield NotFound.
    pub async fn find_by_id(&self, id: Uuid, visible: &[Visibility]) -> VideoResult<VideoRecord> {
        if visible.is_empty() {
            return Err(not_found(id));
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = "));
        builder.push_bind(id);
        builder.push(" AND processing_status = ");
        builder.push_bind(ProcessingStatus::Completed);
        builder.push(" AND visibility IN (");
        let mut separated = builder.separated(", ");
        for visibility in visible {
            separated.push_bind(*visibility);
        }
        separated.push_unseparated(")");
        builder.push(" LIMIT 1");

        builder
            .build_query_as::<VideoRecord>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => not_found(id),
                other => VideoError::Persistence(other),
            })
    }

    /// Exact content-key lookup with no visibility filter. Trusted callers only.
    pub async fn find_by_content_key(&self, content_key: &str) -> VideoResult<VideoRecord> {
        sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE content_key = ? LIMIT 1"
        ))
        .bind(content_key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => {
                VideoError::NotFound(format!("video with content key `{content_key}`"))
            }
            other => VideoError::Persistence(other),
        })
    }

    /// All completed public videos, oldest first.
    ///
    /// Unbounded: there is no pagination.
    pub async fn list_public(&self) -> VideoResult<Vec<VideoRecord>> {
        let rows = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos
             WHERE processing_status = ? AND visibility = ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(ProcessingStatus::Completed)
        .bind(Visibility::Public)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows)
    }

    /// Move a record to `requested` if the lifecycle allows it.
    ///
    /// - NotFound when no record has this id (regardless of visibility)
    /// - InvalidTransition when the lifecycle rejects the move, or when a
    ///   concurrent writer changed the status between read and write
    ///
    /// The read, check and write share one transaction; any error rolls it back.
    pub async fn update_status(&self, id: Uuid, requested: ProcessingStatus) -> VideoResult<()> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, ProcessingStatus>(
            "SELECT processing_status FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        self.lifecycle.validate_transition(current, requested)?;
        write_status_if_unchanged(&mut tx, id, current, requested).await?;

        tx.commit().await?;

        info!(video_id = %id, from = %current, to = %requested, "processing status transition");
        Ok(())
    }
}

/// Write `requested` only while the row still holds `expected`. A row that
/// moved on in the meantime is reported as an invalid transition from the
/// status this writer based its decision on, and nothing is written.
async fn write_status_if_unchanged(
    conn: &mut SqliteConnection,
    id: Uuid,
    expected: ProcessingStatus,
    requested: ProcessingStatus,
) -> VideoResult<()> {
    let result = sqlx::query(
        "UPDATE videos SET processing_status = ?, updated_at = ?
         WHERE id = ? AND processing_status = ?",
    )
    .bind(requested)
    .bind(Utc::now())
    .bind(id)
    .bind(expected)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(VideoError::InvalidTransition {
            from: expected,
            to: requested,
        });
    }
    Ok(())
}

fn not_found(id: Uuid) -> VideoError {
    VideoError::NotFound(format!("video `{id}`"))
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

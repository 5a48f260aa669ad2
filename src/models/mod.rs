//! Core data models for the video metadata service.
//!
//! Records map to database rows via `sqlx::FromRow`; views serialize as JSON
//! via `serde` and double as the cached payload.

pub mod video;

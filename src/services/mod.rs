//! Domain services: the store of record, the read cache, the status
//! lifecycle, the orchestrating `VideoService`, and the external
//! collaborators (identity tokens, object-store upload URLs).

pub mod auth;
pub mod blob_store;
pub mod cache;
pub mod lifecycle;
pub mod upload_service;
pub mod video_service;
pub mod video_store;

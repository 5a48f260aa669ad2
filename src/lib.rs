//! Video metadata API: presigned uploads, metadata persistence in SQLite, a
//! read-through cache for lookups by id, and the processing-status lifecycle.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

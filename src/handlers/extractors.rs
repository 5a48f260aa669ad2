//! Request extractors that authenticate the caller.

use crate::{errors::AppError, services::auth::Principal, state::AppState};
use axum::{extract::FromRequestParts, http::request::Parts};

/// End-user principal from the provider's access token.
pub struct CurrentUser(pub Principal);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = state.auth.authenticate_headers(&parts.headers)?;
        Ok(CurrentUser(principal))
    }
}

/// A trusted internal caller (the processing pipeline).
pub struct ServiceCaller;

impl FromRequestParts<AppState> for ServiceCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.service_auth.verify_headers(&parts.headers)?;
        Ok(ServiceCaller)
    }
}

use crate::extractors::RejectionType;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use log::*;
use sse::connection::UserId;

/// The user id resolved by the upstream session provider.
pub(crate) struct AuthenticatedUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    // Authentication happens before requests reach this service. The session
    // provider forwards the user id in the configured identity header; a
    // missing or blank header means the caller was never authenticated.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_name = state.config.identity_header();

        match parts
            .headers
            .get(header_name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
        {
            Some(user_id) => Ok(AuthenticatedUser(user_id.to_string())),
            None => {
                debug!("Request to {} without a {header_name} header", parts.uri);
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}

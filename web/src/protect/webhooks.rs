use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use log::*;

pub(crate) const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Checks the `x-webhook-secret` header against the configured secret.
/// Requests pass untouched when no secret is configured.
/// Intended to be given to axum::middleware::from_fn_with_state in the router
pub(crate) async fn require_secret(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> impl IntoResponse {
    let Some(expected_secret) = app_state.config.webhook_secret() else {
        return next.run(request).await;
    };

    let provided_secret = request
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided_secret == expected_secret {
        next.run(request).await
    } else {
        warn!("Invalid webhook secret received for {}", request.uri());
        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
    }
}

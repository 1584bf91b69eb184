use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET /health
///
/// Liveness probe. Does not require authentication.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

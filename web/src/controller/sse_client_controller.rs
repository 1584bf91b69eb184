use crate::controller::ApiResponse;
use crate::AppState;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConnectedClients {
    pub count: usize,
    pub user_ids: Vec<String>,
}

/// GET /sse/clients
///
/// Lists the users with a live SSE connection. Guarded by the webhook secret.
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let mut user_ids: Vec<String> = app_state
        .sse_manager
        .connected_users()
        .into_iter()
        .collect();
    user_ids.sort();

    Json(ApiResponse::new(
        StatusCode::OK.into(),
        ConnectedClients {
            count: user_ids.len(),
            user_ids,
        },
    ))
}

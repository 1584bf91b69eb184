//! Controller for the publish webhook.
//!
//! Other backends call this endpoint to push an event to one connected user
//! or to everyone connected.

use crate::controller::ApiResponse;
use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sse::message::{Event as SseEvent, Message as SseMessage, MessageScope};

/// Publish webhook payload
#[derive(Debug, Deserialize)]
pub struct PublishPayload {
    /// Optional SSE event name. Omitted or empty means an unnamed event.
    pub event: Option<String>,
    /// Any JSON value; sent as the event's `data:` line.
    #[serde(default)]
    pub data: Value,
    /// Target user. Omitted means broadcast.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Broadcasted,
    Delivered,
    NotDelivered,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub status: PublishStatus,
}

/// POST /webhooks/sse
///
/// Pushes `data` to `user_id` if given, otherwise to every connected user.
/// Guarded by the webhook secret when one is configured.
pub async fn publish(
    State(app_state): State<AppState>,
    Json(payload): Json<PublishPayload>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "Received SSE publish webhook (event: {:?}, user: {:?})",
        payload.event, payload.user_id
    );

    let event = SseEvent::new(payload.event.as_deref(), &payload.data)?;

    let status = match payload.user_id {
        Some(user_id) => {
            let delivered = app_state
                .sse_manager
                .send_message(SseMessage {
                    event,
                    scope: MessageScope::User { user_id },
                })
                .await;
            if delivered {
                PublishStatus::Delivered
            } else {
                PublishStatus::NotDelivered
            }
        }
        None => {
            app_state
                .sse_manager
                .send_message(SseMessage {
                    event,
                    scope: MessageScope::Broadcast,
                })
                .await;
            PublishStatus::Broadcasted
        }
    };

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            StatusCode::OK.into(),
            PublishResponse { status },
        )),
    ))
}

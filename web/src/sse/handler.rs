use crate::extractors::authenticated_user::AuthenticatedUser;
use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::IntoResponse;
use log::*;
use service::AppState;
use sse::connection::{ChannelConnection, ConnectionId, UserId};
use sse::Manager;
use std::convert::Infallible;
use std::sync::Arc;

/// Pushed to every client right after its connection is registered.
const CONNECT_GREETING: &str = "Hi";

/// SSE handler that establishes a long-lived connection for real-time updates.
/// One connection per authenticated user; a newer connection replaces an older one.
pub(crate) async fn sse_handler(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    debug!("Establishing SSE connection for user {user_id}");

    let (connection, mut rx) = ChannelConnection::new();
    let manager = app_state.sse_manager.clone();
    let connection_id = manager
        .register_connection(user_id.clone(), Arc::new(connection))
        .await;

    // Buffered in the channel until the body is first polled.
    manager.send_to(&user_id, CONNECT_GREETING, None).await;

    let guard = ConnectionGuard {
        manager,
        user_id,
        connection_id,
    };

    // Chunks arrive already framed; the body just forwards them. The stream
    // ends when the handle is closed, and the guard runs when the body is
    // dropped, which covers both a server-side close and a client abort.
    let stream = stream! {
        let _guard = guard;
        while let Some(chunk) = rx.recv().await {
            yield Ok::<_, Infallible>(chunk);
        }
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            // Stop nginx from buffering the stream.
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(stream),
    )
}

/// Unregisters exactly the connection it was created for when dropped.
struct ConnectionGuard {
    manager: Arc<Manager>,
    user_id: UserId,
    connection_id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!("SSE connection closed for user {}, cleaning up", self.user_id);

        let manager = Arc::clone(&self.manager);
        let user_id = std::mem::take(&mut self.user_id);
        let connection_id = self.connection_id.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    manager
                        .unregister_connection(&user_id, &connection_id)
                        .await;
                });
            }
            Err(_) => warn!(
                "No async runtime to unregister SSE connection {} for user {}",
                connection_id.as_str(),
                user_id
            ),
        }
    }
}

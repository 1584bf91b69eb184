use crate::{
    controller::{health_check_controller, sse_client_controller, webhook_controller},
    protect, sse, AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(sse_routes(app_state.clone()))
        .merge(sse_client_routes(app_state.clone()))
        .merge(webhook_routes(app_state))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Long-lived event stream for the authenticated user
fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse::handler::sse_handler))
        .with_state(app_state)
}

fn sse_client_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/clients", get(sse_client_controller::index))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            protect::webhooks::require_secret,
        ))
        .with_state(app_state)
}

fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/webhooks/sse", post(webhook_controller::publish))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            protect::webhooks::require_secret,
        ))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::webhooks::WEBHOOK_SECRET_HEADER;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use service::config::Config;
    use ::sse::connection::ChannelConnection;
    use ::sse::Manager;
    use clap::Parser;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(webhook_secret: Option<&str>) -> AppState {
        let config = Config::try_parse_from(["sse_fanout"])
            .unwrap()
            .set_identity_header("x-user-id")
            .set_webhook_secret(webhook_secret.map(str::to_string));
        AppState::new(config, &Arc::new(Manager::new()))
    }

    fn publish_request(body: Value, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/sse")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = secret {
            builder = builder.header(WEBHOOK_SECRET_HEADER, secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_responds_ok() {
        let app = define_routes(test_state(None));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sse_without_identity_is_unauthorized() {
        let app_state = test_state(None);
        let app = define_routes(app_state.clone());
        let request = Request::builder().uri("/sse").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app_state.sse_manager.client_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_streams_greeting_and_cleans_up_on_drop() {
        let app_state = test_state(None);
        let app = define_routes(app_state.clone());
        let request = Request::builder()
            .uri("/sse")
            .header("x-user-id", "u1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(app_state.sse_manager.client_count(), 1);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: \"Hi\"\n\n");

        app_state
            .sse_manager
            .send_to("u1", &json!({"message": "Hello"}), Some("greeting"))
            .await;
        let second = body.next().await.unwrap().unwrap();
        assert_eq!(
            &second[..],
            b"event: greeting\ndata: {\"message\":\"Hello\"}\n\n"
        );

        drop(body);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(app_state.sse_manager.client_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_reconnect_replaces_previous_stream() {
        let app_state = test_state(None);
        let app = define_routes(app_state.clone());
        let connect = || {
            Request::builder()
                .uri("/sse")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(connect()).await.unwrap();
        let second = app.oneshot(connect()).await.unwrap();

        // The superseded stream ends after its greeting.
        let mut first_body = first.into_body().into_data_stream();
        assert!(first_body.next().await.is_some());
        assert!(first_body.next().await.is_none());
        drop(first_body);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Tearing down the old body must not evict the new connection.
        assert_eq!(app_state.sse_manager.client_count(), 1);
        drop(second);
    }

    #[tokio::test]
    async fn test_webhook_broadcasts_to_registered_clients() {
        let app_state = test_state(None);
        let (connection, mut rx) = ChannelConnection::new();
        app_state
            .sse_manager
            .register_connection("u1", Arc::new(connection))
            .await;
        let app = define_routes(app_state.clone());

        let response = app
            .oneshot(publish_request(
                json!({"event": "announcement", "data": {"message": "Hey"}}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status_code": 200, "data": {"status": "broadcasted"}})
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            "event: announcement\ndata: {\"message\":\"Hey\"}\n\n"
        );
    }

    #[tokio::test]
    async fn test_webhook_targets_single_user() {
        let app_state = test_state(None);
        let (connection, mut rx) = ChannelConnection::new();
        app_state
            .sse_manager
            .register_connection("u1", Arc::new(connection))
            .await;
        let app = define_routes(app_state);

        let delivered = app
            .clone()
            .oneshot(publish_request(
                json!({"user_id": "u1", "data": {"message": "Hello"}}),
                None,
            ))
            .await
            .unwrap();
        let missing = app
            .oneshot(publish_request(
                json!({"user_id": "u2", "data": {"message": "Hello"}}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(json_body(delivered).await["data"]["status"], "delivered");
        assert_eq!(json_body(missing).await["data"]["status"], "not_delivered");
        assert_eq!(rx.try_recv().unwrap(), "data: {\"message\":\"Hello\"}\n\n");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_secret() {
        let app = define_routes(test_state(Some("s3cret")));

        let missing = app
            .clone()
            .oneshot(publish_request(json!({"data": 1}), None))
            .await
            .unwrap();
        let wrong = app
            .clone()
            .oneshot(publish_request(json!({"data": 1}), Some("guess")))
            .await
            .unwrap();
        let right = app
            .oneshot(publish_request(json!({"data": 1}), Some("s3cret")))
            .await
            .unwrap();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(right.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_rejects_event_name_with_line_break() {
        let app = define_routes(test_state(None));

        let response = app
            .oneshot(publish_request(
                json!({"event": "a\ndata: injected", "data": 1}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_client_listing_is_sorted_and_protected() {
        let app_state = test_state(Some("s3cret"));
        let mut receivers = Vec::new();
        for user_id in ["u2", "u1"] {
            let (connection, rx) = ChannelConnection::new();
            receivers.push(rx);
            app_state
                .sse_manager
                .register_connection(user_id, Arc::new(connection))
                .await;
        }
        let app = define_routes(app_state);

        let unauthorized = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sse/clients")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = app
            .oneshot(
                Request::builder()
                    .uri("/sse/clients")
                    .header(WEBHOOK_SECRET_HEADER, "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(listed).await["data"],
            json!({"count": 2, "user_ids": ["u1", "u2"]})
        );
    }
}

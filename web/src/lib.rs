use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use log::*;
use ::sse::Manager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
pub(crate) mod extractors;
pub(crate) mod protect;
mod router;
mod sse;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    info!(
        "Server starting... listening for connections on http://{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );

    let host = app_state.config.interface().to_string();
    let port = app_state.config.port;
    let server_url = format!("{host}:{port}");
    let listener = TcpListener::bind(server_url).await?;

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    info!("allowed_origins: {:#?}", allowed_origins);

    let identity_header = HeaderName::try_from(app_state.config.identity_header())
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            identity_header,
            HeaderName::from_static(protect::webhooks::WEBHOOK_SECRET_HEADER),
        ])
        .allow_origin(allowed_origins);

    let sse_manager = Arc::clone(&app_state.sse_manager);
    let app = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sse_manager))
        .await
}

/// Resolves on ctrl-c or SIGTERM. Open SSE bodies never finish on their own,
/// so every connection is closed before axum waits on in-flight requests.
async fn shutdown_signal(sse_manager: Arc<Manager>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing SSE connections");
    sse_manager.shutdown();
}

//! SSE fan-out service.
//!
//! Holds one long-lived Server-Sent Events stream per connected user and lets
//! other backends push JSON events to a single user or to everyone through a
//! webhook. A background sweeper writes a heartbeat comment to every stream
//! so dead clients are found and removed.

use events::EventPublisher;
use log::*;
use service::{config::Config, connection_log::ConnectionLogHandler, logging::Logger, AppState};
use sse::Manager;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting SSE fan-out service [{}] with a {}s heartbeat",
        config.runtime_env(),
        config.heartbeat_interval_secs
    );

    let publisher = EventPublisher::new().with_handler(Arc::new(ConnectionLogHandler::new()));
    let sse_manager = Arc::new(Manager::with_publisher(publisher));
    sse_manager.start_heartbeat(config.heartbeat_interval());

    let app_state = AppState::new(config, &sse_manager);

    if let Err(err) = web::init_server(app_state).await {
        error!("Server failed: {err}");
        std::process::exit(1);
    }

    info!("Server stopped");
}

use async_trait::async_trait;
use events::{ConnectionEvent, EventHandler};
use log::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Logs connection lifecycle changes and remembers the highest number of
/// simultaneously connected clients seen by this process.
#[derive(Debug, Default)]
pub struct ConnectionLogHandler {
    peak_clients: AtomicUsize,
}

impl ConnectionLogHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak_clients(&self) -> usize {
        self.peak_clients.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for ConnectionLogHandler {
    async fn handle(&self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::ClientAdded {
                user_id,
                client_count,
            } => {
                let previous_peak = self.peak_clients.fetch_max(*client_count, Ordering::Relaxed);
                if *client_count > previous_peak {
                    info!("New peak of {client_count} connected SSE clients");
                }
                debug!("SSE client {user_id} connected ({client_count} total)");
            }
            ConnectionEvent::ClientRemoved {
                user_id,
                client_count,
            } => {
                debug!("SSE client {user_id} disconnected ({client_count} remaining)");
            }
        }
    }
}

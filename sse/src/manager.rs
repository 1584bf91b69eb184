use crate::connection::{ConnectionHandle, ConnectionId, UserId};
use crate::heartbeat::{self, Heartbeat};
use crate::message::{Event, Message as SseMessage, MessageScope};
use crate::registry::{ConnectionRegistry, RegisteredConnection};
use events::{ConnectionEvent, EventPublisher};
use log::*;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Owns the connection registry and routes events to it.
///
/// Construct exactly one per process and share it as `Arc<Manager>`; every
/// route and background task that pushes events must receive that same
/// instance. Dropping the last `Arc` stops the heartbeat sweeper.
pub struct Manager {
    registry: ConnectionRegistry,
    publisher: EventPublisher,
    heartbeat: Heartbeat,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_publisher(EventPublisher::new())
    }

    /// Create a manager whose lifecycle notifications go to `publisher`.
    pub fn with_publisher(publisher: EventPublisher) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            publisher,
            heartbeat: Heartbeat::new(),
        }
    }

    pub(crate) fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register `handle` as the live connection for `user_id` and return its id.
    ///
    /// A connection already registered for the same user is closed first, so a
    /// user never keeps a stale stream open after reconnecting.
    pub async fn register_connection(
        &self,
        user_id: impl Into<UserId>,
        handle: Arc<dyn ConnectionHandle>,
    ) -> ConnectionId {
        let user_id = user_id.into();
        let (connection_id, previous) = self.registry.register(user_id.clone(), handle);

        if let Some(previous) = previous {
            info!(
                "Replacing SSE connection {} for user {}",
                previous.connection_id.as_str(),
                user_id
            );
            close_handle(&user_id, &previous);
        }

        let client_count = self.registry.len();
        info!("Client added for user {user_id}. Total clients: {client_count}");
        self.publisher
            .publish(ConnectionEvent::ClientAdded {
                user_id,
                client_count,
            })
            .await;

        connection_id
    }

    /// Close and remove the user's connection. No-op for unknown users.
    pub async fn unregister(&self, user_id: &str) {
        if let Some(connection) = self.registry.remove(user_id) {
            self.finish_removal(user_id, connection).await;
        }
    }

    /// Close and remove the user's connection only if it is still `connection_id`.
    ///
    /// Teardown paths use this so a connection that was already replaced by a
    /// newer one never evicts its successor.
    pub async fn unregister_connection(&self, user_id: &str, connection_id: &ConnectionId) {
        if let Some(connection) = self.registry.remove_connection(user_id, connection_id) {
            self.finish_removal(user_id, connection).await;
        }
    }

    async fn finish_removal(&self, user_id: &str, connection: RegisteredConnection) {
        close_handle(user_id, &connection);

        let client_count = self.registry.len();
        info!("Client removed for user {user_id}. Remaining clients: {client_count}");
        self.publisher
            .publish(ConnectionEvent::ClientRemoved {
                user_id: user_id.to_string(),
                client_count,
            })
            .await;
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<dyn ConnectionHandle>> {
        self.registry.get(user_id).map(|connection| connection.handle)
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn connected_users(&self) -> HashSet<UserId> {
        self.registry.user_ids()
    }

    /// Send one event to a single user.
    ///
    /// Returns `false` when the user has no connection, when the event cannot
    /// be built, or when the write fails (the connection is evicted then).
    pub async fn send_to<T>(&self, user_id: &str, data: &T, event_name: Option<&str>) -> bool
    where
        T: Serialize + ?Sized,
    {
        match Event::new(event_name, data) {
            Ok(event) => self.deliver(user_id, &event.to_frame(), event.name()).await,
            Err(e) => {
                error!("Failed to build SSE event for user {user_id}: {e}");
                false
            }
        }
    }

    /// Send one event to every user connected when the broadcast starts.
    pub async fn broadcast<T>(&self, data: &T, event_name: Option<&str>)
    where
        T: Serialize + ?Sized,
    {
        match Event::new(event_name, data) {
            Ok(event) => {
                self.broadcast_event(&event).await;
            }
            Err(e) => error!("Failed to build SSE broadcast event: {e}"),
        }
    }

    /// Send a pre-built message based on its scope.
    ///
    /// For `User` scope the result is whether the user received it; for
    /// `Broadcast` it is whether any client was connected.
    pub async fn send_message(&self, message: SseMessage) -> bool {
        match message.scope {
            MessageScope::User { user_id } => {
                self.deliver(&user_id, &message.event.to_frame(), message.event.name())
                    .await
            }
            MessageScope::Broadcast => self.broadcast_event(&message.event).await,
        }
    }

    async fn broadcast_event(&self, event: &Event) -> bool {
        info!(
            "Broadcasting message to all clients{}",
            describe_event(event.name())
        );

        // Evictions triggered by this broadcast must not skip or repeat anyone.
        let user_ids: Vec<UserId> = self.registry.user_ids().into_iter().collect();
        if user_ids.is_empty() {
            warn!("No clients to broadcast to");
            return false;
        }

        let frame = event.to_frame();
        for user_id in &user_ids {
            self.deliver(user_id, &frame, event.name()).await;
        }
        true
    }

    async fn deliver(&self, user_id: &str, frame: &str, event_name: Option<&str>) -> bool {
        let Some(connection) = self.registry.get(user_id) else {
            warn!("No client found for user {user_id}");
            return false;
        };

        match connection.handle.write(frame) {
            Ok(()) => {
                debug!(
                    "Sent message to user {}{}",
                    user_id,
                    describe_event(event_name)
                );
                true
            }
            Err(e) => {
                error!("Error sending message to user {user_id}: {e}");
                self.unregister_connection(user_id, &connection.connection_id)
                    .await;
                false
            }
        }
    }

    /// Start (or restart) the heartbeat sweeper with the given period.
    /// Any sweeper already running is cancelled first.
    pub fn start_heartbeat(self: &Arc<Self>, period: Duration) {
        self.heartbeat.start(Arc::downgrade(self), period);
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    /// Run a single heartbeat pass right now.
    pub async fn sweep(&self) {
        heartbeat::sweep(self).await;
    }

    /// Close every connection and empty the registry.
    pub fn clear(&self) {
        let drained = self.registry.drain();
        for (user_id, connection) in &drained {
            close_handle(user_id, connection);
        }
        info!("Closed {} SSE connection(s)", drained.len());
    }

    /// Stop the heartbeat and close every connection. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if self.heartbeat.stop() {
            info!("Heartbeat sweeper stopped");
        }
        self.clear();
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

fn close_handle(user_id: &str, connection: &RegisteredConnection) {
    if let Err(e) = connection.handle.close() {
        warn!("Error ending response for user {user_id}: {e}");
    }
}

fn describe_event(event_name: Option<&str>) -> String {
    event_name
        .map(|name| format!(" (event: {name})"))
        .unwrap_or_default()
}

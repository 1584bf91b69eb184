//! Connection lifecycle notifications for the SSE fan-out service.
//!
//! This crate lets infrastructure concerns (auditing, metrics, debugging
//! output) observe who connects and disconnects without the core registry
//! knowing about them.
//!
//! # Architecture
//!
//! - **ConnectionEvent**: Enum representing every lifecycle change the registry reports
//! - **EventHandler**: Trait for implementing observers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, so the `sse` crate can
//! depend on it without cycles.

use async_trait::async_trait;
use std::sync::Arc;

/// Stable identity of one logical connected client.
pub type UserId = String;

/// Lifecycle changes emitted by the connection registry.
///
/// `client_count` is the number of registered clients right after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection was registered for `user_id` (possibly replacing an older one).
    ClientAdded { user_id: UserId, client_count: usize },
    /// The connection for `user_id` was closed and removed from the registry.
    ClientRemoved { user_id: UserId, client_count: usize },
}

impl ConnectionEvent {
    pub fn user_id(&self) -> &str {
        match self {
            ConnectionEvent::ClientAdded { user_id, .. } => user_id,
            ConnectionEvent::ClientRemoved { user_id, .. } => user_id,
        }
    }
}

/// Trait for observing connection events.
/// Implementations can perform side effects like logging or counting.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ConnectionEvent);
}

/// Publishes connection events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher where the manager is constructed.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers, one after another.
    pub async fn publish(&self, event: ConnectionEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

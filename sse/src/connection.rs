use crate::error::{Error, Result};
use log::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub use events::UserId;

/// Unique identifier for a registered connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a connection handle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted but not yet registered.
    Pending,
    /// Registered, receiving pushes and heartbeats.
    Active,
    /// Unregistered or dead; the sink has been released.
    Closed,
}

const PENDING: u8 = 0;
const ACTIVE: u8 = 1;
const CLOSED: u8 = 2;

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            PENDING => ConnectionState::Pending,
            ACTIVE => ConnectionState::Active,
            _ => ConnectionState::Closed,
        }
    }
}

/// A writable, closable output channel attached to one client.
///
/// The registry, dispatcher and heartbeat only ever talk to this trait, so they
/// stay agnostic of the transport carrying the bytes. Implementations must make
/// `close` idempotent, and a write after close must return an error (never
/// panic, never reach the sink).
pub trait ConnectionHandle: Send + Sync {
    /// Write one raw, already framed chunk to the client.
    fn write(&self, chunk: &str) -> Result<()>;

    /// Terminate the stream.
    fn close(&self) -> Result<()>;

    /// Whether the stream is terminated, either locally or by the remote end.
    fn is_closed(&self) -> bool;

    /// Called by the registry when this handle becomes a user's live connection.
    fn activate(&self) {}
}

/// Connection handle backed by an unbounded channel.
///
/// The receiving half is turned into the HTTP response body by the web layer.
/// Dropping the response body (client went away) drops the receiver, which
/// this handle then reports as closed.
pub struct ChannelConnection {
    state: AtomicU8,
    sender: Mutex<Option<UnboundedSender<String>>>,
}

impl ChannelConnection {
    /// Create a pending connection and the receiver that yields its chunks.
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            state: AtomicU8::new(PENDING),
            sender: Mutex::new(Some(tx)),
        };
        (connection, rx)
    }

    pub fn state(&self) -> ConnectionState {
        match ConnectionState::from(self.state.load(Ordering::Acquire)) {
            ConnectionState::Closed => ConnectionState::Closed,
            _ if self.receiver_dropped() => ConnectionState::Closed,
            state => state,
        }
    }

    fn receiver_dropped(&self) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        sender.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl ConnectionHandle for ChannelConnection {
    fn write(&self, chunk: &str) -> Result<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = match sender.as_ref() {
            Some(tx) if self.state.load(Ordering::Acquire) != CLOSED => tx,
            _ => return Err(Error::Closed),
        };

        tx.send(chunk.to_owned()).map_err(|_| {
            self.state.store(CLOSED, Ordering::Release);
            Error::Disconnected("response stream dropped by the client".to_string())
        })
    }

    fn close(&self) -> Result<()> {
        self.state.store(CLOSED, Ordering::Release);
        // Dropping the sender ends the response stream once buffered chunks drain.
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            trace!("Channel connection closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    fn activate(&self) {
        let _ = self
            .state
            .compare_exchange(PENDING, ACTIVE, Ordering::AcqRel, Ordering::Acquire);
    }
}

//! Server-Sent Events (SSE) fan-out core.
//!
//! This crate tracks one live streaming connection per user and pushes
//! events to a single user or to everyone connected.
//!
//! # Architecture
//!
//! - **Transport-agnostic handles**: the registry, dispatcher and heartbeat
//!   only see the `ConnectionHandle` trait (write / close / is-closed). The
//!   web layer supplies `ChannelConnection`, whose receiver becomes the HTTP
//!   response body.
//! - **One connection per user**: registering a user that is already
//!   connected closes the older stream and replaces it.
//! - **User and Broadcast scopes**: messages go to one user or to a snapshot
//!   of everyone connected when the broadcast starts.
//! - **Ephemeral messages**: nothing is stored. A user who is offline misses
//!   the event.
//! - **Heartbeat sweeper**: a single background task writes a comment frame
//!   to every open stream each period and evicts streams that are gone.
//!
//! # Message Flow
//!
//! 1. Frontend opens `/sse`; the web layer resolves the user from the session
//! 2. A `ChannelConnection` is registered through `Manager::register_connection`
//! 3. A publish trigger calls `Manager::send_to`, `Manager::broadcast` or
//!    `Manager::send_message`
//! 4. The event is framed once (`event:` / `data:` lines) and written to each
//!    target handle; any write failure evicts that handle
//! 5. When the client goes away, the response body is dropped and the exact
//!    connection is unregistered
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! app_state
//!     .sse_manager
//!     .send_to(&user_id, &json!({"message": "Hi"}), Some("greeting"))
//!     .await;
//! ```
//!
//! # Modules
//!
//! - `connection`: `ConnectionHandle` contract, lifecycle states and the channel transport
//! - `registry`: concurrent user_id -> connection map
//! - `manager`: registration lifecycle and message routing
//! - `heartbeat`: periodic keep-alive and dead connection eviction
//! - `message`: event framing and message scopes
//! - `error`: core error type

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod manager;
pub mod message;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use manager::Manager;

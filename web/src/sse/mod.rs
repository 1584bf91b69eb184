//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler that accepts streaming
//! connections. The core SSE infrastructure (Manager, ConnectionRegistry,
//! heartbeat, framing) lives in the `sse` crate.

pub mod handler;

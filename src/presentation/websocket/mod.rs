//! WebSocket Transport
//!
//! The axum-facing side of the realtime subsystem: handshake, per-
//! connection tasks, and client command handling. The registries and the
//! router themselves live in [`crate::realtime`].

pub mod handler;

pub use handler::ws_handler;

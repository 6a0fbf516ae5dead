//! # Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket transport.

pub mod http;
pub mod middleware;
pub mod websocket;

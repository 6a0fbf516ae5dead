//! HTTP Middleware
//!
//! Authentication and CORS layers.

pub mod auth;
pub mod cors;

pub use auth::{auth_middleware, decode_user_id, AuthUser};
pub use cors::create_cors_layer;

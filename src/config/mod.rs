//! Configuration Management
//!
//! Layered settings loading from files and environment variables.

pub mod settings;

pub use settings::{
    CorsSettings, DatabaseSettings, JwtSettings, ServerSettings, Settings, WebSocketSettings,
};

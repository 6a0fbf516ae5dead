//! # Parley Library
//!
//! This crate provides a real-time messaging backend with:
//! - RESTful HTTP API endpoints driving the lifecycle state machines
//! - WebSocket delivery of typed events to online conversation members
//! - PostgreSQL as the system of record
//!
//! ## Architecture
//!
//! The crate follows a layered architecture:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Realtime Core**: Presence registry, membership directory and the
//!   event broadcast router
//! - **Infrastructure Layer**: Database and metrics implementations
//! - **Presentation Layer**: HTTP handlers and the WebSocket transport
//!
//! ## Module Structure
//!
//! ```text
//! parley/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and traits
//! +-- application/    Application services and DTOs
//! +-- realtime/       Presence, membership directory, event router
//! +-- infrastructure/ Database and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Realtime delivery core
pub mod realtime;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;

//! # Realtime Delivery Subsystem
//!
//! The core of the backend: who is reachable right now, which
//! conversations they belong to, and how committed state changes fan out
//! to their sessions.
//!
//! - **presence**: one live session per user, superseded on reconnect,
//!   evicted on transport failure
//! - **directory**: per-user conversation membership, rebuilt from storage
//!   on connect
//! - **router**: best-effort fan-out of typed events to user /
//!   conversation / global scopes
//! - **events**: the closed event and command catalog plus the wire
//!   envelope
//!
//! Broadcasts are fire-and-forget; the REST listing endpoints serve as the
//! client's reconciliation pull for anything missed.

pub mod directory;
pub mod events;
pub mod presence;
pub mod router;

pub use directory::MembershipDirectory;
pub use events::{ClientCommand, EventEnvelope, ServerEvent};
pub use presence::{OutboundFrame, PresenceRegistry, SessionHandle};
pub use router::EventRouter;

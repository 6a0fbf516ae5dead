//! Presence Registry
//!
//! Tracks the single live transport session per connected user. The
//! registry is a volatile cache of "who is reachable right now"; membership
//! truth always comes from storage.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::EventEnvelope;
use crate::infrastructure::metrics;

/// Frames flowing to a connection's writer task.
#[derive(Debug)]
pub enum OutboundFrame {
    Event(Box<EventEnvelope>),
    /// Instructs the writer task to close the socket (e.g. the session was
    /// superseded by a newer connection for the same user).
    Close { reason: &'static str },
}

/// Handle to one live session: its ID plus the queue feeding its writer
/// task. Sends are queue pushes and never block the caller.
#[derive(Debug)]
pub struct SessionHandle {
    session_id: Uuid,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl SessionHandle {
    pub fn new(session_id: Uuid, sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { session_id, sender }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn push(&self, frame: OutboundFrame) -> bool {
        self.sender.send(frame).is_ok()
    }
}

/// Registry of live sessions, at most one per user.
///
/// Shared mutable state accessed from every connection task and request
/// handler; DashMap provides the per-shard locking.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Store the user's session, forcibly closing any previous one.
    pub fn register(&self, user_id: Uuid, handle: SessionHandle) {
        let session_id = handle.session_id;
        if let Some(old) = self.sessions.insert(user_id, handle) {
            // Old writer task closes the socket; its receive loop then runs
            // the normal disconnect path, which the session-id guard below
            // turns into a no-op.
            old.push(OutboundFrame::Close {
                reason: "superseded",
            });
            tracing::info!(
                user_id = %user_id,
                old_session_id = %old.session_id,
                "Existing session superseded by new connection"
            );
        }
        metrics::set_ws_connections(self.sessions.len());
        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            total_connections = self.sessions.len(),
            "Session registered"
        );
    }

    /// Remove the user's session only if it is still `session_id`.
    ///
    /// Returns true if this call removed the current session. A superseded
    /// connection's cleanup must not evict its successor, so disconnect
    /// paths go through this guard.
    pub fn unregister(&self, user_id: Uuid, session_id: Uuid) -> bool {
        let removed = self
            .sessions
            .remove_if(&user_id, |_, handle| handle.session_id == session_id)
            .is_some();
        if removed {
            metrics::set_ws_connections(self.sessions.len());
            tracing::info!(
                user_id = %user_id,
                session_id = %session_id,
                total_connections = self.sessions.len(),
                "Session unregistered"
            );
        }
        removed
    }

    /// Unconditionally drop the user's session. Idempotent.
    pub fn evict(&self, user_id: Uuid) {
        if self.sessions.remove(&user_id).is_some() {
            metrics::set_ws_connections(self.sessions.len());
            tracing::info!(user_id = %user_id, "Session evicted");
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.sessions.contains_key(&user_id)
    }

    /// IDs of all currently connected users.
    pub fn online_users(&self) -> Vec<Uuid> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Queue an envelope for the user's session.
    ///
    /// On transport failure the session is evicted (treated as a
    /// disconnect) and false is returned. No retry, no queueing beyond the
    /// session's own channel.
    pub fn send(&self, user_id: Uuid, envelope: EventEnvelope) -> bool {
        let pushed = match self.sessions.get(&user_id) {
            Some(handle) => handle.push(OutboundFrame::Event(Box::new(envelope))),
            None => return false,
        };

        if !pushed {
            tracing::warn!(user_id = %user_id, "Send failed, evicting dead session");
            metrics::record_delivery_failure();
            self.evict(user_id);
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::{PongPayload, ServerEvent};

    fn handle() -> (SessionHandle, mpsc::UnboundedReceiver<OutboundFrame>, Uuid) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        (SessionHandle::new(session_id, tx), rx, session_id)
    }

    fn pong() -> EventEnvelope {
        EventEnvelope::now(ServerEvent::Pong(PongPayload::pong()))
    }

    #[tokio::test]
    async fn register_stores_single_session() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (h, mut rx, _) = handle();

        registry.register(user, h);
        assert!(registry.is_online(user));
        assert_eq!(registry.connection_count(), 1);

        assert!(registry.send(user, pong()));
        assert!(matches!(
            rx.recv().await,
            Some(OutboundFrame::Event(_))
        ));
    }

    #[tokio::test]
    async fn reconnect_supersedes_previous_session() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (old, mut old_rx, old_id) = handle();
        let (new, mut new_rx, new_id) = handle();

        registry.register(user, old);
        registry.register(user, new);

        // Old transport is explicitly closed
        assert!(matches!(
            old_rx.recv().await,
            Some(OutboundFrame::Close { reason: "superseded" })
        ));

        // Only one active session remains and it is the new one
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.send(user, pong()));
        assert!(matches!(new_rx.recv().await, Some(OutboundFrame::Event(_))));

        // Stale cleanup from the old connection must not evict the new one
        assert!(!registry.unregister(user, old_id));
        assert!(registry.is_online(user));

        assert!(registry.unregister(user, new_id));
        assert!(!registry.is_online(user));
    }

    #[tokio::test]
    async fn send_to_offline_user_reports_failure() {
        let registry = PresenceRegistry::new();
        assert!(!registry.send(Uuid::new_v4(), pong()));
    }

    #[tokio::test]
    async fn send_failure_evicts_session() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (h, rx, _) = handle();
        registry.register(user, h);

        // Dead transport: receiver dropped
        drop(rx);

        assert!(!registry.send(user, pong()));
        assert!(!registry.is_online(user));
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (h, _rx, session_id) = handle();
        registry.register(user, h);

        assert!(registry.unregister(user, session_id));
        assert!(!registry.unregister(user, session_id));
        registry.evict(user); // no-op
    }

    #[tokio::test]
    async fn online_users_lists_connected_ids() {
        let registry = PresenceRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (ha, _rxa, _) = handle();
        let (hb, _rxb, _) = handle();
        registry.register(a, ha);
        registry.register(b, hb);

        let mut online = registry.online_users();
        online.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(online, expected);
    }
}

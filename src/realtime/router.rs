//! Event Broadcast Router
//!
//! Resolves the online recipients for an event scope (one user, a
//! conversation's members, or everyone) and pushes a timestamped envelope
//! to each of their sessions. Delivery is best-effort and non-durable:
//! offline recipients never see the event and there is no backlog; clients
//! repair missed events through the REST pull surface.

use std::sync::Arc;

use uuid::Uuid;

use super::directory::MembershipDirectory;
use super::events::{EventEnvelope, ServerEvent};
use super::presence::PresenceRegistry;
use crate::infrastructure::metrics;

/// Fan-out router over the presence registry and membership directory.
#[derive(Debug, Clone)]
pub struct EventRouter {
    presence: Arc<PresenceRegistry>,
    directory: Arc<MembershipDirectory>,
}

impl EventRouter {
    pub fn new(presence: Arc<PresenceRegistry>, directory: Arc<MembershipDirectory>) -> Self {
        Self {
            presence,
            directory,
        }
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    pub fn directory(&self) -> &Arc<MembershipDirectory> {
        &self.directory
    }

    /// Deliver an event to a single user's session.
    ///
    /// A false return usually just means the recipient is offline; the
    /// caller's command has already committed, so this is not an error.
    pub fn send_to_user(&self, event: ServerEvent, user_id: Uuid) -> bool {
        let name = event.event_name();
        let delivered = self.presence.send(user_id, EventEnvelope::now(event));
        metrics::record_event_dispatch(name, delivered);
        if !delivered {
            tracing::debug!(user_id = %user_id, event = name, "Recipient offline, event dropped");
        }
        delivered
    }

    /// Fan an event out to every online member of a conversation.
    ///
    /// Per-recipient delivery order follows each session's queue; there is
    /// no ordering guarantee across recipients.
    pub fn broadcast_to_conversation(
        &self,
        event: ServerEvent,
        conversation_id: Uuid,
        exclude_user: Option<Uuid>,
    ) {
        let name = event.event_name();
        let envelope = EventEnvelope::now(event);
        let mut delivered = 0usize;

        for user_id in self.directory.members_of(conversation_id) {
            if Some(user_id) == exclude_user {
                continue;
            }
            let ok = self.presence.send(user_id, envelope.clone());
            metrics::record_event_dispatch(name, ok);
            if ok {
                delivered += 1;
            }
        }

        tracing::debug!(
            conversation_id = %conversation_id,
            event = name,
            delivered = delivered,
            "Broadcast to conversation"
        );
    }

    /// Fan an event out to every connected user.
    pub fn broadcast_to_all(&self, event: ServerEvent, exclude_user: Option<Uuid>) {
        let name = event.event_name();
        let envelope = EventEnvelope::now(event);

        for user_id in self.presence.online_users() {
            if Some(user_id) == exclude_user {
                continue;
            }
            let ok = self.presence.send(user_id, envelope.clone());
            metrics::record_event_dispatch(name, ok);
        }
    }
}

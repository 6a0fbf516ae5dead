//! Membership Directory
//!
//! Per-user set of conversation IDs, rebuilt from storage on connect and
//! mutated by join/leave/add/remove operations. Only connected users are
//! tracked, which makes the per-user sets exactly the data the broadcast
//! router needs.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use uuid::Uuid;

/// Runtime mapping of which conversations each connected user belongs to.
///
/// A single RwLock guards the map: joins/leaves take the write lock,
/// broadcast resolution takes the read lock, so a broadcast can never
/// observe a half-applied membership change.
#[derive(Debug, Default)]
pub struct MembershipDirectory {
    memberships: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl MembershipDirectory {
    pub fn new() -> Self {
        Self {
            memberships: RwLock::new(HashMap::new()),
        }
    }

    /// Track that a user belongs to a conversation.
    pub fn join(&self, user_id: Uuid, conversation_id: Uuid) {
        self.memberships
            .write()
            .entry(user_id)
            .or_default()
            .insert(conversation_id);
    }

    /// Stop tracking a user's membership in a conversation.
    pub fn leave(&self, user_id: Uuid, conversation_id: Uuid) {
        if let Some(set) = self.memberships.write().get_mut(&user_id) {
            set.remove(&conversation_id);
        }
    }

    /// Replace a user's tracked conversations wholesale (bulk load on
    /// connect).
    pub fn replace(&self, user_id: Uuid, conversation_ids: impl IntoIterator<Item = Uuid>) {
        let set: HashSet<Uuid> = conversation_ids.into_iter().collect();
        self.memberships.write().insert(user_id, set);
        tracing::debug!(user_id = %user_id, "Membership directory reloaded for user");
    }

    /// Drop all tracking for a user (disconnect).
    pub fn remove_user(&self, user_id: Uuid) {
        self.memberships.write().remove(&user_id);
    }

    pub fn contains(&self, user_id: Uuid, conversation_id: Uuid) -> bool {
        self.memberships
            .read()
            .get(&user_id)
            .is_some_and(|set| set.contains(&conversation_id))
    }

    pub fn conversations_of(&self, user_id: Uuid) -> Vec<Uuid> {
        self.memberships
            .read()
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Connected members of a conversation, resolved by scanning the
    /// per-user sets. Linear in the number of connected users; fine at this
    /// scale and kept deliberately simple over maintaining a reverse index.
    pub fn members_of(&self, conversation_id: Uuid) -> Vec<Uuid> {
        self.memberships
            .read()
            .iter()
            .filter(|(_, conversations)| conversations.contains(&conversation_id))
            .map(|(user_id, _)| *user_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_mutate_membership() {
        let directory = MembershipDirectory::new();
        let (user, conversation) = (Uuid::new_v4(), Uuid::new_v4());

        directory.join(user, conversation);
        assert!(directory.contains(user, conversation));
        assert_eq!(directory.members_of(conversation), vec![user]);

        directory.leave(user, conversation);
        assert!(!directory.contains(user, conversation));
        assert!(directory.members_of(conversation).is_empty());
    }

    #[test]
    fn replace_overwrites_previous_set() {
        let directory = MembershipDirectory::new();
        let user = Uuid::new_v4();
        let (old, new_a, new_b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        directory.join(user, old);
        directory.replace(user, [new_a, new_b]);

        assert!(!directory.contains(user, old));
        assert!(directory.contains(user, new_a));
        assert!(directory.contains(user, new_b));
        assert_eq!(directory.conversations_of(user).len(), 2);
    }

    #[test]
    fn members_of_resolves_across_users() {
        let directory = MembershipDirectory::new();
        let conversation = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        directory.join(a, conversation);
        directory.join(b, conversation);
        directory.join(c, Uuid::new_v4());

        let mut members = directory.members_of(conversation);
        members.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[test]
    fn remove_user_clears_all_tracking() {
        let directory = MembershipDirectory::new();
        let user = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        directory.join(user, conversation);
        directory.remove_user(user);

        assert!(directory.conversations_of(user).is_empty());
        assert!(directory.members_of(conversation).is_empty());
    }
}

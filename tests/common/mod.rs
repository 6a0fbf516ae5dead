//! Common Test Utilities
//!
//! In-memory repository implementations over a shared store, plus a
//! harness that wires the application services to a real presence
//! registry, membership directory and event router. Lets the full
//! command-to-broadcast path run without PostgreSQL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use parley::application::services::{
    ConversationService, FriendshipService, MessageService, ReactionService,
};
use parley::domain::{
    Conversation, ConversationKind, ConversationParticipant, ConversationRepository,
    Friendship, FriendshipRepository, FriendshipStatus, Message, MessageReaction,
    MessageRepository, ParticipantRepository, ReactionRepository, User, UserRepository,
    DELETED_PLACEHOLDER,
};
use parley::realtime::{
    EventEnvelope, EventRouter, MembershipDirectory, OutboundFrame, PresenceRegistry,
    SessionHandle,
};
use parley::shared::error::AppError;

/// Shared backing store standing in for the relational database.
#[derive(Default)]
pub struct Store {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub conversations: Mutex<HashMap<Uuid, Conversation>>,
    pub participants: Mutex<Vec<ConversationParticipant>>,
    pub messages: Mutex<HashMap<Uuid, Message>>,
    pub reactions: Mutex<Vec<MessageReaction>>,
    pub friendships: Mutex<HashMap<Uuid, Friendship>>,
}

pub struct InMemoryUsers(pub Arc<Store>);

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.0.users.lock().get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let users = self.0.users.lock();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(user) = self.0.users.lock().get_mut(&id) {
            user.last_seen_at = Some(at);
        }
        Ok(())
    }
}

pub struct InMemoryConversations(pub Arc<Store>);

#[async_trait]
impl ConversationRepository for InMemoryConversations {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        Ok(self.0.conversations.lock().get(&id).cloned())
    }

    async fn create_with_participants(
        &self,
        conversation: &Conversation,
        participant_ids: &[Uuid],
    ) -> Result<(), AppError> {
        self.0
            .conversations
            .lock()
            .insert(conversation.id, conversation.clone());
        let mut participants = self.0.participants.lock();
        for &user_id in participant_ids {
            participants.push(ConversationParticipant {
                conversation_id: conversation.id,
                user_id,
                joined_at: conversation.created_at,
                last_read_message_id: None,
            });
        }
        Ok(())
    }

    async fn find_direct_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, AppError> {
        let conversations = self.0.conversations.lock();
        let participants = self.0.participants.lock();
        Ok(conversations
            .values()
            .find(|c| {
                c.kind == ConversationKind::Direct
                    && participants
                        .iter()
                        .any(|p| p.conversation_id == c.id && p.user_id == user_a)
                    && participants
                        .iter()
                        .any(|p| p.conversation_id == c.id && p.user_id == user_b)
            })
            .cloned())
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Conversation>, AppError> {
        let conversations = self.0.conversations.lock();
        let participants = self.0.participants.lock();
        let mut result: Vec<Conversation> = conversations
            .values()
            .filter(|c| {
                participants
                    .iter()
                    .any(|p| p.conversation_id == c.id && p.user_id == user_id)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<(), AppError> {
        match self.0.conversations.lock().get_mut(&id) {
            Some(c) => {
                c.title = Some(title.to_string());
                c.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Conversation {} not found", id))),
        }
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(c) = self.0.conversations.lock().get_mut(&id) {
            c.updated_at = at;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if self.0.conversations.lock().remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Conversation {} not found", id)));
        }
        self.0
            .participants
            .lock()
            .retain(|p| p.conversation_id != id);
        let removed_messages: Vec<Uuid> = {
            let mut messages = self.0.messages.lock();
            let ids: Vec<Uuid> = messages
                .values()
                .filter(|m| m.conversation_id == id)
                .map(|m| m.id)
                .collect();
            for message_id in &ids {
                messages.remove(message_id);
            }
            ids
        };
        self.0
            .reactions
            .lock()
            .retain(|r| !removed_messages.contains(&r.message_id));
        Ok(())
    }
}

pub struct InMemoryParticipants(pub Arc<Store>);

impl InMemoryParticipants {
    fn record_system_message(&self, message: &Message) {
        self.0.messages.lock().insert(message.id, message.clone());
        if let Some(c) = self.0.conversations.lock().get_mut(&message.conversation_id) {
            c.updated_at = message.created_at;
        }
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipants {
    async fn find(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationParticipant>, AppError> {
        Ok(self
            .0
            .participants
            .lock()
            .iter()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id)
            .cloned())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ConversationParticipant>, AppError> {
        Ok(self
            .0
            .participants
            .lock()
            .iter()
            .filter(|p| p.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn conversation_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .0
            .participants
            .lock()
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.conversation_id)
            .collect())
    }

    async fn count(&self, conversation_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .0
            .participants
            .lock()
            .iter()
            .filter(|p| p.conversation_id == conversation_id)
            .count() as i64)
    }

    async fn add_recording(
        &self,
        participants: &[ConversationParticipant],
        system_message: &Message,
    ) -> Result<(), AppError> {
        self.0.participants.lock().extend_from_slice(participants);
        self.record_system_message(system_message);
        Ok(())
    }

    async fn remove(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut participants = self.0.participants.lock();
        let before = participants.len();
        participants.retain(|p| !(p.conversation_id == conversation_id && p.user_id == user_id));
        Ok(participants.len() < before)
    }

    async fn remove_recording(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        system_message: &Message,
    ) -> Result<bool, AppError> {
        if !self.remove(conversation_id, user_id).await? {
            return Ok(false);
        }
        self.record_system_message(system_message);
        Ok(true)
    }
}

pub struct InMemoryMessages(pub Arc<Store>);

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, AppError> {
        Ok(self.0.messages.lock().get(&id).cloned())
    }

    async fn find_by_conversation(
        &self,
        conversation_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let mut result: Vec<Message> = self
            .0
            .messages
            .lock()
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create(&self, message: &Message) -> Result<(), AppError> {
        self.0.messages.lock().insert(message.id, message.clone());
        Ok(())
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        match self.0.messages.lock().get_mut(&id) {
            Some(m) => {
                m.content = content.to_string();
                m.edited_at = Some(edited_at);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Message {} not found", id))),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError> {
        match self.0.messages.lock().get_mut(&id) {
            Some(m) => {
                m.is_deleted = true;
                m.content = DELETED_PLACEHOLDER.to_string();
                m.file_url = None;
                m.file_type = None;
                m.file_name = None;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Message {} not found", id))),
        }
    }

    async fn mark_read(
        &self,
        id: Uuid,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(m) = self.0.messages.lock().get_mut(&id) {
            m.read_at = Some(read_at);
            m.read_by_user_id = Some(reader_id);
            if m.delivered_at.is_none() {
                m.delivered_at = Some(read_at);
            }
        }
        if let Some(p) = self
            .0
            .participants
            .lock()
            .iter_mut()
            .find(|p| p.conversation_id == conversation_id && p.user_id == reader_id)
        {
            p.last_read_message_id = Some(id);
        }
        Ok(())
    }
}

pub struct InMemoryReactions(pub Arc<Store>);

#[async_trait]
impl ReactionRepository for InMemoryReactions {
    async fn find(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Option<MessageReaction>, AppError> {
        Ok(self
            .0
            .reactions
            .lock()
            .iter()
            .find(|r| r.message_id == message_id && r.user_id == user_id && r.emoji == emoji)
            .cloned())
    }

    async fn create(&self, reaction: &MessageReaction) -> Result<(), AppError> {
        let mut reactions = self.0.reactions.lock();
        let exists = reactions.iter().any(|r| {
            r.message_id == reaction.message_id
                && r.user_id == reaction.user_id
                && r.emoji == reaction.emoji
        });
        if !exists {
            reactions.push(reaction.clone());
        }
        Ok(())
    }

    async fn delete(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<bool, AppError> {
        let mut reactions = self.0.reactions.lock();
        let before = reactions.len();
        reactions.retain(|r| {
            !(r.message_id == message_id && r.user_id == user_id && r.emoji == emoji)
        });
        Ok(reactions.len() < before)
    }

    async fn list_for_message(
        &self,
        message_id: Uuid,
    ) -> Result<Vec<MessageReaction>, AppError> {
        Ok(self
            .0
            .reactions
            .lock()
            .iter()
            .filter(|r| r.message_id == message_id)
            .cloned()
            .collect())
    }
}

pub struct InMemoryFriendships(pub Arc<Store>);

#[async_trait]
impl FriendshipRepository for InMemoryFriendships {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Friendship>, AppError> {
        Ok(self.0.friendships.lock().get(&id).cloned())
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Friendship>, AppError> {
        Ok(self
            .0
            .friendships
            .lock()
            .values()
            .find(|f| {
                (f.user_id == a && f.friend_id == b) || (f.user_id == b && f.friend_id == a)
            })
            .cloned())
    }

    async fn create(&self, friendship: &Friendship) -> Result<(), AppError> {
        self.0
            .friendships
            .lock()
            .insert(friendship.id, friendship.clone());
        Ok(())
    }

    async fn update(&self, friendship: &Friendship) -> Result<(), AppError> {
        self.0
            .friendships
            .lock()
            .insert(friendship.id, friendship.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.0.friendships.lock().remove(&id).is_some())
    }

    async fn list_accepted_for(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError> {
        Ok(self
            .0
            .friendships
            .lock()
            .values()
            .filter(|f| f.involves(user_id) && f.status == FriendshipStatus::Accepted)
            .cloned()
            .collect())
    }

    async fn list_pending_received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Friendship>, AppError> {
        Ok(self
            .0
            .friendships
            .lock()
            .values()
            .filter(|f| f.friend_id == user_id && f.status == FriendshipStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_pending_sent(&self, user_id: Uuid) -> Result<Vec<Friendship>, AppError> {
        Ok(self
            .0
            .friendships
            .lock()
            .values()
            .filter(|f| f.user_id == user_id && f.status == FriendshipStatus::Pending)
            .cloned()
            .collect())
    }
}

/// Test harness: in-memory storage behind the real services, registry,
/// directory and router.
pub struct TestApp {
    pub store: Arc<Store>,
    pub router: Arc<EventRouter>,
}

impl TestApp {
    pub fn new() -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let directory = Arc::new(MembershipDirectory::new());
        let router = Arc::new(EventRouter::new(presence, directory));
        Self {
            store: Arc::new(Store::default()),
            router,
        }
    }

    pub fn message_service(
        &self,
    ) -> MessageService<InMemoryMessages, InMemoryConversations, InMemoryParticipants, InMemoryUsers>
    {
        MessageService::new(
            Arc::new(InMemoryMessages(self.store.clone())),
            Arc::new(InMemoryConversations(self.store.clone())),
            Arc::new(InMemoryParticipants(self.store.clone())),
            Arc::new(InMemoryUsers(self.store.clone())),
            self.router.clone(),
        )
    }

    pub fn conversation_service(
        &self,
    ) -> ConversationService<
        InMemoryConversations,
        InMemoryParticipants,
        InMemoryMessages,
        InMemoryUsers,
        InMemoryFriendships,
    > {
        ConversationService::new(
            Arc::new(InMemoryConversations(self.store.clone())),
            Arc::new(InMemoryParticipants(self.store.clone())),
            Arc::new(InMemoryMessages(self.store.clone())),
            Arc::new(InMemoryUsers(self.store.clone())),
            Arc::new(InMemoryFriendships(self.store.clone())),
            self.router.clone(),
        )
    }

    pub fn reaction_service(
        &self,
    ) -> ReactionService<InMemoryReactions, InMemoryMessages, InMemoryParticipants, InMemoryUsers>
    {
        ReactionService::new(
            Arc::new(InMemoryReactions(self.store.clone())),
            Arc::new(InMemoryMessages(self.store.clone())),
            Arc::new(InMemoryParticipants(self.store.clone())),
            Arc::new(InMemoryUsers(self.store.clone())),
            self.router.clone(),
        )
    }

    pub fn friendship_service(&self) -> FriendshipService<InMemoryFriendships, InMemoryUsers> {
        FriendshipService::new(
            Arc::new(InMemoryFriendships(self.store.clone())),
            Arc::new(InMemoryUsers(self.store.clone())),
        )
    }

    /// Seed a user with a generated display name.
    pub fn add_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: Name().fake(),
            is_active: true,
            last_seen_at: None,
            created_at: Utc::now(),
        };
        self.store.users.lock().insert(user.id, user.clone());
        user
    }

    /// Seed an accepted friendship row.
    pub fn make_friends(&self, a: Uuid, b: Uuid) {
        let mut friendship = Friendship::new_request(a, b);
        friendship.status = FriendshipStatus::Accepted;
        self.store
            .friendships
            .lock()
            .insert(friendship.id, friendship.clone());
    }

    /// Simulate a WebSocket connect: register a session and load the
    /// user's conversations into the membership directory, exactly as the
    /// connection handler does. Returns the session's outbound queue.
    pub fn connect(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.router
            .presence()
            .register(user_id, SessionHandle::new(Uuid::new_v4(), tx));
        let conversation_ids: Vec<Uuid> = self
            .store
            .participants
            .lock()
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.conversation_id)
            .collect();
        self.router.directory().replace(user_id, conversation_ids);
        rx
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain all queued event envelopes from a session receiver.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let OutboundFrame::Event(envelope) = frame {
            events.push(*envelope);
        }
    }
    events
}

/// Names of all queued events, in order.
pub fn drain_event_names(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<&'static str> {
    drain_events(rx)
        .into_iter()
        .map(|e| e.event.event_name())
        .collect()
}

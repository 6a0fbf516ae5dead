//! Conversation Service
//!
//! Conversation lifecycle: creation (direct pair dedupe, group titles),
//! friend-gated group membership, leaving, and the auto-disband cascade.
//! Every mutation commits to storage before its events fan out, and every
//! membership change is mirrored into the runtime membership directory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Conversation, ConversationKind, ConversationParticipant, ConversationRepository,
    FriendshipRepository, FriendshipStatus, Message, MessageRepository, ParticipantRepository,
    User, UserRepository, MAX_GROUP_MEMBERS,
};
use crate::realtime::events::{
    ChatMessagePayload, ConversationSnapshot, NewConversationPayload, ParticipantSnapshot,
    ServerEvent,
};
use crate::realtime::EventRouter;
use crate::shared::error::AppError;

/// Create conversation request
#[derive(Debug, Clone)]
pub struct CreateConversationDto {
    pub kind: ConversationKind,
    pub title: Option<String>,
    pub participant_ids: Vec<Uuid>,
}

/// Conversation service errors
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation not found")]
    NotFound,

    #[error("One or more participants not found")]
    UserNotFound,

    #[error("Participant not found in conversation")]
    ParticipantNotFound,

    #[error("You are not a participant in this conversation")]
    NotParticipant,

    #[error("Only the conversation creator may do this")]
    NotCreator,

    #[error("Only group conversations support this operation")]
    NotGroup,

    #[error("Only direct conversations support this operation")]
    NotDirect,

    #[error("Direct conversation already exists with this user")]
    DirectExists,

    #[error("Invalid participant list: {0}")]
    InvalidParticipants(String),

    #[error("Group conversation must have a title")]
    TitleRequired,

    #[error("Group has reached maximum 100 members")]
    GroupFull,

    #[error("User is already a participant")]
    AlreadyParticipant,

    #[error("You can only add friends to the group")]
    NotFriends,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for ConversationError {
    fn from(e: AppError) -> Self {
        ConversationError::Internal(e.to_string())
    }
}

/// Conversation lifecycle service.
pub struct ConversationService<C, P, M, U, F>
where
    C: ConversationRepository,
    P: ParticipantRepository,
    M: MessageRepository,
    U: UserRepository,
    F: FriendshipRepository,
{
    conversation_repo: Arc<C>,
    participant_repo: Arc<P>,
    message_repo: Arc<M>,
    user_repo: Arc<U>,
    friendship_repo: Arc<F>,
    router: Arc<EventRouter>,
}

impl<C, P, M, U, F> ConversationService<C, P, M, U, F>
where
    C: ConversationRepository,
    P: ParticipantRepository,
    M: MessageRepository,
    U: UserRepository,
    F: FriendshipRepository,
{
    pub fn new(
        conversation_repo: Arc<C>,
        participant_repo: Arc<P>,
        message_repo: Arc<M>,
        user_repo: Arc<U>,
        friendship_repo: Arc<F>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self {
            conversation_repo,
            participant_repo,
            message_repo,
            user_repo,
            friendship_repo,
            router,
        }
    }

    /// Build the full view of a conversation pushed to clients and returned
    /// from the REST surface.
    async fn snapshot(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationSnapshot, ConversationError> {
        let participants = self
            .participant_repo
            .list_for_conversation(conversation.id)
            .await?;
        let ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();
        let users: HashMap<Uuid, User> = self
            .user_repo
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let participants = participants
            .iter()
            .filter_map(|p| {
                users.get(&p.user_id).map(|user| ParticipantSnapshot {
                    user_id: p.user_id,
                    username: user.username.clone(),
                    display_name: user.display_name.clone(),
                    joined_at: p.joined_at,
                })
            })
            .collect();

        Ok(ConversationSnapshot {
            id: conversation.id,
            kind: conversation.kind.as_str().to_string(),
            title: conversation.title.clone(),
            created_by: conversation.created_by,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            participants,
        })
    }

    fn system_message_event(message: &Message) -> ServerEvent {
        ServerEvent::NewMessage(ChatMessagePayload {
            conversation_id: message.conversation_id,
            message_id: message.id,
            sender_id: None,
            sender_username: "System".into(),
            sender_display_name: "System".into(),
            content: message.content.clone(),
            message_type: "system".into(),
            file_url: None,
            created_at: message.created_at,
        })
    }

    async fn require_accepted_friendship(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<(), ConversationError> {
        match self.friendship_repo.find_between(a, b).await? {
            Some(f) if f.status == FriendshipStatus::Accepted => Ok(()),
            _ => Err(ConversationError::NotFriends),
        }
    }

    /// Create a direct or group conversation.
    ///
    /// Direct conversations take exactly one other participant and are
    /// unique per user pair; groups require a title. All participants are
    /// created in one storage transaction, then registered in the
    /// membership directory and notified with `new_conversation`.
    pub async fn create_conversation(
        &self,
        creator_id: Uuid,
        dto: CreateConversationDto,
    ) -> Result<ConversationSnapshot, ConversationError> {
        let mut seen = HashSet::new();
        let participant_ids: Vec<Uuid> = dto
            .participant_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if participant_ids.contains(&creator_id) {
            return Err(ConversationError::InvalidParticipants(
                "participant list must not include yourself".into(),
            ));
        }

        let title = match dto.kind {
            ConversationKind::Direct => {
                if participant_ids.len() != 1 {
                    return Err(ConversationError::InvalidParticipants(
                        "direct conversation must have exactly 1 other participant".into(),
                    ));
                }
                let other = participant_ids[0];
                if self
                    .conversation_repo
                    .find_direct_between(creator_id, other)
                    .await?
                    .is_some()
                {
                    return Err(ConversationError::DirectExists);
                }
                None
            }
            ConversationKind::Group => {
                if 1 + participant_ids.len() as i64 > MAX_GROUP_MEMBERS {
                    return Err(ConversationError::GroupFull);
                }
                match dto.title.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => Some(t.to_string()),
                    _ => return Err(ConversationError::TitleRequired),
                }
            }
        };

        let found = self.user_repo.find_many(&participant_ids).await?;
        if found.len() != participant_ids.len() {
            return Err(ConversationError::UserNotFound);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            kind: dto.kind,
            title,
            created_by: creator_id,
            created_at: now,
            updated_at: now,
        };

        let mut all_members = vec![creator_id];
        all_members.extend(&participant_ids);

        self.conversation_repo
            .create_with_participants(&conversation, &all_members)
            .await?;

        // Online members start routing immediately; offline ones pick the
        // conversation up from storage when they connect.
        for member in &all_members {
            if self.router.presence().is_online(*member) {
                self.router.directory().join(*member, conversation.id);
            }
        }

        let snapshot = self.snapshot(&conversation).await?;
        for member in &all_members {
            self.router.send_to_user(
                ServerEvent::NewConversation(NewConversationPayload {
                    conversation: snapshot.clone(),
                }),
                *member,
            );
        }

        tracing::info!(
            conversation_id = %conversation.id,
            kind = %conversation.kind,
            members = all_members.len(),
            "Conversation created"
        );

        Ok(snapshot)
    }

    /// List the actor's conversations, most recently active first.
    pub async fn get_conversations(
        &self,
        actor_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ConversationSnapshot>, ConversationError> {
        let conversations = self
            .conversation_repo
            .find_for_user(actor_id, skip.max(0), limit.clamp(1, 100))
            .await?;

        let mut snapshots = Vec::with_capacity(conversations.len());
        for conversation in &conversations {
            snapshots.push(self.snapshot(conversation).await?);
        }
        Ok(snapshots)
    }

    /// Fetch one conversation. Non-participants get NotFound rather than a
    /// membership hint.
    pub async fn get_conversation(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<ConversationSnapshot, ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if self
            .participant_repo
            .find(conversation_id, actor_id)
            .await?
            .is_none()
        {
            return Err(ConversationError::NotFound);
        }

        self.snapshot(&conversation).await
    }

    /// List participants; actor must be one of them.
    pub async fn get_participants(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<ParticipantSnapshot>, ConversationError> {
        Ok(self
            .get_conversation(actor_id, conversation_id)
            .await?
            .participants)
    }

    /// Rename a group. Creator only.
    pub async fn update_title(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        title: String,
    ) -> Result<ConversationSnapshot, ConversationError> {
        let mut conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if conversation.created_by != actor_id {
            return Err(ConversationError::NotCreator);
        }
        if !conversation.is_group() {
            return Err(ConversationError::NotGroup);
        }
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ConversationError::TitleRequired);
        }

        self.conversation_repo
            .update_title(conversation_id, &title)
            .await?;
        conversation.title = Some(title);

        self.snapshot(&conversation).await
    }

    /// Delete a conversation outright. Creator only; participants and
    /// messages cascade.
    pub async fn delete_conversation(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if conversation.created_by != actor_id {
            return Err(ConversationError::NotCreator);
        }

        let participants = self
            .participant_repo
            .list_for_conversation(conversation_id)
            .await?;

        self.conversation_repo.delete(conversation_id).await?;

        for participant in participants {
            self.router
                .directory()
                .leave(participant.user_id, conversation_id);
        }

        Ok(())
    }

    /// Add a single user to a group.
    ///
    /// Creator only, friend-gated, capped at [`MAX_GROUP_MEMBERS`]. Writes
    /// the membership row and the announcing system message atomically,
    /// then notifies the room and hands the new member the conversation.
    pub async fn add_participant(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ConversationError> {
        self.add_participants(actor_id, conversation_id, &[user_id], false)
            .await
            .map(|_| ())
    }

    /// Add several friends to a group at once. Users who are already
    /// members are skipped; one system message covers the whole batch.
    /// Returns how many users were actually added.
    pub async fn add_participants_batch(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<usize, ConversationError> {
        self.add_participants(actor_id, conversation_id, user_ids, true)
            .await
    }

    async fn add_participants(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_ids: &[Uuid],
        skip_existing: bool,
    ) -> Result<usize, ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if !conversation.is_group() {
            return Err(ConversationError::NotGroup);
        }
        if conversation.created_by != actor_id {
            return Err(ConversationError::NotCreator);
        }

        // Cap is checked against the whole batch before anything is added.
        let current = self.participant_repo.count(conversation_id).await?;
        if current + user_ids.len() as i64 > MAX_GROUP_MEMBERS {
            return Err(ConversationError::GroupFull);
        }

        let actor = self
            .user_repo
            .find_by_id(actor_id)
            .await?
            .ok_or(ConversationError::UserNotFound)?;

        let mut added_users: Vec<User> = Vec::new();
        for &user_id in user_ids {
            let user = self
                .user_repo
                .find_by_id(user_id)
                .await?
                .ok_or(ConversationError::UserNotFound)?;

            self.require_accepted_friendship(actor_id, user_id).await?;

            if self
                .participant_repo
                .find(conversation_id, user_id)
                .await?
                .is_some()
            {
                if skip_existing {
                    continue;
                }
                return Err(ConversationError::AlreadyParticipant);
            }
            added_users.push(user);
        }

        if added_users.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let participants: Vec<ConversationParticipant> = added_users
            .iter()
            .map(|user| ConversationParticipant {
                conversation_id,
                user_id: user.id,
                joined_at: now,
                last_read_message_id: None,
            })
            .collect();

        let names: Vec<&str> = added_users.iter().map(|u| u.display_name.as_str()).collect();
        let joined_names = match names.as_slice() {
            [single] => single.to_string(),
            [head @ .., last] => format!("{} and {}", head.join(", "), last),
            [] => unreachable!(),
        };
        let system_message = Message::system(
            conversation_id,
            format!("{} added {} to the group", actor.display_name, joined_names),
        );

        self.participant_repo
            .add_recording(&participants, &system_message)
            .await?;

        // Existing members see the announcement; new members receive the
        // conversation itself and start routing from here on.
        self.router.broadcast_to_conversation(
            Self::system_message_event(&system_message),
            conversation_id,
            None,
        );

        let snapshot = self.snapshot(&conversation).await?;
        for user in &added_users {
            self.router.send_to_user(
                ServerEvent::NewConversation(NewConversationPayload {
                    conversation: snapshot.clone(),
                }),
                user.id,
            );
            if self.router.presence().is_online(user.id) {
                self.router.directory().join(user.id, conversation_id);
            }
        }

        tracing::info!(
            conversation_id = %conversation_id,
            added = added_users.len(),
            "Participants added to group"
        );

        Ok(added_users.len())
    }

    /// Remove a user from a group: self-removal, or the creator removing
    /// someone else.
    pub async fn remove_participant(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if !conversation.is_group() {
            return Err(ConversationError::NotGroup);
        }
        if user_id != actor_id && conversation.created_by != actor_id {
            return Err(ConversationError::NotCreator);
        }

        if !self.participant_repo.remove(conversation_id, user_id).await? {
            return Err(ConversationError::ParticipantNotFound);
        }
        self.router.directory().leave(user_id, conversation_id);

        Ok(())
    }

    /// Leave a conversation.
    ///
    /// Direct: the participant row goes away, conversation and friendship
    /// stay. Group: a "left" system message is recorded with the removal in
    /// one transaction; if exactly one member remains afterwards the group
    /// auto-disbands. The last member is notified first, then the
    /// conversation (and everything in it) is deleted.
    pub async fn leave_conversation(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if self
            .participant_repo
            .find(conversation_id, actor_id)
            .await?
            .is_none()
        {
            return Err(ConversationError::NotParticipant);
        }

        if conversation.is_direct() {
            self.participant_repo.remove(conversation_id, actor_id).await?;
            self.router.directory().leave(actor_id, conversation_id);
            return Ok(());
        }

        let actor = self
            .user_repo
            .find_by_id(actor_id)
            .await?
            .ok_or(ConversationError::UserNotFound)?;

        let leave_message = Message::system(
            conversation_id,
            format!("{} left the group", actor.display_name),
        );
        self.participant_repo
            .remove_recording(conversation_id, actor_id, &leave_message)
            .await?;
        self.router.directory().leave(actor_id, conversation_id);

        let remaining = self.participant_repo.count(conversation_id).await?;
        if remaining == 1 {
            let last = self
                .participant_repo
                .list_for_conversation(conversation_id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ConversationError::Internal("disbanding group has no members".into())
                })?;

            let disband_message = Message::system(
                conversation_id,
                "The group was disbanded because you were the last member left".into(),
            );
            self.message_repo.create(&disband_message).await?;

            // Notify the last member before the cascade removes everything.
            self.router.send_to_user(
                Self::system_message_event(&disband_message),
                last.user_id,
            );

            self.conversation_repo.delete(conversation_id).await?;
            self.router.directory().leave(last.user_id, conversation_id);

            tracing::info!(
                conversation_id = %conversation_id,
                last_member = %last.user_id,
                "Group auto-disbanded"
            );
        } else {
            self.router.broadcast_to_conversation(
                Self::system_message_event(&leave_message),
                conversation_id,
                Some(actor_id),
            );
        }

        Ok(())
    }

    /// Remove the friendship behind a direct conversation while keeping the
    /// conversation itself.
    pub async fn unfriend_in_direct(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), ConversationError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or(ConversationError::NotFound)?;

        if !conversation.is_direct() {
            return Err(ConversationError::NotDirect);
        }
        if self
            .participant_repo
            .find(conversation_id, actor_id)
            .await?
            .is_none()
        {
            return Err(ConversationError::NotParticipant);
        }

        let other = self
            .participant_repo
            .list_for_conversation(conversation_id)
            .await?
            .into_iter()
            .find(|p| p.user_id != actor_id)
            .ok_or(ConversationError::ParticipantNotFound)?;

        let friendship = match self
            .friendship_repo
            .find_between(actor_id, other.user_id)
            .await?
        {
            Some(f) if f.status == FriendshipStatus::Accepted => f,
            _ => return Err(ConversationError::NotFriends),
        };

        self.friendship_repo.delete(friendship.id).await?;
        Ok(())
    }
}

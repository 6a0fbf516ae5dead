//! Reaction Service
//!
//! Idempotent per-(message, user, emoji) reaction set with summary
//! aggregation for read paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    Message, MessageReaction, MessageRepository, ParticipantRepository, ReactionRepository,
    User, UserRepository,
};
use crate::realtime::events::{ReactionAddedPayload, ReactionRemovedPayload, ServerEvent};
use crate::realtime::EventRouter;
use crate::shared::error::AppError;

/// Aggregated per-emoji view of a message's reactions.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
    pub users: Vec<Reactor>,
    pub reacted_by_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reactor {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// Reaction service errors
#[derive(Debug, thiserror::Error)]
pub enum ReactionError {
    #[error("Message not found")]
    MessageNotFound,

    #[error("Reaction not found")]
    NotFound,

    #[error("You are not a participant in this conversation")]
    NotParticipant,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for ReactionError {
    fn from(e: AppError) -> Self {
        ReactionError::Internal(e.to_string())
    }
}

/// Reaction aggregator service.
pub struct ReactionService<R, M, P, U>
where
    R: ReactionRepository,
    M: MessageRepository,
    P: ParticipantRepository,
    U: UserRepository,
{
    reaction_repo: Arc<R>,
    message_repo: Arc<M>,
    participant_repo: Arc<P>,
    user_repo: Arc<U>,
    router: Arc<EventRouter>,
}

impl<R, M, P, U> ReactionService<R, M, P, U>
where
    R: ReactionRepository,
    M: MessageRepository,
    P: ParticipantRepository,
    U: UserRepository,
{
    pub fn new(
        reaction_repo: Arc<R>,
        message_repo: Arc<M>,
        participant_repo: Arc<P>,
        user_repo: Arc<U>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self {
            reaction_repo,
            message_repo,
            participant_repo,
            user_repo,
            router,
        }
    }

    async fn load_message_for_participant(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Message, ReactionError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(ReactionError::MessageNotFound)?;

        self.participant_repo
            .find(message.conversation_id, user_id)
            .await?
            .ok_or(ReactionError::NotParticipant)?;

        Ok(message)
    }

    /// Add a reaction to a message.
    ///
    /// Idempotent: if the exact triple already exists it is returned
    /// unchanged and nothing is broadcast.
    pub async fn add_reaction(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
        emoji: String,
    ) -> Result<MessageReaction, ReactionError> {
        let message = self.load_message_for_participant(message_id, actor_id).await?;

        if let Some(existing) = self
            .reaction_repo
            .find(message_id, actor_id, &emoji)
            .await?
        {
            return Ok(existing);
        }

        let reaction = MessageReaction::new(message_id, actor_id, emoji);
        self.reaction_repo.create(&reaction).await?;

        let actor = self
            .user_repo
            .find_by_id(actor_id)
            .await?
            .ok_or_else(|| ReactionError::Internal(format!("user {} missing", actor_id)))?;

        self.router.broadcast_to_conversation(
            ServerEvent::ReactionAdded(ReactionAddedPayload {
                conversation_id: message.conversation_id,
                message_id,
                user_id: actor_id,
                username: actor.username,
                emoji: reaction.emoji.clone(),
                created_at: reaction.created_at,
            }),
            message.conversation_id,
            None,
        );

        Ok(reaction)
    }

    /// Remove the actor's reaction from a message. Fails with NotFound if
    /// the triple does not exist.
    pub async fn remove_reaction(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<(), ReactionError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(ReactionError::MessageNotFound)?;

        if !self.reaction_repo.delete(message_id, actor_id, emoji).await? {
            return Err(ReactionError::NotFound);
        }

        self.router.broadcast_to_conversation(
            ServerEvent::ReactionRemoved(ReactionRemovedPayload {
                conversation_id: message.conversation_id,
                message_id,
                user_id: actor_id,
                emoji: emoji.to_string(),
            }),
            message.conversation_id,
            None,
        );

        Ok(())
    }

    /// Aggregated per-emoji view of a message's reactions. Read path only,
    /// no events.
    pub async fn summarize(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
    ) -> Result<Vec<ReactionSummary>, ReactionError> {
        self.load_message_for_participant(message_id, actor_id).await?;

        let reactions = self.reaction_repo.list_for_message(message_id).await?;
        let user_ids: Vec<Uuid> = reactions.iter().map(|r| r.user_id).collect();
        let users: std::collections::HashMap<Uuid, User> = self
            .user_repo
            .find_many(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        // BTreeMap keeps summary order stable across calls.
        let mut grouped: BTreeMap<String, ReactionSummary> = BTreeMap::new();
        for reaction in &reactions {
            let entry = grouped
                .entry(reaction.emoji.clone())
                .or_insert_with(|| ReactionSummary {
                    emoji: reaction.emoji.clone(),
                    count: 0,
                    users: Vec::new(),
                    reacted_by_me: false,
                });
            entry.count += 1;
            if let Some(user) = users.get(&reaction.user_id) {
                entry.users.push(Reactor {
                    user_id: user.id,
                    username: user.username.clone(),
                    display_name: user.display_name.clone(),
                });
            }
            if reaction.user_id == actor_id {
                entry.reacted_by_me = true;
            }
        }

        Ok(grouped.into_values().collect())
    }
}

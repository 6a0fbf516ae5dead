//! Domain Entities
//!
//! Core entities and the repository traits that define their data access
//! contracts.

pub mod conversation;
pub mod friendship;
pub mod message;
pub mod reaction;
pub mod user;

pub use conversation::{
    Conversation, ConversationKind, ConversationParticipant, ConversationRepository,
    ParticipantRepository, MAX_GROUP_MEMBERS,
};
pub use friendship::{Friendship, FriendshipRepository, FriendshipStatus};
pub use message::{Message, MessageRepository, DELETED_PLACEHOLDER};
pub use reaction::{MessageReaction, ReactionRepository};
pub use user::{User, UserRepository};

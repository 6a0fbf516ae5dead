//! Application Services
//!
//! Business logic services implementing the lifecycle state machines.
//! Each service is generic over the repository traits it consumes and
//! pushes its side-effect events through the realtime router after the
//! storage commit.

pub mod conversation_service;
pub mod friendship_service;
pub mod message_service;
pub mod reaction_service;

pub use conversation_service::{
    ConversationError, ConversationService, CreateConversationDto,
};
pub use friendship_service::{
    FriendWithUser, FriendshipAction, FriendshipError, FriendshipService,
};
pub use message_service::{MessageError, MessageService, SendMessageDto, MAX_CONTENT_LENGTH};
pub use reaction_service::{ReactionError, ReactionService, ReactionSummary, Reactor};

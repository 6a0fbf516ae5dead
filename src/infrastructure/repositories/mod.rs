//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits. Each
//! repository handles data access for a single entity; compound writes
//! that must be atomic (conversation + participants, membership change +
//! system message, read receipt + pointer) run inside one transaction.

pub mod conversation_repository;
pub mod friendship_repository;
pub mod message_repository;
pub mod participant_repository;
pub mod reaction_repository;
pub mod user_repository;

pub use conversation_repository::PgConversationRepository;
pub use friendship_repository::PgFriendshipRepository;
pub use message_repository::PgMessageRepository;
pub use participant_repository::PgParticipantRepository;
pub use reaction_repository::PgReactionRepository;
pub use user_repository::PgUserRepository;

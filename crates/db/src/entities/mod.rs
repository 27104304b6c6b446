//! Database entities.

pub mod candidate;
pub mod chat_message;
pub mod chat_moderator;
pub mod chat_room;
pub mod comment;
pub mod comment_like;
pub mod comment_reaction;
pub mod election;
pub mod news;
pub mod user;
pub mod vote;

pub use candidate::Entity as Candidate;
pub use chat_message::Entity as ChatMessage;
pub use chat_moderator::Entity as ChatModerator;
pub use chat_room::Entity as ChatRoom;
pub use comment::Entity as Comment;
pub use comment_like::Entity as CommentLike;
pub use comment_reaction::Entity as CommentReaction;
pub use election::Entity as Election;
pub use news::Entity as News;
pub use user::Entity as User;
pub use vote::Entity as Vote;

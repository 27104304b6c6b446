//! Repositories: the store-facing half of each engine component.

mod chat;
mod comment;
mod election;
mod news;
mod reaction;
mod user;
mod vote;

pub use chat::{ChatRepository, RoomChanges, RoomWithModerators};
pub use comment::{CommentRepository, CommentSubject, ModerationFilter};
pub use election::ElectionRepository;
pub use news::NewsRepository;
pub use reaction::{LikeToggle, ReactionRepository};
pub use user::UserRepository;
pub use vote::{CandidateTally, VoteRepository};

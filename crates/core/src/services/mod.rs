//! Business logic services.

#![allow(missing_docs)]

pub mod aggregation;
pub mod chat;
pub mod comment;
pub mod identity;
pub mod reaction;
pub mod vote;

pub use aggregation::{Aggregator, AuthorInfo, ChatMessageView, ChatRoomView, CommentView};
pub use chat::{
    ChatService, CreateRoomInput, MessagePatch, SendMessageInput, UpdateRoomInput,
    DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT,
};
pub use comment::{CommentPatch, CommentService, CommentStats, CreateCommentInput};
pub use identity::{Actor, Claims, IdentityGate, JwtIdentityGate};
pub use reaction::{ReactionService, ToggleOutcome};
pub use vote::{CandidateResult, CastVoteInput, VoteCheck, VoteService, VoteView};

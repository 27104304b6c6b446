//! Like and reaction toggles on comments.

use crate::services::identity::Actor;
use agora_common::{AppError, AppResult};
use agora_db::repositories::ReactionRepository;
use serde::Serialize;

/// Longest accepted emoji string, in characters.
const MAX_EMOJI_CHARS: usize = 32;

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    /// Membership after the toggle.
    pub active: bool,
    /// The comment's like counter, for like toggles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i32>,
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub const fn new(reaction_repo: ReactionRepository) -> Self {
        Self { reaction_repo }
    }

    /// Toggle the actor's like (`emoji: None`) or emoji reaction on a comment.
    ///
    /// Applying the same toggle twice restores the previous state.
    pub async fn toggle(
        &self,
        comment_id: &str,
        actor: &Actor,
        emoji: Option<&str>,
    ) -> AppResult<ToggleOutcome> {
        match emoji {
            None => {
                let result = self
                    .reaction_repo
                    .toggle_like(comment_id, &actor.user_id)
                    .await?;
                tracing::debug!(
                    comment_id = %comment_id,
                    user_id = %actor.user_id,
                    liked = result.liked,
                    likes = result.likes,
                    "Toggled like"
                );
                Ok(ToggleOutcome {
                    active: result.liked,
                    likes: Some(result.likes),
                })
            }
            Some(emoji) => {
                let emoji = Self::normalize_emoji(emoji)?;
                let active = self
                    .reaction_repo
                    .toggle_reaction(comment_id, &actor.user_id, emoji)
                    .await?;
                tracing::debug!(
                    comment_id = %comment_id,
                    user_id = %actor.user_id,
                    emoji = %emoji,
                    active,
                    "Toggled reaction"
                );
                Ok(ToggleOutcome {
                    active,
                    likes: None,
                })
            }
        }
    }

    fn normalize_emoji(emoji: &str) -> AppResult<&str> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(AppError::Validation("Emoji is required".to_string()));
        }
        if emoji.chars().count() > MAX_EMOJI_CHARS {
            return Err(AppError::Validation("Emoji is too long".to_string()));
        }
        Ok(emoji)
    }
}

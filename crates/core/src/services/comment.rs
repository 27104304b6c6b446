//! Threaded comment engine.
//!
//! Comments hang off exactly one election or news item. A reply points at
//! a top-level comment on the same subject; replies to replies are rejected.

use crate::services::aggregation::{Aggregator, CommentView, or_empty};
use crate::services::identity::Actor;
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::comment,
    repositories::{
        CommentRepository, CommentSubject, ElectionRepository, ModerationFilter, NewsRepository,
    },
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    election_repo: ElectionRepository,
    news_repo: NewsRepository,
    aggregator: Aggregator,
    id_gen: IdGenerator,
}

/// Input for creating a comment or reply.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub election_id: Option<String>,
    pub news_id: Option<String>,
    pub parent_comment_id: Option<String>,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub content: String,
}

/// Requested comment changes.
///
/// | field      | applied when       |
/// |------------|--------------------|
/// | `content`  | actor is the author |
/// | `approved` | actor is an admin   |
/// | `flagged`  | actor is an admin   |
///
/// Anything else is dropped without error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentPatch {
    #[validate(length(max = 5000))]
    pub content: Option<String>,
    pub approved: Option<bool>,
    pub flagged: Option<bool>,
}

impl CommentPatch {
    /// Keep only the fields `actor` may change on a comment by `author_id`.
    #[must_use]
    pub fn authorized_for(self, actor: &Actor, author_id: &str) -> Self {
        let is_author = actor.is(author_id);
        Self {
            content: self.content.filter(|_| is_author),
            approved: self.approved.filter(|_| actor.is_admin),
            flagged: self.flagged.filter(|_| actor.is_admin),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none() && self.approved.is_none() && self.flagged.is_none()
    }
}

/// Comment counts for the moderation dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentStats {
    pub total_comments: u64,
    pub pending_comments: u64,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        election_repo: ElectionRepository,
        news_repo: NewsRepository,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            comment_repo,
            election_repo,
            news_repo,
            aggregator,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment, or a reply when `parent_comment_id` is set.
    pub async fn create(&self, actor: &Actor, input: CreateCommentInput) -> AppResult<CommentView> {
        input.validate()?;

        let content = input.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let subject = match (non_blank(input.election_id), non_blank(input.news_id)) {
            (Some(election_id), None) => CommentSubject::Election(election_id),
            (None, Some(news_id)) => CommentSubject::News(news_id),
            (None, None) => {
                return Err(AppError::Validation(
                    "Either election ID or news ID is required".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "A comment belongs to an election or a news item, not both".to_string(),
                ));
            }
        };

        self.ensure_subject_exists(&subject).await?;

        let parent_comment_id = non_blank(input.parent_comment_id);
        if let Some(parent_id) = &parent_comment_id {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Parent comment not found: {parent_id}"))
                })?;

            if parent.is_reply() {
                return Err(AppError::Validation("Cannot reply to a reply".to_string()));
            }
            if CommentSubject::of(&parent).as_ref() != Some(&subject) {
                return Err(AppError::Validation(
                    "Parent comment belongs to a different subject".to_string(),
                ));
            }
        }

        let (election_id, news_id) = match subject {
            CommentSubject::Election(id) => (Some(id), None),
            CommentSubject::News(id) => (None, Some(id)),
        };

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            election_id: Set(election_id),
            news_id: Set(news_id),
            parent_comment_id: Set(parent_comment_id),
            user_id: Set(actor.user_id.clone()),
            content: Set(content.to_string()),
            likes: Set(0),
            flagged: Set(false),
            approved: Set(true),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;
        tracing::info!(
            comment_id = %created.id,
            user_id = %created.user_id,
            reply = created.is_reply(),
            "Comment created"
        );

        Ok(self.aggregator.new_comment(created).await)
    }

    /// Apply the authorized part of `patch` to a comment.
    pub async fn update(
        &self,
        comment_id: &str,
        actor: &Actor,
        patch: CommentPatch,
    ) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        let patch = patch.authorized_for(actor, &comment.user_id);
        patch.validate()?;

        if patch.is_empty() {
            return Ok(self.aggregator.comment(comment).await);
        }

        let mut active: comment::ActiveModel = comment.into();
        if let Some(content) = patch.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(AppError::Validation("Content cannot be empty".to_string()));
            }
            active.content = Set(content.to_string());
        }
        if let Some(approved) = patch.approved {
            active.approved = Set(approved);
        }
        if let Some(flagged) = patch.flagged {
            active.flagged = Set(flagged);
        }

        let updated = self.comment_repo.update(active).await?;
        tracing::info!(comment_id = %updated.id, actor = %actor.user_id, "Comment updated");

        Ok(self.aggregator.comment(updated).await)
    }

    /// Delete a comment. Replies survive as detached comments.
    pub async fn delete(&self, comment_id: &str, actor: &Actor) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if !actor.is(&comment.user_id) && !actor.is_admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete this comment".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id).await?;
        tracing::info!(comment_id = %comment_id, actor = %actor.user_id, "Comment deleted");
        Ok(())
    }

    /// Top-level comments on a subject, newest first, optionally with
    /// their direct replies.
    pub async fn list_for_subject(
        &self,
        subject: &CommentSubject,
        include_replies: bool,
    ) -> AppResult<Vec<CommentView>> {
        let top_level = self.comment_repo.find_top_level(subject).await?;

        let replies = if include_replies {
            let ids: Vec<String> = top_level.iter().map(|c| c.id.clone()).collect();
            or_empty(self.comment_repo.find_replies(&ids).await, "replies")
        } else {
            vec![]
        };

        Ok(self.aggregator.comments(top_level, replies).await)
    }

    /// Comments for the moderation queue. Admin only.
    pub async fn list_for_moderation(
        &self,
        actor: &Actor,
        filter: ModerationFilter,
    ) -> AppResult<Vec<CommentView>> {
        actor.require_admin()?;
        let comments = self.comment_repo.find_for_moderation(filter).await?;
        Ok(self.aggregator.comments(comments, vec![]).await)
    }

    /// Comment counts. Admin only.
    pub async fn stats(&self, actor: &Actor) -> AppResult<CommentStats> {
        actor.require_admin()?;
        Ok(CommentStats {
            total_comments: self.comment_repo.count_all().await?,
            pending_comments: self.comment_repo.count_pending().await?,
        })
    }

    async fn ensure_subject_exists(&self, subject: &CommentSubject) -> AppResult<()> {
        match subject {
            CommentSubject::Election(id) => {
                self.election_repo.get_by_id(id).await?;
            }
            CommentSubject::News(id) => {
                self.news_repo
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("News not found: {id}")))?;
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

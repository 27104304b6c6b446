//! Comment repository.

use std::sync::Arc;

use crate::{db_error, violated_foreign_key};
use crate::entities::{Comment, comment};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

/// The entity a comment thread hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSubject {
    Election(String),
    News(String),
}

impl CommentSubject {
    /// Resolve the subject columns of a comment.
    ///
    /// Returns `None` unless exactly one of the two is set.
    #[must_use]
    pub fn of(model: &comment::Model) -> Option<Self> {
        match (&model.election_id, &model.news_id) {
            (Some(id), None) => Some(Self::Election(id.clone())),
            (None, Some(id)) => Some(Self::News(id.clone())),
            _ => None,
        }
    }

    fn condition(&self) -> Condition {
        match self {
            Self::Election(id) => Condition::all().add(comment::Column::ElectionId.eq(id.as_str())),
            Self::News(id) => Condition::all().add(comment::Column::NewsId.eq(id.as_str())),
        }
    }
}

/// Filter for the moderation listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModerationFilter {
    #[default]
    All,
    /// Not yet approved.
    Pending,
    Approved,
    Flagged,
}

impl std::str::FromStr for ModerationFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "flagged" => Ok(Self::Flagged),
            other => Err(AppError::Validation(format!("Unknown filter: {other}"))),
        }
    }
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Get a comment by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {id}")))
    }

    /// Create a new comment.
    ///
    /// A referenced row removed since it was checked yields
    /// [`AppError::NotFound`].
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model.insert(self.db.as_ref()).await.map_err(insert_error)
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model.update(self.db.as_ref()).await.map_err(db_error)
    }

    /// Delete a comment. Likes and reactions cascade; replies are detached.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Top-level comments on a subject, newest first.
    pub async fn find_top_level(&self, subject: &CommentSubject) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(subject.condition())
            .filter(comment::Column::ParentCommentId.is_null())
            .order_by_desc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Direct replies to any of the given comments, newest first.
    pub async fn find_replies(&self, parent_ids: &[String]) -> AppResult<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        Comment::find()
            .filter(comment::Column::ParentCommentId.is_in(parent_ids.to_vec()))
            .order_by_desc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Every comment matching a moderation filter, newest first.
    pub async fn find_for_moderation(
        &self,
        filter: ModerationFilter,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find();

        query = match filter {
            ModerationFilter::All => query,
            ModerationFilter::Pending => query.filter(comment::Column::Approved.eq(false)),
            ModerationFilter::Approved => query.filter(comment::Column::Approved.eq(true)),
            ModerationFilter::Flagged => query.filter(comment::Column::Flagged.eq(true)),
        };

        query
            .order_by_desc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Count all comments.
    pub async fn count_all(&self) -> AppResult<u64> {
        Comment::find()
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Count comments awaiting approval.
    pub async fn count_pending(&self) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::Approved.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

fn insert_error(err: DbErr) -> AppError {
    violated_foreign_key(&err)
        .and_then(|constraint| foreign_key_error(&constraint))
        .unwrap_or_else(|| db_error(err))
}

fn foreign_key_error(constraint: &str) -> Option<AppError> {
    let missing = match constraint {
        "fk_comment_user" => "User",
        "fk_comment_election" => "Election",
        "fk_comment_news" => "News article",
        "fk_comment_parent" => "Parent comment",
        _ => return None,
    };
    Some(AppError::NotFound(format!("{missing} not found")))
}

//! Like and emoji reaction repository.
//!
//! Both toggles lock the target comment row for the duration of the
//! transaction, so concurrent toggles on one comment serialize and the
//! recomputed `likes` counter always matches the `comment_like` rows.

use std::sync::Arc;

use crate::{db_error, violated_foreign_key};
use crate::entities::{
    Comment, CommentLike, CommentReaction, comment, comment_like, comment_reaction,
};
use agora_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    /// Whether the actor likes the comment after the toggle.
    pub liked: bool,
    /// The recomputed like counter.
    pub likes: i32,
}

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Flip the like of `user_id` on a comment and recompute its counter.
    pub async fn toggle_like(&self, comment_id: &str, user_id: &str) -> AppResult<LikeToggle> {
        let txn = self.db.begin().await.map_err(db_error)?;
        lock_comment(&txn, comment_id).await?;

        let removed = CommentLike::delete_many()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .filter(comment_like::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(db_error)?
            .rows_affected;

        let liked = if removed > 0 {
            false
        } else {
            let like = comment_like::ActiveModel {
                comment_id: Set(comment_id.to_string()),
                user_id: Set(user_id.to_string()),
                created_at: Set(Utc::now().into()),
            };
            // A lost race leaves the row in place, which is still "on".
            CommentLike::insert(like)
                .on_conflict(
                    OnConflict::columns([
                        comment_like::Column::CommentId,
                        comment_like::Column::UserId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(insert_error)?;
            true
        };

        let count = CommentLike::find()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .count(&txn)
            .await
            .map_err(db_error)?;
        let likes = i32::try_from(count)
            .map_err(|_| AppError::Internal(format!("Like count overflow on {comment_id}")))?;

        Comment::update_many()
            .col_expr(comment::Column::Likes, Expr::value(likes))
            .filter(comment::Column::Id.eq(comment_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        txn.commit().await.map_err(db_error)?;
        Ok(LikeToggle { liked, likes })
    }

    /// Flip the `emoji` reaction of `user_id` on a comment.
    ///
    /// Returns whether the reaction is present afterwards.
    pub async fn toggle_reaction(
        &self,
        comment_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(db_error)?;
        lock_comment(&txn, comment_id).await?;

        let removed = CommentReaction::delete_many()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .filter(comment_reaction::Column::Emoji.eq(emoji))
            .exec(&txn)
            .await
            .map_err(db_error)?
            .rows_affected;

        if removed == 0 {
            let reaction = comment_reaction::ActiveModel {
                comment_id: Set(comment_id.to_string()),
                user_id: Set(user_id.to_string()),
                emoji: Set(emoji.to_string()),
                created_at: Set(Utc::now().into()),
            };
            CommentReaction::insert(reaction)
                .on_conflict(
                    OnConflict::columns([
                        comment_reaction::Column::CommentId,
                        comment_reaction::Column::UserId,
                        comment_reaction::Column::Emoji,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(insert_error)?;
        }

        txn.commit().await.map_err(db_error)?;
        Ok(removed == 0)
    }

    /// All likes on the given comments.
    pub async fn find_likes_for(
        &self,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_like::Model>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        CommentLike::find()
            .filter(comment_like::Column::CommentId.is_in(comment_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// All emoji reactions on the given comments.
    pub async fn find_reactions_for(
        &self,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_reaction::Model>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.is_in(comment_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

async fn lock_comment(txn: &DatabaseTransaction, comment_id: &str) -> AppResult<comment::Model> {
    Comment::find_by_id(comment_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))
}

fn insert_error(err: DbErr) -> AppError {
    violated_foreign_key(&err)
        .and_then(|constraint| foreign_key_error(&constraint))
        .unwrap_or_else(|| db_error(err))
}

fn foreign_key_error(constraint: &str) -> Option<AppError> {
    match constraint {
        "fk_comment_like_user" | "fk_comment_reaction_user" => {
            Some(AppError::NotFound("User not found".to_string()))
        }
        "fk_comment_like_comment" | "fk_comment_reaction_comment" => {
            Some(AppError::NotFound("Comment not found".to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn create_test_comment(id: &str, likes: i32) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            election_id: Some("election1".to_string()),
            news_id: None,
            parent_comment_id: None,
            user_id: "author".to_string(),
            content: "Hello".to_string(),
            likes,
            flagged: false,
            approved: true,
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn count(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[tokio::test]
    async fn test_toggle_like_on() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", 1)]])
                .append_exec_results([exec(0), exec(1)])
                .append_query_results([[count(2)]])
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo.toggle_like("c1", "user2").await.unwrap();

        assert_eq!(result, LikeToggle { liked: true, likes: 2 });
    }

    #[tokio::test]
    async fn test_toggle_like_off() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", 2)]])
                .append_exec_results([exec(1)])
                .append_query_results([[count(1)]])
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo.toggle_like("c1", "user1").await.unwrap();

        assert_eq!(result, LikeToggle { liked: false, likes: 1 });
    }

    #[tokio::test]
    async fn test_toggle_like_lost_race_reports_on() {
        // delete removed nothing, insert hit the conflict and inserted nothing
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", 1)]])
                .append_exec_results([exec(0), exec(0)])
                .append_query_results([[count(1)]])
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo.toggle_like("c1", "user1").await.unwrap();

        assert!(result.liked);
        assert_eq!(result.likes, 1);
    }

    #[tokio::test]
    async fn test_toggle_like_missing_comment() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo.toggle_like("missing", "user1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_reaction_on_then_off() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", 0)]])
                .append_exec_results([exec(0), exec(1)])
                .append_query_results([[create_test_comment("c1", 0)]])
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        assert!(repo.toggle_reaction("c1", "user1", "👍").await.unwrap());
        assert!(!repo.toggle_reaction("c1", "user1", "👍").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_likes_for_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = ReactionRepository::new(db);
        assert!(repo.find_likes_for(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_foreign_key_errors() {
        assert!(matches!(
            foreign_key_error("fk_comment_like_user"),
            Some(AppError::NotFound(msg)) if msg == "User not found"
        ));
        assert!(matches!(
            foreign_key_error("fk_comment_reaction_comment"),
            Some(AppError::NotFound(msg)) if msg == "Comment not found"
        ));
        assert!(foreign_key_error("fk_unrelated").is_none());
    }
}

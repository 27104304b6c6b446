//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use crate::{db_error, is_unique_violation, violated_foreign_key};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};

/// Number of votes held by a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct CandidateTally {
    pub candidate_id: String,
    pub votes: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a user cast in an election.
    pub async fn find_by_user_and_election(
        &self,
        user_id: &str,
        election_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::ElectionId.eq(election_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// List every vote a user has cast, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Record a vote unless the user already voted in that election.
    ///
    /// The check and the insert share one transaction, and the unique
    /// index on `(user_id, election_id)` rejects whichever of two racing
    /// inserts lands second. Either way the loser gets
    /// [`AppError::Conflict`].
    pub async fn create_exclusive(&self, model: vote::Model) -> AppResult<vote::Model> {
        let user_id = model.user_id;
        let election_id = model.election_id.clone();

        let txn = self.db.begin().await.map_err(db_error)?;

        let existing = Vote::find()
            .filter(vote::Column::UserId.eq(user_id.as_str()))
            .filter(vote::Column::ElectionId.eq(election_id.as_str()))
            .one(&txn)
            .await
            .map_err(db_error)?;

        if existing.is_some() {
            txn.rollback().await.map_err(db_error)?;
            return Err(already_voted(&election_id));
        }

        let active = vote::ActiveModel {
            id: Set(model.id),
            user_id: Set(user_id),
            election_id: Set(election_id.clone()),
            candidate_id: Set(model.candidate_id),
            created_at: Set(model.created_at),
        };

        let vote = active
            .insert(&txn)
            .await
            .map_err(|e| insert_error(e, &election_id))?;

        txn.commit().await.map_err(db_error)?;
        Ok(vote)
    }

    /// Count the votes cast for a candidate.
    pub async fn count_by_candidate(&self, candidate_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::CandidateId.eq(candidate_id))
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Count the votes cast in an election.
    pub async fn count_by_election(&self, election_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::ElectionId.eq(election_id))
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Per-candidate vote counts for an election. Candidates without votes
    /// are absent.
    pub async fn tally_by_election(&self, election_id: &str) -> AppResult<Vec<CandidateTally>> {
        Vote::find()
            .select_only()
            .column(vote::Column::CandidateId)
            .column_as(Expr::col(vote::Column::Id).count(), "votes")
            .filter(vote::Column::ElectionId.eq(election_id))
            .group_by(vote::Column::CandidateId)
            .into_model::<CandidateTally>()
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Count all votes in the store.
    pub async fn count_all(&self) -> AppResult<u64> {
        Vote::find().count(self.db.as_ref()).await.map_err(db_error)
    }
}

fn already_voted(election_id: &str) -> AppError {
    AppError::Conflict(format!("User has already voted in election {election_id}"))
}

fn insert_error(err: DbErr, election_id: &str) -> AppError {
    if is_unique_violation(&err) {
        return already_voted(election_id);
    }
    violated_foreign_key(&err)
        .and_then(|constraint| foreign_key_error(&constraint, election_id))
        .unwrap_or_else(|| db_error(err))
}

fn foreign_key_error(constraint: &str, election_id: &str) -> Option<AppError> {
    match constraint {
        "fk_vote_user" => Some(AppError::NotFound("User not found".to_string())),
        "fk_vote_election" => Some(AppError::NotFound(format!(
            "Election not found: {election_id}"
        ))),
        "fk_vote_candidate_election" => Some(AppError::InvalidReference(format!(
            "Candidate does not belong to election {election_id}"
        ))),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn create_test_vote(id: &str, user_id: &str, candidate_id: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            election_id: "election1".to_string(),
            candidate_id: candidate_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_exclusive_inserts_first_vote() {
        let vote = create_test_vote("v1", "user1", "cand1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote::Model>::new()])
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.create_exclusive(vote).await.unwrap();

        assert_eq!(result.id, "v1");
        assert_eq!(result.candidate_id, "cand1");
    }

    #[tokio::test]
    async fn test_create_exclusive_rejects_second_vote() {
        let existing = create_test_vote("v1", "user1", "cand1");
        let second = create_test_vote("v2", "user1", "cand2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.create_exclusive(second).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_count_by_candidate() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert_eq!(repo.count_by_candidate("cand1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_tally_by_election() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    btreemap! {
                        "candidate_id" => Value::from("cand1"),
                        "votes" => Value::BigInt(Some(2)),
                    },
                    btreemap! {
                        "candidate_id" => Value::from("cand2"),
                        "votes" => Value::BigInt(Some(1)),
                    },
                ]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let tally = repo.tally_by_election("election1").await.unwrap();

        assert_eq!(tally.len(), 2);
        assert_eq!(tally[0].candidate_id, "cand1");
        assert_eq!(tally[0].votes, 2);
    }

    #[test]
    fn test_foreign_key_errors_name_the_missing_row() {
        assert!(matches!(
            foreign_key_error("fk_vote_user", "e1"),
            Some(AppError::NotFound(msg)) if msg == "User not found"
        ));
        assert!(matches!(
            foreign_key_error("fk_vote_election", "e1"),
            Some(AppError::NotFound(_))
        ));
        assert!(matches!(
            foreign_key_error("fk_vote_candidate_election", "e1"),
            Some(AppError::InvalidReference(_))
        ));
        assert!(foreign_key_error("fk_something_else", "e1").is_none());
    }
}

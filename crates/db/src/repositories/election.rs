//! Election and candidate repository.
//!
//! Elections and candidates are managed elsewhere; the engine only needs
//! existence checks and the owning election of a candidate.

use std::sync::Arc;

use crate::db_error;
use crate::entities::{Candidate, Election, candidate, election};
use agora_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Repository for elections and their candidates.
#[derive(Clone)]
pub struct ElectionRepository {
    db: Arc<DatabaseConnection>,
}

impl ElectionRepository {
    /// Create a new election repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an election by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<election::Model>> {
        Election::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Get an election by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<election::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Election not found: {id}")))
    }

    /// Find a candidate by ID.
    pub async fn find_candidate(&self, id: &str) -> AppResult<Option<candidate::Model>> {
        Candidate::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// List the candidates of an election.
    pub async fn find_candidates(&self, election_id: &str) -> AppResult<Vec<candidate::Model>> {
        Candidate::find()
            .filter(candidate::Column::ElectionId.eq(election_id))
            .order_by_asc(candidate::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_election(id: &str) -> election::Model {
        election::Model {
            id: id.to_string(),
            country_id: "country1".to_string(),
            election_type: "presidential".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            status: "ongoing".to_string(),
            description: "General election".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<election::Model>::new()])
                .into_connection(),
        );

        let repo = ElectionRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_election("e1")]])
                .into_connection(),
        );

        let repo = ElectionRepository::new(db);
        let election = repo.get_by_id("e1").await.unwrap();

        assert_eq!(election.election_type, "presidential");
    }
}

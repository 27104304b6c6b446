//! News repository (existence checks only).

use std::sync::Arc;

use crate::db_error;
use crate::entities::{News, news};
use agora_common::AppResult;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Repository for news items.
#[derive(Clone)]
pub struct NewsRepository {
    db: Arc<DatabaseConnection>,
}

impl NewsRepository {
    /// Create a new news repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a news item by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<news::Model>> {
        News::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

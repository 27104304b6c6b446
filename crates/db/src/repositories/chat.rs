//! Chat room, moderator and message repository.

use std::sync::Arc;

use crate::entities::{
    ChatMessage, ChatModerator, ChatRoom, chat_message, chat_moderator, chat_room,
};
use crate::{db_error, is_unique_violation, violated_foreign_key};
use agora_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::OnConflict,
};

/// A room together with the IDs of its moderators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomWithModerators {
    pub room: chat_room::Model,
    pub moderators: Vec<String>,
}

/// Field changes for a room update.
///
/// `None` keeps the current value. `description: Some(None)` clears it,
/// and `moderators: Some(vec![])` removes every moderator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub moderators: Option<Vec<String>>,
}

/// Chat repository for database operations.
#[derive(Clone)]
pub struct ChatRepository {
    db: Arc<DatabaseConnection>,
}

impl ChatRepository {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Rooms ====================

    /// Find a room by ID.
    pub async fn find_room(&self, id: &str) -> AppResult<Option<chat_room::Model>> {
        ChatRoom::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Get a room by ID, returning error if not found.
    pub async fn get_room(&self, id: &str) -> AppResult<chat_room::Model> {
        self.find_room(id)
            .await?
            .ok_or_else(|| room_not_found(id))
    }

    /// List rooms, optionally narrowed by type and entity.
    pub async fn find_rooms(
        &self,
        room_type: Option<&str>,
        entity_id: Option<&str>,
    ) -> AppResult<Vec<chat_room::Model>> {
        let mut query = ChatRoom::find();

        if let Some(room_type) = room_type {
            query = query.filter(chat_room::Column::RoomType.eq(room_type));
        }
        if let Some(entity_id) = entity_id {
            query = query.filter(chat_room::Column::EntityId.eq(entity_id));
        }

        query
            .order_by_asc(chat_room::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Create a room and its moderator set in one transaction.
    ///
    /// Fails with [`AppError::Conflict`] when a room with the same ID (or the
    /// same type and entity) already exists.
    pub async fn create_room(
        &self,
        room: chat_room::Model,
        moderators: &[String],
    ) -> AppResult<RoomWithModerators> {
        let room_id = room.id.clone();
        let txn = self.db.begin().await.map_err(db_error)?;

        let active = chat_room::ActiveModel {
            id: Set(room.id.clone()),
            room_type: Set(room.room_type.clone()),
            entity_id: Set(room.entity_id.clone()),
            name: Set(room.name.clone()),
            description: Set(room.description.clone()),
            active_users: Set(room.active_users),
            created_at: Set(room.created_at),
        };

        let inserted = ChatRoom::insert(active)
            .on_conflict(
                OnConflict::column(chat_room::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    room_exists(&room_id)
                } else {
                    db_error(e)
                }
            })?;

        if inserted == 0 {
            txn.rollback().await.map_err(db_error)?;
            return Err(room_exists(&room_id));
        }

        let moderators = dedup(moderators);
        insert_moderators(&txn, &room_id, &moderators).await?;

        txn.commit().await.map_err(db_error)?;
        Ok(RoomWithModerators { room, moderators })
    }

    /// Apply changes to a room in one transaction.
    pub async fn update_room(
        &self,
        id: &str,
        changes: RoomChanges,
    ) -> AppResult<RoomWithModerators> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let current = ChatRoom::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| room_not_found(id))?;

        let room = if changes.name.is_some() || changes.description.is_some() {
            let mut active: chat_room::ActiveModel = current.into();
            if let Some(name) = changes.name {
                active.name = Set(name);
            }
            if let Some(description) = changes.description {
                active.description = Set(description);
            }
            active.update(&txn).await.map_err(db_error)?
        } else {
            current
        };

        let moderators = if let Some(replacement) = changes.moderators {
            ChatModerator::delete_many()
                .filter(chat_moderator::Column::RoomId.eq(id))
                .exec(&txn)
                .await
                .map_err(db_error)?;

            let replacement = dedup(&replacement);
            insert_moderators(&txn, id, &replacement).await?;
            replacement
        } else {
            ChatModerator::find()
                .filter(chat_moderator::Column::RoomId.eq(id))
                .all(&txn)
                .await
                .map_err(db_error)?
                .into_iter()
                .map(|m| m.user_id)
                .collect()
        };

        txn.commit().await.map_err(db_error)?;
        Ok(RoomWithModerators { room, moderators })
    }

    /// Delete a room. Moderators and messages cascade.
    pub async fn delete_room(&self, id: &str) -> AppResult<()> {
        let result = ChatRoom::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;

        if result.rows_affected == 0 {
            return Err(room_not_found(id));
        }
        Ok(())
    }

    /// Moderator rows for the given rooms.
    pub async fn find_moderators(
        &self,
        room_ids: &[String],
    ) -> AppResult<Vec<chat_moderator::Model>> {
        if room_ids.is_empty() {
            return Ok(vec![]);
        }

        ChatModerator::find()
            .filter(chat_moderator::Column::RoomId.is_in(room_ids.to_vec()))
            .order_by_asc(chat_moderator::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    // ==================== Messages ====================

    /// Find a message by ID.
    pub async fn find_message(&self, id: &str) -> AppResult<Option<chat_message::Model>> {
        ChatMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Get a message by ID, returning error if not found.
    pub async fn get_message(&self, id: &str) -> AppResult<chat_message::Model> {
        self.find_message(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message not found: {id}")))
    }

    /// Create a new message.
    pub async fn create_message(
        &self,
        model: chat_message::ActiveModel,
    ) -> AppResult<chat_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(message_insert_error)
    }

    /// Update a message.
    pub async fn update_message(
        &self,
        model: chat_message::ActiveModel,
    ) -> AppResult<chat_message::Model> {
        model.update(self.db.as_ref()).await.map_err(db_error)
    }

    /// Hard-delete a message.
    pub async fn delete_message(&self, id: &str) -> AppResult<()> {
        ChatMessage::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// The newest non-deleted messages of a room.
    pub async fn find_messages(
        &self,
        room_id: &str,
        limit: u64,
    ) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::RoomId.eq(room_id))
            .filter(chat_message::Column::Deleted.eq(false))
            .order_by_desc(chat_message::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Every flagged message, newest first.
    pub async fn find_flagged(&self) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::Flagged.eq(true))
            .order_by_desc(chat_message::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

async fn insert_moderators(
    txn: &DatabaseTransaction,
    room_id: &str,
    user_ids: &[String],
) -> AppResult<()> {
    if user_ids.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = user_ids.iter().map(|user_id| chat_moderator::ActiveModel {
        room_id: Set(room_id.to_string()),
        user_id: Set(user_id.clone()),
        created_at: Set(now.into()),
    });

    ChatModerator::insert_many(rows)
        .exec_without_returning(txn)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Drop repeated IDs, keeping first-seen order.
fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn room_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Chat room not found: {id}"))
}

fn room_exists(id: &str) -> AppError {
    AppError::Conflict(format!("Chat room already exists: {id}"))
}

fn message_insert_error(err: DbErr) -> AppError {
    violated_foreign_key(&err)
        .and_then(|constraint| message_foreign_key_error(&constraint))
        .unwrap_or_else(|| db_error(err))
}

fn message_foreign_key_error(constraint: &str) -> Option<AppError> {
    match constraint {
        "fk_chat_message_user" => Some(AppError::NotFound("User not found".to_string())),
        "fk_chat_message_room" => Some(AppError::NotFound("Chat room not found".to_string())),
        _ => None,
    }
}

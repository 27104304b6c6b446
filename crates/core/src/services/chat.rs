//! Chat moderation engine.
//!
//! Rooms are admin-managed and keyed by `"{type}_{entity_id}"`. Messages
//! carry three moderation flags (`flagged`, `deleted`, `is_pinned`) with
//! per-field authorization.

use crate::services::aggregation::{Aggregator, ChatMessageView, ChatRoomView};
use crate::services::identity::Actor;
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{chat_message, chat_room},
    repositories::{ChatRepository, RoomChanges},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Messages returned when no limit is given.
pub const DEFAULT_MESSAGE_LIMIT: u64 = 50;

/// Upper bound on a message page.
pub const MAX_MESSAGE_LIMIT: u64 = 100;

/// Chat service for business logic.
#[derive(Clone)]
pub struct ChatService {
    chat_repo: ChatRepository,
    aggregator: Aggregator,
    id_gen: IdGenerator,
}

/// Input for creating a room.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomInput {
    #[serde(rename = "type", default)]
    #[validate(length(max = 32))]
    pub room_type: String,

    #[serde(default)]
    #[validate(length(max = 64))]
    pub entity_id: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub name: String,

    #[validate(length(max = 1024))]
    pub description: Option<String>,

    pub moderators: Option<Vec<String>>,
}

/// Input for updating a room. Absent fields are kept.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomInput {
    #[validate(length(max = 128))]
    pub name: Option<String>,

    /// `null` clears the description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    /// Replaces the moderator set; `[]` removes everyone.
    pub moderators: Option<Vec<String>>,
}

/// Input for sending a message.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SendMessageInput {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub content: String,
}

/// Requested message changes.
///
/// | field       | applied when             |
/// |-------------|--------------------------|
/// | `content`   | actor is the author      |
/// | `flagged`   | actor is an admin        |
/// | `deleted`   | actor is author or admin |
/// | `is_pinned` | actor is an admin        |
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    #[validate(length(max = 2000))]
    pub content: Option<String>,
    pub flagged: Option<bool>,
    pub deleted: Option<bool>,
    pub is_pinned: Option<bool>,
}

impl MessagePatch {
    /// Keep only the fields `actor` may change on a message by `author_id`.
    #[must_use]
    pub fn authorized_for(self, actor: &Actor, author_id: &str) -> Self {
        let is_author = actor.is(author_id);
        Self {
            content: self.content.filter(|_| is_author),
            flagged: self.flagged.filter(|_| actor.is_admin),
            deleted: self.deleted.filter(|_| is_author || actor.is_admin),
            is_pinned: self.is_pinned.filter(|_| actor.is_admin),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.flagged.is_none()
            && self.deleted.is_none()
            && self.is_pinned.is_none()
    }
}

impl ChatService {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(chat_repo: ChatRepository, aggregator: Aggregator) -> Self {
        Self {
            chat_repo,
            aggregator,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Rooms ====================

    /// Create a room with an initial moderator set. Admin only.
    pub async fn create_room(
        &self,
        actor: &Actor,
        input: CreateRoomInput,
    ) -> AppResult<ChatRoomView> {
        actor.require_admin()?;
        input.validate()?;

        let room_type = input.room_type.trim();
        let entity_id = input.entity_id.trim();
        let name = input.name.trim();
        if room_type.is_empty() || entity_id.is_empty() || name.is_empty() {
            return Err(AppError::Validation(
                "Type, entity ID, and name are required".to_string(),
            ));
        }
        if !is_valid_room_type(room_type) {
            return Err(AppError::Validation(
                "Room type may only contain lowercase letters, digits and '-'".to_string(),
            ));
        }

        let room = chat_room::Model {
            id: format!("{room_type}_{entity_id}"),
            room_type: room_type.to_string(),
            entity_id: entity_id.to_string(),
            name: name.to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            active_users: 0,
            created_at: Utc::now().into(),
        };
        let moderators = clean_ids(input.moderators.unwrap_or_default());

        let created = self.chat_repo.create_room(room, &moderators).await?;
        tracing::info!(
            room_id = %created.room.id,
            moderators = created.moderators.len(),
            "Chat room created"
        );

        Ok(ChatRoomView::new(created.room, created.moderators))
    }

    /// Update a room's name, description or moderator set. Admin only.
    pub async fn update_room(
        &self,
        actor: &Actor,
        room_id: &str,
        input: UpdateRoomInput,
    ) -> AppResult<ChatRoomView> {
        actor.require_admin()?;
        input.validate()?;

        let name = match input.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::Validation("Room name cannot be empty".to_string()));
            }
            other => other.map(|n| n.trim().to_string()),
        };

        let changes = RoomChanges {
            name,
            description: input.description,
            moderators: input.moderators.map(clean_ids),
        };

        let updated = self.chat_repo.update_room(room_id, changes).await?;
        tracing::info!(room_id = %room_id, "Chat room updated");

        Ok(ChatRoomView::new(updated.room, updated.moderators))
    }

    /// Delete a room with its moderators and messages. Admin only.
    pub async fn delete_room(&self, actor: &Actor, room_id: &str) -> AppResult<()> {
        actor.require_admin()?;
        self.chat_repo.delete_room(room_id).await?;
        tracing::info!(room_id = %room_id, "Chat room deleted");
        Ok(())
    }

    /// Get a room with its moderators.
    pub async fn get_room(&self, room_id: &str) -> AppResult<ChatRoomView> {
        let room = self.chat_repo.get_room(room_id).await?;
        let mut views = self.aggregator.rooms(vec![room.clone()]).await;
        Ok(views
            .pop()
            .unwrap_or_else(|| ChatRoomView::new(room, vec![])))
    }

    /// List rooms, optionally by type and entity.
    pub async fn list_rooms(
        &self,
        room_type: Option<&str>,
        entity_id: Option<&str>,
    ) -> AppResult<Vec<ChatRoomView>> {
        let rooms = self.chat_repo.find_rooms(room_type, entity_id).await?;
        Ok(self.aggregator.rooms(rooms).await)
    }

    // ==================== Messages ====================

    /// Post a message to a room.
    pub async fn send_message(
        &self,
        actor: &Actor,
        room_id: &str,
        input: SendMessageInput,
    ) -> AppResult<ChatMessageView> {
        input.validate()?;

        let content = input.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        self.chat_repo.get_room(room_id).await?;

        let model = chat_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            room_id: Set(room_id.to_string()),
            user_id: Set(actor.user_id.clone()),
            content: Set(content.to_string()),
            flagged: Set(false),
            deleted: Set(false),
            is_pinned: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let message = self.chat_repo.create_message(model).await?;
        tracing::debug!(message_id = %message.id, room_id = %room_id, "Message sent");

        Ok(self.aggregator.message(message).await)
    }

    /// The newest visible messages of a room.
    pub async fn list_messages(
        &self,
        room_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<ChatMessageView>> {
        self.chat_repo.get_room(room_id).await?;

        let limit = limit
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .clamp(1, MAX_MESSAGE_LIMIT);
        let messages = self.chat_repo.find_messages(room_id, limit).await?;

        Ok(self.aggregator.messages(messages).await)
    }

    /// Apply the authorized part of `patch` to a message.
    pub async fn update_message(
        &self,
        message_id: &str,
        actor: &Actor,
        patch: MessagePatch,
    ) -> AppResult<ChatMessageView> {
        let message = self.chat_repo.get_message(message_id).await?;
        let patch = patch.authorized_for(actor, &message.user_id);
        patch.validate()?;

        if patch.is_empty() {
            return Ok(self.aggregator.message(message).await);
        }

        let mut active: chat_message::ActiveModel = message.into();
        if let Some(content) = patch.content {
            let content = content.trim();
            if content.is_empty() {
                return Err(AppError::Validation("Content cannot be empty".to_string()));
            }
            active.content = Set(content.to_string());
        }
        if let Some(flagged) = patch.flagged {
            active.flagged = Set(flagged);
        }
        if let Some(deleted) = patch.deleted {
            active.deleted = Set(deleted);
        }
        if let Some(is_pinned) = patch.is_pinned {
            active.is_pinned = Set(is_pinned);
        }

        let updated = self.chat_repo.update_message(active).await?;
        tracing::info!(message_id = %updated.id, actor = %actor.user_id, "Message updated");

        Ok(self.aggregator.message(updated).await)
    }

    /// Permanently remove a message. Author or admin only.
    pub async fn delete_message(&self, message_id: &str, actor: &Actor) -> AppResult<()> {
        let message = self.chat_repo.get_message(message_id).await?;

        if !actor.is(&message.user_id) && !actor.is_admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete this message".to_string(),
            ));
        }

        self.chat_repo.delete_message(message_id).await?;
        tracing::info!(message_id = %message_id, actor = %actor.user_id, "Message deleted");
        Ok(())
    }

    /// Every flagged message, newest first. Admin only.
    pub async fn list_flagged(&self, actor: &Actor) -> AppResult<Vec<ChatMessageView>> {
        actor.require_admin()?;
        let messages = self.chat_repo.find_flagged().await?;
        Ok(self.aggregator.messages(messages).await)
    }
}

fn is_valid_room_type(room_type: &str) -> bool {
    !room_type.is_empty()
        && room_type
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn clean_ids(ids: Vec<String>) -> Vec<String> {
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::entities::{chat_moderator, user};
    use agora_db::repositories::{ReactionRepository, UserRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> ChatService {
        let db = Arc::new(db);
        ChatService::new(
            ChatRepository::new(db.clone()),
            Aggregator::new(
                UserRepository::new(db.clone()),
                ReactionRepository::new(db.clone()),
                ChatRepository::new(db),
            ),
        )
    }

    fn create_test_room() -> chat_room::Model {
        chat_room::Model {
            id: "election_e1".to_string(),
            room_type: "election".to_string(),
            entity_id: "e1".to_string(),
            name: "Election chat".to_string(),
            description: None,
            active_users: 0,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_message(author: &str) -> chat_message::Model {
        chat_message::Model {
            id: "msg1".to_string(),
            room_id: "election_e1".to_string(),
            user_id: author.to_string(),
            content: "Hi all".to_string(),
            flagged: false,
            deleted: false,
            is_pinned: false,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Bob".to_string(),
            avatar: None,
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn full_patch() -> MessagePatch {
        MessagePatch {
            content: Some("Edited".to_string()),
            flagged: Some(true),
            deleted: Some(true),
            is_pinned: Some(true),
        }
    }

    // ==================== Field authorization ====================

    #[test]
    fn test_patch_author_non_admin() {
        let patch = full_patch().authorized_for(&Actor::new("author", false), "author");
        assert_eq!(
            patch,
            MessagePatch {
                content: Some("Edited".to_string()),
                flagged: None,
                deleted: Some(true),
                is_pinned: None,
            }
        );
    }

    #[test]
    fn test_patch_admin_non_author() {
        let patch = full_patch().authorized_for(&Actor::new("admin", true), "author");
        assert_eq!(
            patch,
            MessagePatch {
                content: None,
                flagged: Some(true),
                deleted: Some(true),
                is_pinned: Some(true),
            }
        );
    }

    #[test]
    fn test_patch_author_admin() {
        let patch = full_patch().authorized_for(&Actor::new("author", true), "author");
        assert_eq!(patch, full_patch());
    }

    #[test]
    fn test_patch_neither() {
        let patch = full_patch().authorized_for(&Actor::new("other", false), "author");
        assert!(patch.is_empty());
    }

    // ==================== Input parsing ====================

    #[test]
    fn test_update_room_description_tri_state() {
        let absent: UpdateRoomInput = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateRoomInput = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateRoomInput = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        assert_eq!(set.description, Some(Some("d".to_string())));
    }

    #[test]
    fn test_update_room_moderators_presence() {
        let kept: UpdateRoomInput = serde_json::from_str("{}").unwrap();
        assert!(kept.moderators.is_none());

        let cleared: UpdateRoomInput = serde_json::from_str(r#"{"moderators":[]}"#).unwrap();
        assert_eq!(cleared.moderators, Some(vec![]));
    }

    #[test]
    fn test_room_type_charset() {
        assert!(is_valid_room_type("election"));
        assert!(is_valid_room_type("news-2026"));
        assert!(!is_valid_room_type("Election"));
        assert!(!is_valid_room_type("a_b"));
        assert!(!is_valid_room_type(""));
    }

    // ==================== Rooms ====================

    #[tokio::test]
    async fn test_create_room_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let input = CreateRoomInput {
            room_type: "election".to_string(),
            entity_id: "e1".to_string(),
            name: "Chat".to_string(),
            ..Default::default()
        };
        let result = service(db).create_room(&Actor::new("u1", false), input).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_room_derives_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1)])
            .into_connection();

        let input = CreateRoomInput {
            room_type: "election".to_string(),
            entity_id: "e1".to_string(),
            name: "Chat".to_string(),
            description: None,
            moderators: Some(vec!["m1".to_string(), " ".to_string()]),
        };
        let view = service(db)
            .create_room(&Actor::new("admin", true), input)
            .await
            .unwrap();

        assert_eq!(view.id, "election_e1");
        assert_eq!(view.moderators, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_create_room_invalid_type() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let input = CreateRoomInput {
            room_type: "Bad Type".to_string(),
            entity_id: "e1".to_string(),
            name: "Chat".to_string(),
            ..Default::default()
        };
        let result = service(db).create_room(&Actor::new("admin", true), input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_room_omitting_moderators_keeps_them() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_room()]])
            .append_query_results([[chat_moderator::Model {
                room_id: "election_e1".to_string(),
                user_id: "m1".to_string(),
                created_at: Utc::now().into(),
            }]])
            .into_connection();

        let view = service(db)
            .update_room(&Actor::new("admin", true), "election_e1", UpdateRoomInput::default())
            .await
            .unwrap();

        assert_eq!(view.moderators, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_room_blank_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let input = UpdateRoomInput {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        let result = service(db)
            .update_room(&Actor::new("admin", true), "election_e1", input)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_room_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<chat_room::Model>::new()])
            .into_connection();

        let result = service(db).get_room("nope").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    // ==================== Messages ====================

    #[tokio::test]
    async fn test_send_message_blank() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let input = SendMessageInput {
            content: " ".to_string(),
        };
        let result = service(db)
            .send_message(&Actor::new("u1", false), "election_e1", input)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_message_missing_room() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<chat_room::Model>::new()])
            .into_connection();

        let input = SendMessageInput {
            content: "Hi".to_string(),
        };
        let result = service(db)
            .send_message(&Actor::new("u1", false), "gone", input)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_message() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_room()]])
            .append_query_results([[create_test_message("u1")]])
            .append_query_results([[create_test_user("u1")]])
            .into_connection();

        let input = SendMessageInput {
            content: "Hi all".to_string(),
        };
        let view = service(db)
            .send_message(&Actor::new("u1", false), "election_e1", input)
            .await
            .unwrap();

        assert_eq!(view.user_name, "Bob");
        assert!(!view.deleted);
    }

    #[tokio::test]
    async fn test_update_message_stranger_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_message("author")]])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let view = service(db)
            .update_message("msg1", &Actor::new("other", false), full_patch())
            .await
            .unwrap();

        assert_eq!(view.content, "Hi all");
        assert!(!view.flagged && !view.deleted && !view.is_pinned);
        assert_eq!(view.user_name, "Unknown");
    }

    #[tokio::test]
    async fn test_update_message_author_soft_deletes() {
        let mut deleted = create_test_message("author");
        deleted.deleted = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_message("author")]])
            .append_query_results([[deleted]])
            .append_query_results([[create_test_user("author")]])
            .into_connection();

        let patch = MessagePatch {
            deleted: Some(true),
            is_pinned: Some(true),
            ..Default::default()
        };
        let view = service(db)
            .update_message("msg1", &Actor::new("author", false), patch)
            .await
            .unwrap();

        assert!(view.deleted);
        assert!(!view.is_pinned);
    }

    #[tokio::test]
    async fn test_update_message_admin_ignores_oversized_content() {
        let mut flagged = create_test_message("author");
        flagged.flagged = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_message("author")]])
            .append_query_results([[flagged]])
            .append_query_results([[create_test_user("author")]])
            .into_connection();

        let patch = MessagePatch {
            content: Some("x".repeat(3000)),
            flagged: Some(true),
            ..Default::default()
        };
        let view = service(db)
            .update_message("msg1", &Actor::new("admin", true), patch)
            .await
            .unwrap();

        assert!(view.flagged);
        assert_eq!(view.content, "Hi all");
    }

    #[tokio::test]
    async fn test_delete_message_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_message("author")]])
            .into_connection();

        let result = service(db)
            .delete_message("msg1", &Actor::new("other", false))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_message_by_author() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_message("author")]])
            .append_exec_results([exec(1)])
            .into_connection();

        let result = service(db)
            .delete_message("msg1", &Actor::new("author", false))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_list_flagged_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db).list_flagged(&Actor::new("u1", false)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}

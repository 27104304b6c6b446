//! Chat room entity.
//!
//! Room IDs are derived from `(type, entity_id)` as `"{type}_{entity_id}"`,
//! so there is at most one room per election, per news item, and so on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_room")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Room type (e.g. "election", "news", "country")
    #[sea_orm(column_name = "type")]
    pub room_type: String,

    #[sea_orm(indexed)]
    pub entity_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(default_value = 0)]
    pub active_users: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_moderator::Entity")]
    Moderators,

    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_moderator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Moderators.def()
    }
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

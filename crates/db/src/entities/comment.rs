//! Comment entity (threaded comments on elections and news).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Set for election comments. Exactly one of `election_id`/`news_id` is set.
    #[sea_orm(nullable, indexed)]
    pub election_id: Option<String>,

    /// Set for news comments.
    #[sea_orm(nullable, indexed)]
    pub news_id: Option<String>,

    /// Parent comment for replies. Always points at a top-level comment.
    #[sea_orm(nullable, indexed)]
    pub parent_comment_id: Option<String>,

    /// Author
    #[sea_orm(indexed)]
    pub user_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Like count (denormalized from `comment_like`)
    #[sea_orm(default_value = 0)]
    pub likes: i32,

    #[sea_orm(default_value = false)]
    pub flagged: bool,

    #[sea_orm(default_value = true)]
    pub approved: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this comment is a reply to another comment.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::election::Entity",
        from = "Column::ElectionId",
        to = "super::election::Column::Id",
        on_delete = "Cascade"
    )]
    Election,

    #[sea_orm(
        belongs_to = "super::news::Entity",
        from = "Column::NewsId",
        to = "super::news::Column::Id",
        on_delete = "Cascade"
    )]
    News,

    /// Replies outlive their parent: the reference is cleared, not cascaded.
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentCommentId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,

    #[sea_orm(has_many = "super::comment_like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::comment_reaction::Entity")]
    Reactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::election::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Election.def()
    }
}

impl Related<super::news::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::News.def()
    }
}

impl Related<super::comment_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Read-side composition of stored rows into API views.
//!
//! Child lookups (authors, likes, reactions, moderators) that fail are
//! logged and yield empty collections; they never fail the read.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use agora_common::AppResult;
use agora_db::{
    entities::{
        chat_message, chat_moderator, chat_room, comment, comment_like, comment_reaction, user,
    },
    repositories::{ChatRepository, ReactionRepository, UserRepository},
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Display name used when the author row cannot be found.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Author display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorInfo {
    pub name: String,
    pub avatar: Option<String>,
}

impl AuthorInfo {
    fn resolve(users: &HashMap<String, user::Model>, user_id: &str) -> Self {
        users.get(user_id).map_or_else(
            || Self {
                name: UNKNOWN_AUTHOR.to_string(),
                avatar: None,
            },
            |u| Self {
                name: u.name.clone(),
                avatar: u.avatar.clone(),
            },
        )
    }
}

/// A comment with its author, likes, reactions and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub election_id: Option<String>,
    pub news_id: Option<String>,
    pub parent_comment_id: Option<String>,
    pub user_id: String,
    pub content: String,
    pub likes: i32,
    pub flagged: bool,
    pub approved: bool,
    pub timestamp: DateTime<FixedOffset>,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub liked_by: BTreeSet<String>,
    /// Emoji to the users holding that reaction.
    pub reactions: BTreeMap<String, BTreeSet<String>>,
    pub replies: Vec<CommentView>,
}

/// A chat room with its moderator IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomView {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub entity_id: String,
    pub name: String,
    pub description: Option<String>,
    pub active_users: i32,
    pub created_at: DateTime<FixedOffset>,
    pub moderators: Vec<String>,
}

impl ChatRoomView {
    #[must_use]
    pub fn new(room: chat_room::Model, moderators: Vec<String>) -> Self {
        Self {
            id: room.id,
            room_type: room.room_type,
            entity_id: room.entity_id,
            name: room.name,
            description: room.description,
            active_users: room.active_users,
            created_at: room.created_at,
            moderators,
        }
    }
}

/// A chat message with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub content: String,
    pub flagged: bool,
    pub deleted: bool,
    pub is_pinned: bool,
    pub timestamp: DateTime<FixedOffset>,
    pub user_name: String,
    pub user_avatar: Option<String>,
}

impl ChatMessageView {
    fn new(message: chat_message::Model, author: AuthorInfo) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            user_id: message.user_id,
            content: message.content,
            flagged: message.flagged,
            deleted: message.deleted,
            is_pinned: message.is_pinned,
            timestamp: message.created_at,
            user_name: author.name,
            user_avatar: author.avatar,
        }
    }
}

/// Composes views from repositories. Performs no writes.
#[derive(Clone)]
pub struct Aggregator {
    user_repo: UserRepository,
    reaction_repo: ReactionRepository,
    chat_repo: ChatRepository,
}

impl Aggregator {
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        reaction_repo: ReactionRepository,
        chat_repo: ChatRepository,
    ) -> Self {
        Self {
            user_repo,
            reaction_repo,
            chat_repo,
        }
    }

    /// Build views for `comments`, attaching each of `replies` to its parent.
    ///
    /// Input order is kept. Replies whose parent is not in `comments` are
    /// dropped.
    pub async fn comments(
        &self,
        comments: Vec<comment::Model>,
        replies: Vec<comment::Model>,
    ) -> Vec<CommentView> {
        let ids: Vec<String> = comments
            .iter()
            .chain(replies.iter())
            .map(|c| c.id.clone())
            .collect();
        let author_ids: Vec<String> = comments
            .iter()
            .chain(replies.iter())
            .map(|c| c.user_id.clone())
            .collect();

        let likes = fold_likes(or_empty(
            self.reaction_repo.find_likes_for(&ids).await,
            "comment likes",
        ));
        let reactions = fold_reactions(or_empty(
            self.reaction_repo.find_reactions_for(&ids).await,
            "comment reactions",
        ));
        let users = self.authors(&author_ids).await;

        let build = |c: comment::Model, replies: Vec<CommentView>| {
            let author = AuthorInfo::resolve(&users, &c.user_id);
            let liked_by = likes.get(&c.id).cloned().unwrap_or_default();
            let reactions = reactions.get(&c.id).cloned().unwrap_or_default();
            comment_view(c, author, liked_by, reactions, replies)
        };

        let mut by_parent: HashMap<String, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_comment_id.clone() {
                by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(build(reply, vec![]));
            }
        }

        comments
            .into_iter()
            .map(|c| {
                let replies = by_parent.remove(&c.id).unwrap_or_default();
                build(c, replies)
            })
            .collect()
    }

    /// Build the view of a single comment without replies.
    pub async fn comment(&self, comment: comment::Model) -> CommentView {
        let mut views = self.comments(vec![comment.clone()], vec![]).await;
        views.pop().unwrap_or_else(|| {
            comment_view(
                comment,
                AuthorInfo {
                    name: UNKNOWN_AUTHOR.to_string(),
                    avatar: None,
                },
                BTreeSet::new(),
                BTreeMap::new(),
                vec![],
            )
        })
    }

    /// View of a comment that was just written and has no children yet.
    pub async fn new_comment(&self, comment: comment::Model) -> CommentView {
        let users = self.authors(std::slice::from_ref(&comment.user_id)).await;
        let author = AuthorInfo::resolve(&users, &comment.user_id);
        comment_view(comment, author, BTreeSet::new(), BTreeMap::new(), vec![])
    }

    /// Attach moderator IDs to rooms.
    pub async fn rooms(&self, rooms: Vec<chat_room::Model>) -> Vec<ChatRoomView> {
        let ids: Vec<String> = rooms.iter().map(|r| r.id.clone()).collect();
        let mut moderators = fold_moderators(or_empty(
            self.chat_repo.find_moderators(&ids).await,
            "room moderators",
        ));

        rooms
            .into_iter()
            .map(|room| {
                let mods = moderators.remove(&room.id).unwrap_or_default();
                ChatRoomView::new(room, mods)
            })
            .collect()
    }

    /// Attach author display fields to messages.
    pub async fn messages(&self, messages: Vec<chat_message::Model>) -> Vec<ChatMessageView> {
        let author_ids: Vec<String> = messages.iter().map(|m| m.user_id.clone()).collect();
        let users = self.authors(&author_ids).await;

        messages
            .into_iter()
            .map(|m| {
                let author = AuthorInfo::resolve(&users, &m.user_id);
                ChatMessageView::new(m, author)
            })
            .collect()
    }

    /// Attach author display fields to one message.
    pub async fn message(&self, message: chat_message::Model) -> ChatMessageView {
        let users = self.authors(std::slice::from_ref(&message.user_id)).await;
        let author = AuthorInfo::resolve(&users, &message.user_id);
        ChatMessageView::new(message, author)
    }

    async fn authors(&self, user_ids: &[String]) -> HashMap<String, user::Model> {
        let mut unique: Vec<String> = user_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        or_empty(self.user_repo.find_by_ids(&unique).await, "authors")
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect()
    }
}

fn comment_view(
    c: comment::Model,
    author: AuthorInfo,
    liked_by: BTreeSet<String>,
    reactions: BTreeMap<String, BTreeSet<String>>,
    replies: Vec<CommentView>,
) -> CommentView {
    CommentView {
        id: c.id,
        election_id: c.election_id,
        news_id: c.news_id,
        parent_comment_id: c.parent_comment_id,
        user_id: c.user_id,
        content: c.content,
        likes: c.likes,
        flagged: c.flagged,
        approved: c.approved,
        timestamp: c.created_at,
        user_name: author.name,
        user_avatar: author.avatar,
        liked_by,
        reactions,
        replies,
    }
}

pub(crate) fn or_empty<T>(result: AppResult<Vec<T>>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, lookup = what, "Child lookup failed, using empty collection");
        vec![]
    })
}

fn fold_likes(likes: Vec<comment_like::Model>) -> HashMap<String, BTreeSet<String>> {
    let mut folded: HashMap<String, BTreeSet<String>> = HashMap::new();
    for like in likes {
        folded.entry(like.comment_id).or_default().insert(like.user_id);
    }
    folded
}

fn fold_reactions(
    reactions: Vec<comment_reaction::Model>,
) -> HashMap<String, BTreeMap<String, BTreeSet<String>>> {
    let mut folded: HashMap<String, BTreeMap<String, BTreeSet<String>>> = HashMap::new();
    for reaction in reactions {
        folded
            .entry(reaction.comment_id)
            .or_default()
            .entry(reaction.emoji)
            .or_default()
            .insert(reaction.user_id);
    }
    folded
}

fn fold_moderators(moderators: Vec<chat_moderator::Model>) -> HashMap<String, Vec<String>> {
    let mut folded: HashMap<String, Vec<String>> = HashMap::new();
    for m in moderators {
        folded.entry(m.room_id).or_default().push(m.user_id);
    }
    folded
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_common::AppError;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn aggregator(db: DatabaseConnection) -> Aggregator {
        let db = Arc::new(db);
        Aggregator::new(
            UserRepository::new(db.clone()),
            ReactionRepository::new(db.clone()),
            ChatRepository::new(db),
        )
    }

    fn create_test_comment(id: &str, parent: Option<&str>, user_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            election_id: Some("e1".to_string()),
            news_id: None,
            parent_comment_id: parent.map(ToString::to_string),
            user_id: user_id.to_string(),
            content: format!("Comment {id}"),
            likes: 0,
            flagged: false,
            approved: true,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_user(id: &str, name: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            avatar: Some(format!("https://img.example/{id}.png")),
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    fn like(comment_id: &str, user_id: &str) -> comment_like::Model {
        comment_like::Model {
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn reaction(comment_id: &str, user_id: &str, emoji: &str) -> comment_reaction::Model {
        comment_reaction::Model {
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            emoji: emoji.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_fold_reactions_groups_by_emoji() {
        let folded = fold_reactions(vec![
            reaction("c1", "u1", "👍"),
            reaction("c1", "u2", "👍"),
            reaction("c1", "u1", "🎉"),
            reaction("c2", "u3", "👍"),
        ]);

        let c1 = &folded["c1"];
        assert_eq!(c1["👍"].len(), 2);
        assert!(c1["🎉"].contains("u1"));
        assert_eq!(folded["c2"]["👍"].len(), 1);
    }

    #[test]
    fn test_unknown_author_fallback() {
        let author = AuthorInfo::resolve(&HashMap::new(), "ghost");
        assert_eq!(author.name, UNKNOWN_AUTHOR);
        assert!(author.avatar.is_none());
    }

    #[tokio::test]
    async fn test_comments_with_replies() {
        let top = create_test_comment("c1", None, "u1");
        let reply = create_test_comment("r1", Some("c1"), "u2");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[like("c1", "u1"), like("c1", "u2")]])
            .append_query_results([[reaction("r1", "u1", "👍")]])
            .append_query_results([[create_test_user("u1", "Alice")]])
            .into_connection();

        let views = aggregator(db).comments(vec![top], vec![reply]).await;

        assert_eq!(views.len(), 1);
        let view = &views[0];
        assert_eq!(view.user_name, "Alice");
        assert_eq!(view.liked_by.len(), 2);
        assert_eq!(view.replies.len(), 1);

        let reply = &view.replies[0];
        assert_eq!(reply.user_name, UNKNOWN_AUTHOR);
        assert!(reply.reactions["👍"].contains("u1"));
        assert!(reply.replies.is_empty());
    }

    #[tokio::test]
    async fn test_failed_child_lookups_degrade_to_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([
                sea_orm::DbErr::Custom("likes down".to_string()),
                sea_orm::DbErr::Custom("reactions down".to_string()),
                sea_orm::DbErr::Custom("users down".to_string()),
            ])
            .into_connection();

        let view = aggregator(db)
            .comment(create_test_comment("c1", None, "u1"))
            .await;

        assert!(view.liked_by.is_empty());
        assert!(view.reactions.is_empty());
        assert_eq!(view.user_name, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_or_empty_swallows_error() {
        let result: AppResult<Vec<u8>> = Err(AppError::Database("boom".to_string()));
        assert!(or_empty(result, "test").is_empty());
    }
}

//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p agora-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `agora_test`)
//!   `TEST_DB_PASSWORD` (default: `agora_test`)

#![allow(clippy::unwrap_used)]

use agora_common::AppError;
use agora_db::entities::{chat_message, chat_room, comment, vote};
use agora_db::repositories::{
    ChatRepository, CommentRepository, CommentSubject, ReactionRepository, RoomChanges,
    VoteRepository,
};
use agora_db::test_utils::TestDatabase;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseBackend, Set, Statement};

fn new_vote(id: &str, user_id: &str, election_id: &str, candidate_id: &str) -> vote::Model {
    vote::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        election_id: election_id.to_string(),
        candidate_id: candidate_id.to_string(),
        created_at: Utc::now().into(),
    }
}

fn new_comment(id: &str, user_id: &str, parent: Option<&str>) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(id.to_string()),
        election_id: Set(Some("e1".to_string())),
        news_id: Set(None),
        parent_comment_id: Set(parent.map(ToString::to_string)),
        user_id: Set(user_id.to_string()),
        content: Set(format!("Comment {id}")),
        likes: Set(0),
        flagged: Set(false),
        approved: Set(true),
        created_at: Set(Utc::now().into()),
    }
}

fn new_room(id: &str) -> chat_room::Model {
    chat_room::Model {
        id: id.to_string(),
        room_type: "election".to_string(),
        entity_id: "e1".to_string(),
        name: "Election chat".to_string(),
        description: None,
        active_users: 0,
        created_at: Utc::now().into(),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_votes_leave_exactly_one() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_user("u1", false).await.unwrap();
    db.seed_election("e1", &["c1", "c2"]).await.unwrap();

    let repo = VoteRepository::new(db.shared());

    let attempts = (0..8).map(|i| {
        let repo = repo.clone();
        let candidate = if i % 2 == 0 { "c1" } else { "c2" };
        let vote = new_vote(&format!("v{i}"), "u1", "e1", candidate);
        tokio::spawn(async move { repo.create_exclusive(vote).await })
    });

    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(repo.count_by_election("e1").await.unwrap(), 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_candidate_from_other_election_persists_nothing() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_user("u1", false).await.unwrap();
    db.seed_election("e1", &["c1"]).await.unwrap();
    db.seed_election("e2", &["c9"]).await.unwrap();

    let repo = VoteRepository::new(db.shared());
    let result = repo.create_exclusive(new_vote("v1", "u1", "e1", "c9")).await;

    assert!(matches!(result, Err(AppError::InvalidReference(_))));
    assert_eq!(repo.count_all().await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_like_toggles_keep_counter_consistent() {
    let db = TestDatabase::create_unique().await.unwrap();
    for id in ["author", "u1", "u2", "u3", "u4"] {
        db.seed_user(id, false).await.unwrap();
    }
    db.seed_election("e1", &[]).await.unwrap();

    let conn = db.shared();
    let comments = CommentRepository::new(conn.clone());
    comments
        .create(new_comment("m1", "author", None))
        .await
        .unwrap();

    let reactions = ReactionRepository::new(conn);

    // Each user toggles three times: net "on" for everyone
    let toggles = ["u1", "u2", "u3", "u4"].into_iter().flat_map(|user| {
        let reactions = reactions.clone();
        (0..3).map(move |_| {
            let reactions = reactions.clone();
            tokio::spawn(async move { reactions.toggle_like("m1", user).await })
        })
    });
    for handle in toggles.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    let stored = comments.get_by_id("m1").await.unwrap();
    let likes = reactions.find_likes_for(&["m1".to_string()]).await.unwrap();

    assert_eq!(stored.likes, 4);
    assert_eq!(likes.len(), 4);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_comment_subject_check_constraint() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_user("u1", false).await.unwrap();

    let result = db
        .connection()
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "INSERT INTO comment (id, user_id, content, likes, flagged, approved, created_at) \
             VALUES ('x', 'u1', 'orphan', 0, false, true, now())"
                .to_string(),
        ))
        .await;

    assert!(result.is_err());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_room_moderators_replace_and_keep() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = ChatRepository::new(db.shared());

    let room = new_room("election_e1");
    repo.create_room(room.clone(), &["m1".to_string(), "m2".to_string()])
        .await
        .unwrap();

    let duplicate = repo.create_room(room, &[]).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let kept = repo
        .update_room(
            "election_e1",
            RoomChanges {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.moderators.len(), 2);

    let cleared = repo
        .update_room(
            "election_e1",
            RoomChanges {
                moderators: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.moderators.is_empty());
    assert!(repo.find_moderators(&["election_e1".to_string()]).await.unwrap().is_empty());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_by_unknown_user_is_not_found() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_election("e1", &["c1"]).await.unwrap();

    let repo = VoteRepository::new(db.shared());
    let result = repo.create_exclusive(new_vote("v1", "ghost", "e1", "c1")).await;

    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));
    assert_eq!(repo.count_all().await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_comment_by_unknown_user_is_not_found() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_election("e1", &[]).await.unwrap();

    let repo = CommentRepository::new(db.shared());
    let result = repo.create(new_comment("m1", "ghost", None)).await;

    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_message_by_unknown_user_is_not_found() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = ChatRepository::new(db.shared());
    repo.create_room(new_room("election_e1"), &[]).await.unwrap();

    let result = repo
        .create_message(chat_message::ActiveModel {
            id: Set("msg1".to_string()),
            room_id: Set("election_e1".to_string()),
            user_id: Set("ghost".to_string()),
            content: Set("Hi".to_string()),
            flagged: Set(false),
            deleted: Set(false),
            is_pinned: Set(false),
            created_at: Set(Utc::now().into()),
        })
        .await;

    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_like_by_unknown_user_is_not_found() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_user("author", false).await.unwrap();
    db.seed_election("e1", &[]).await.unwrap();
    CommentRepository::new(db.shared())
        .create(new_comment("m1", "author", None))
        .await
        .unwrap();

    let result = ReactionRepository::new(db.shared())
        .toggle_like("m1", "ghost")
        .await;

    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));

    db.drop_database().await.unwrap();
}

/// Deleting a parent keeps its replies; they surface as top-level comments.
#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_parent_promotes_replies() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.seed_user("u1", false).await.unwrap();
    db.seed_election("e1", &[]).await.unwrap();

    let repo = CommentRepository::new(db.shared());
    repo.create(new_comment("p1", "u1", None)).await.unwrap();
    repo.create(new_comment("r1", "u1", Some("p1"))).await.unwrap();

    repo.delete("p1").await.unwrap();

    let reply = repo.get_by_id("r1").await.unwrap();
    assert_eq!(reply.parent_comment_id, None);

    let top_level: Vec<String> = repo
        .find_top_level(&CommentSubject::Election("e1".to_string()))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(top_level, vec!["r1".to_string()]);

    db.drop_database().await.unwrap();
}

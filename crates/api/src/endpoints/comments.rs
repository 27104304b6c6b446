//! Comment endpoints.

use agora_common::AppResult;
use agora_core::{CommentPatch, CommentStats, CommentView, CreateCommentInput, ToggleOutcome};
use agora_db::repositories::{CommentSubject, ModerationFilter};
use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Json, Query},
    middleware::AppState,
    response::{self, ApiResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/election/{id}", get(list_for_election))
        .route("/news/{id}", get(list_for_news))
        .route("/admin/all", get(moderation_queue))
        .route("/admin/stats", get(stats))
        .route("/{id}", put(update).delete(delete))
        .route("/{id}/like", post(like))
        .route("/{id}/reaction", post(react))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default = "default_include_replies")]
    include_replies: bool,
}

const fn default_include_replies() -> bool {
    true
}

async fn list_for_election(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let comments = state
        .comment_service
        .list_for_subject(&CommentSubject::Election(id), query.include_replies)
        .await?;
    Ok(ApiResponse::ok(comments))
}

async fn list_for_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let comments = state
        .comment_service
        .list_for_subject(&CommentSubject::News(id), query.include_replies)
        .await?;
    Ok(ApiResponse::ok(comments))
}

/// Post a comment or a reply.
async fn create(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.create(&actor, input).await?;
    Ok(ApiResponse::created(comment))
}

/// Apply a patch. Fields the caller may not change are ignored.
async fn update(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CommentPatch>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.update(&id, &actor, patch).await?;
    Ok(ApiResponse::ok(comment))
}

async fn delete(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.comment_service.delete(&id, &actor).await?;
    Ok(response::ok())
}

/// Toggle the caller's like.
async fn like(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    let outcome = state.reaction_service.toggle(&id, &actor, None).await?;
    Ok(ApiResponse::ok(outcome))
}

#[derive(Debug, Deserialize)]
struct ReactRequest {
    emoji: String,
}

/// Toggle one of the caller's emoji reactions.
async fn react(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReactRequest>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    let outcome = state
        .reaction_service
        .toggle(&id, &actor, Some(&req.emoji))
        .await?;
    Ok(ApiResponse::ok(outcome))
}

#[derive(Debug, Default, Deserialize)]
struct ModerationQuery {
    filter: Option<String>,
}

/// Moderation queue. Admin only.
async fn moderation_queue(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let filter = match query.filter.as_deref() {
        Some(value) => value.parse::<ModerationFilter>()?,
        None => ModerationFilter::default(),
    };
    let comments = state
        .comment_service
        .list_for_moderation(&actor, filter)
        .await?;
    Ok(ApiResponse::ok(comments))
}

async fn stats(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CommentStats>> {
    let stats = state.comment_service.stats(&actor).await?;
    Ok(ApiResponse::ok(stats))
}

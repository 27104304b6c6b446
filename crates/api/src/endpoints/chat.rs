//! Chat room and message endpoints.

use agora_common::AppResult;
use agora_core::{
    ChatMessageView, ChatRoomView, CreateRoomInput, MessagePatch, SendMessageInput,
    UpdateRoomInput,
};
use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Json, Query},
    middleware::AppState,
    response::{self, ApiResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/{id}",
            get(get_room).put(update_room).delete(delete_room),
        )
        .route("/rooms/{id}/messages", get(list_messages).post(send_message))
        .route("/messages/flagged", get(list_flagged))
        .route("/messages/{id}", put(update_message).delete(delete_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomQuery {
    #[serde(rename = "type")]
    room_type: Option<String>,
    entity_id: Option<String>,
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<ApiResponse<Vec<ChatRoomView>>> {
    let rooms = state
        .chat_service
        .list_rooms(query.room_type.as_deref(), query.entity_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(rooms))
}

/// Create a room. Admin only.
async fn create_room(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateRoomInput>,
) -> AppResult<ApiResponse<ChatRoomView>> {
    let room = state.chat_service.create_room(&actor, input).await?;
    Ok(ApiResponse::created(room))
}

async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ChatRoomView>> {
    let room = state.chat_service.get_room(&id).await?;
    Ok(ApiResponse::ok(room))
}

/// Update a room. Omitted fields keep their current value.
async fn update_room(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateRoomInput>,
) -> AppResult<ApiResponse<ChatRoomView>> {
    let room = state.chat_service.update_room(&actor, &id, input).await?;
    Ok(ApiResponse::ok(room))
}

async fn delete_room(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.chat_service.delete_room(&actor, &id).await?;
    Ok(response::ok())
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: Option<u64>,
}

/// Recent messages, newest first.
async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<ApiResponse<Vec<ChatMessageView>>> {
    let messages = state.chat_service.list_messages(&id, query.limit).await?;
    Ok(ApiResponse::ok(messages))
}

async fn send_message(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SendMessageInput>,
) -> AppResult<ApiResponse<ChatMessageView>> {
    let message = state.chat_service.send_message(&actor, &id, input).await?;
    Ok(ApiResponse::created(message))
}

async fn update_message(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<MessagePatch>,
) -> AppResult<ApiResponse<ChatMessageView>> {
    let message = state
        .chat_service
        .update_message(&id, &actor, patch)
        .await?;
    Ok(ApiResponse::ok(message))
}

async fn delete_message(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.chat_service.delete_message(&id, &actor).await?;
    Ok(response::ok())
}

/// Flagged messages for review. Admin only.
async fn list_flagged(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ChatMessageView>>> {
    let messages = state.chat_service.list_flagged(&actor).await?;
    Ok(ApiResponse::ok(messages))
}

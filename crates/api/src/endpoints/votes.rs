//! Vote endpoints.

use agora_common::AppResult;
use agora_core::{CastVoteInput, VoteCheck, VoteView};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, Json},
    middleware::AppState,
    response::ApiResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(cast))
        .route("/check/{election_id}", get(check))
        .route("/user", get(list_mine))
        .route("/count/{candidate_id}", get(count_for_candidate))
        .route("/stats/total", get(total))
}

/// Cast a vote.
async fn cast(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CastVoteInput>,
) -> AppResult<ApiResponse<VoteView>> {
    let vote = state.vote_service.cast_vote(&actor, input).await?;
    Ok(ApiResponse::created(vote))
}

/// Whether the caller voted in an election.
async fn check(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(election_id): Path<String>,
) -> AppResult<ApiResponse<VoteCheck>> {
    let check = state
        .vote_service
        .has_voted(&actor.user_id, &election_id)
        .await?;
    Ok(ApiResponse::ok(check))
}

async fn list_mine(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<VoteView>>> {
    let votes = state.vote_service.list_user_votes(&actor.user_id).await?;
    Ok(ApiResponse::ok(votes))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateCount {
    candidate_id: String,
    votes: u64,
}

async fn count_for_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> AppResult<ApiResponse<CandidateCount>> {
    let votes = state.vote_service.count_votes(&candidate_id).await?;
    Ok(ApiResponse::ok(CandidateCount {
        candidate_id,
        votes,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalVotes {
    total_votes: u64,
}

/// Platform-wide vote count. Admin only.
async fn total(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<TotalVotes>> {
    let total_votes = state.vote_service.total_votes(&actor).await?;
    Ok(ApiResponse::ok(TotalVotes { total_votes }))
}

//! Election endpoints.

use agora_common::AppResult;
use agora_core::CandidateResult;
use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};

use crate::{middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/stats", get(stats))
}

/// Per-candidate results with vote shares.
async fn stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<CandidateResult>>> {
    let results = state.vote_service.election_results(&id).await?;
    Ok(ApiResponse::ok(results))
}

//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use agora_core::{
    Aggregator, ChatService, CommentService, IdentityGate, ReactionService, VoteService,
};
use agora_db::repositories::{
    ChatRepository, CommentRepository, ElectionRepository, NewsRepository, ReactionRepository,
    UserRepository, VoteRepository,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub vote_service: VoteService,
    pub comment_service: CommentService,
    pub reaction_service: ReactionService,
    pub chat_service: ChatService,
    pub identity: Arc<dyn IdentityGate>,
}

impl AppState {
    /// Wire every service against one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, identity: Arc<dyn IdentityGate>) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let election_repo = ElectionRepository::new(Arc::clone(&db));
        let news_repo = NewsRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let reaction_repo = ReactionRepository::new(Arc::clone(&db));
        let chat_repo = ChatRepository::new(db);

        let aggregator = Aggregator::new(user_repo, reaction_repo.clone(), chat_repo.clone());

        Self {
            vote_service: VoteService::new(vote_repo, election_repo.clone()),
            comment_service: CommentService::new(
                comment_repo,
                election_repo,
                news_repo,
                aggregator.clone(),
            ),
            reaction_service: ReactionService::new(reaction_repo),
            chat_service: ChatService::new(chat_repo, aggregator),
            identity,
        }
    }
}

/// Authentication middleware.
///
/// A valid bearer token puts the resolved [`agora_core::Actor`] into the
/// request extensions. Missing or invalid tokens leave the request
/// anonymous; handlers that need an actor reject it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.identity.authenticate(token.trim()).await {
            Ok(actor) => {
                req.extensions_mut().insert(actor);
            }
            Err(e) => tracing::debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}

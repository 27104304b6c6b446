//! API endpoints.

mod chat;
mod comments;
mod elections;
pub(crate) mod health;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/votes", votes::router())
        .nest("/elections", elections::router())
        .nest("/comments", comments::router())
        .nest("/chat", chat::router())
}

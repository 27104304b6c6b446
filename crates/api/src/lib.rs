//! HTTP API layer for agora.
//!
//! - **Endpoints**: votes, election results, comments, chat, health
//! - **Extractors**: authenticated actor
//! - **Middleware**: bearer-token authentication through the identity gate
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, routing::get};

pub use endpoints::router;
pub use middleware::AppState;

/// The full application: `/api` routes plus `/health`, behind the auth
/// middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(endpoints::health::health))
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

pub mod comments;
pub mod hashtags;
pub mod posts;
pub mod profiles;
pub mod social;
pub mod user;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::extractors::require_auth;
use crate::state::AppState;

/// Full application router.
///
/// Everything under `/api/social-media` sits behind [`require_auth`], which
/// also wraps the fallback and method-not-allowed answers, so an
/// unauthenticated caller sees 401 before any 404 or 405.
pub fn app(state: AppState) -> Router {
    let social = Router::new()
        .merge(profiles::router())
        .merge(posts::router())
        .merge(hashtags::router())
        .merge(comments::router())
        .merge(social::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/social-media", social)
        .nest("/api/user", user::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found.".to_string())
}

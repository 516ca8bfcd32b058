use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

/// Account routes, mounted under `/api/user`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/", post(handlers::register))
        .route("/token/", post(handlers::token))
        .route("/logout/", post(handlers::logout))
        .route("/me/", get(handlers::me).patch(handlers::update_me))
}

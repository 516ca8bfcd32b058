use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::comments::{self, CommentFilter};
use crate::db::models::Comment;
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, REQUIRED};
use crate::wire::{CommentCreate, CommentOut, CommentUpdate};

const TEXT_MAX: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comment/", get(list_comments).post(create_comment))
        .route(
            "/comment/{id}/",
            get(get_comment)
                .put(replace_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
}

/// Only the author or staff may change a comment.
fn ensure_can_modify(user: &CurrentUser, comment: &Comment) -> AppResult<()> {
    if comment.author_id == user.profile_id || user.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn list_comments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<CommentFilter>,
) -> AppResult<Json<Vec<CommentOut>>> {
    let conn = state.db.get()?;
    let found = comments::list(&conn, &filter)?;
    Ok(Json(found.into_iter().map(CommentOut::from).collect()))
}

async fn get_comment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<CommentOut>> {
    let conn = state.db.get()?;
    let comment = comments::get(&conn, id)?.ok_or_else(|| AppError::not_found("Comment"))?;
    Ok(Json(comment.into()))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<CommentCreate>,
) -> AppResult<Response> {
    let mut v = Validator::new();
    let text = v.required_text("text", payload.text.as_deref(), TEXT_MAX);

    let conn = state.db.get()?;
    let post_id = match payload.post {
        None => {
            v.add("post", REQUIRED);
            None
        }
        Some(id) if !posts::exists(&conn, id)? => {
            v.add(
                "post",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            );
            None
        }
        Some(id) => Some(id),
    };
    v.finish()?;

    let (Some(post_id), Some(text)) = (post_id, text) else {
        return Err(AppError::Internal("validated fields missing".into()));
    };
    let id = comments::create(&conn, post_id, user.profile_id, &text)?;
    let comment = comments::get(&conn, id)?.ok_or_else(|| AppError::not_found("Comment"))?;
    tracing::debug!(comment_id = id, post_id, "Created comment");
    Ok((StatusCode::CREATED, Json(CommentOut::from(comment))).into_response())
}

async fn replace_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<CommentUpdate>,
) -> AppResult<Json<CommentOut>> {
    edit_comment(&state, &user, id, payload, true)
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<CommentUpdate>,
) -> AppResult<Json<CommentOut>> {
    edit_comment(&state, &user, id, payload, false)
}

fn edit_comment(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    payload: CommentUpdate,
    full: bool,
) -> AppResult<Json<CommentOut>> {
    let conn = state.db.get()?;
    let current = comments::get(&conn, id)?.ok_or_else(|| AppError::not_found("Comment"))?;
    ensure_can_modify(user, &current)?;

    let mut v = Validator::new();
    let text = match payload.text.as_deref() {
        None if !full => return Ok(Json(current.into())),
        value => v.required_text("text", value, TEXT_MAX),
    };
    v.finish()?;

    if let Some(ref text) = text {
        comments::update_text(&conn, id, text)?;
    }
    let updated = comments::get(&conn, id)?.ok_or_else(|| AppError::not_found("Comment"))?;
    Ok(Json(updated.into()))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    let comment = comments::get(&conn, id)?.ok_or_else(|| AppError::not_found("Comment"))?;
    ensure_can_modify(&user, &comment)?;
    comments::delete(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

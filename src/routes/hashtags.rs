use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::hashtags::{self, HashtagFilter};
use crate::db::models::Hashtag;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, HASHTAG_TAKEN};
use crate::wire::HashtagPayload;

const NAME_MAX: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hashtags/", get(list_hashtags).post(create_hashtag))
        .route(
            "/hashtags/{id}/",
            get(get_hashtag)
                .put(replace_hashtag)
                .patch(update_hashtag)
                .delete(delete_hashtag),
        )
}

async fn list_hashtags(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<HashtagFilter>,
) -> AppResult<Json<Vec<Hashtag>>> {
    let conn = state.db.get()?;
    Ok(Json(hashtags::list(&conn, &filter)?))
}

async fn get_hashtag(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Hashtag>> {
    let conn = state.db.get()?;
    let hashtag = hashtags::get(&conn, id)?.ok_or_else(|| AppError::not_found("Hashtag"))?;
    Ok(Json(hashtag))
}

async fn create_hashtag(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<HashtagPayload>,
) -> AppResult<Response> {
    user.require_staff()?;

    let mut v = Validator::new();
    let name = v.required_text("name", payload.name.as_deref(), NAME_MAX);
    let conn = state.db.get()?;
    if let Some(ref name) = name {
        if hashtags::name_taken(&conn, name, None)? {
            v.add("name", HASHTAG_TAKEN);
        }
    }
    v.finish()?;

    let hashtag = hashtags::create(&conn, &name.unwrap_or_default())
        .map_err(|e| e.on_unique(AppError::field("name", HASHTAG_TAKEN)))?;
    tracing::info!(hashtag_id = hashtag.id, name = %hashtag.name, "Created hashtag");
    Ok((StatusCode::CREATED, Json(hashtag)).into_response())
}

async fn replace_hashtag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<HashtagPayload>,
) -> AppResult<Json<Hashtag>> {
    rename_hashtag(&state, &user, id, payload, true)
}

async fn update_hashtag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<HashtagPayload>,
) -> AppResult<Json<Hashtag>> {
    rename_hashtag(&state, &user, id, payload, false)
}

/// PUT requires `name`; PATCH without it leaves the hashtag unchanged.
fn rename_hashtag(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    payload: HashtagPayload,
    full: bool,
) -> AppResult<Json<Hashtag>> {
    user.require_staff()?;

    let conn = state.db.get()?;
    let current = hashtags::get(&conn, id)?.ok_or_else(|| AppError::not_found("Hashtag"))?;

    let mut v = Validator::new();
    let name = match payload.name.as_deref() {
        None if !full => return Ok(Json(current)),
        value => v.required_text("name", value, NAME_MAX),
    };
    if let Some(ref name) = name {
        if hashtags::name_taken(&conn, name, Some(id))? {
            v.add("name", HASHTAG_TAKEN);
        }
    }
    v.finish()?;

    let name = name.unwrap_or(current.name);
    hashtags::rename(&conn, id, &name)
        .map_err(|e| e.on_unique(AppError::field("name", HASHTAG_TAKEN)))?;
    Ok(Json(Hashtag { id, name }))
}

async fn delete_hashtag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    user.require_staff()?;

    let conn = state.db.get()?;
    if !hashtags::delete(&conn, id)? {
        return Err(AppError::not_found("Hashtag"));
    }
    tracing::info!(hashtag_id = id, "Deleted hashtag");
    Ok(StatusCode::NO_CONTENT)
}

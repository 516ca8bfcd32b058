use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::Post;
use crate::db::posts::{self, PostFields, PostFilter, PostScope};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, REQUIRED};
use crate::wire::{self, PostDetail, PostListItem, PostPayload};

const TITLE_MAX: usize = 100;
const HASHTAG_MAX: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/", get(list_catalog))
        .route("/posts/{id}/", get(get_catalog))
        .route("/latest-posts/", get(list_feed))
        .route("/latest-posts/{id}/", get(get_feed))
        .route("/my-posts/", get(list_mine).post(create_post))
        .route(
            "/my-posts/{id}/",
            get(get_mine)
                .put(replace_post)
                .patch(update_post)
                .delete(delete_post),
        )
}

fn list_in(state: &AppState, scope: PostScope, filter: &PostFilter) -> AppResult<Vec<PostListItem>> {
    let conn = state.db.get()?;
    let found = posts::list(&conn, scope, filter)?;
    wire::post_list(&conn, found)
}

fn detail_in(state: &AppState, scope: PostScope, id: i64) -> AppResult<PostDetail> {
    let conn = state.db.get()?;
    let post = posts::get(&conn, scope, id)?.ok_or_else(|| AppError::not_found("Post"))?;
    wire::post_detail(&conn, post)
}

// -- Catalog --

async fn list_catalog(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<PostFilter>,
) -> AppResult<Json<Vec<PostListItem>>> {
    Ok(Json(list_in(&state, PostScope::Catalog, &filter)?))
}

async fn get_catalog(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    Ok(Json(detail_in(&state, PostScope::Catalog, id)?))
}

// -- Feed of followed profiles --

async fn list_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<PostFilter>,
) -> AppResult<Json<Vec<PostListItem>>> {
    Ok(Json(list_in(
        &state,
        PostScope::FollowedBy(user.profile_id),
        &filter,
    )?))
}

async fn get_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    Ok(Json(detail_in(
        &state,
        PostScope::FollowedBy(user.profile_id),
        id,
    )?))
}

// -- Caller's own posts --

async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<PostFilter>,
) -> AppResult<Json<Vec<PostListItem>>> {
    Ok(Json(list_in(
        &state,
        PostScope::AuthoredBy(user.profile_id),
        &filter,
    )?))
}

async fn get_mine(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    Ok(Json(detail_in(
        &state,
        PostScope::AuthoredBy(user.profile_id),
        id,
    )?))
}

/// Validated post write: scalar fields plus the hashtag names when the
/// payload carried a `hashtags` key.
struct PostWrite {
    fields: PostFields,
    hashtags: Option<Vec<String>>,
}

/// `current` is the stored post for PATCH; `None` means every field is
/// taken from the payload (create and PUT).
fn validate_post(payload: PostPayload, current: Option<&Post>) -> AppResult<PostWrite> {
    let mut v = Validator::new();

    let title = match (payload.title.as_deref(), current) {
        (Some(t), _) => v.text("title", t, TITLE_MAX),
        (None, Some(post)) => Some(post.title.clone()),
        (None, None) => {
            v.add("title", REQUIRED);
            None
        }
    };

    let (text, image) = match current {
        Some(post) => (
            payload.text.unwrap_or_else(|| post.text.clone()),
            payload.image.unwrap_or_else(|| post.image.clone()),
        ),
        None => (payload.text.flatten(), payload.image.flatten()),
    };

    let hashtags = payload.hashtags.map(|tags| {
        tags.iter()
            .filter_map(|tag| v.required_text("hashtags", tag.name.as_deref(), HASHTAG_MAX))
            .collect::<Vec<_>>()
    });

    v.finish()?;
    Ok(PostWrite {
        fields: PostFields {
            title: title.unwrap_or_default(),
            text,
            image,
        },
        hashtags,
    })
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<PostPayload>,
) -> AppResult<Response> {
    let write = validate_post(payload, None)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let id = posts::create(&tx, user.profile_id, &write.fields)?;
    if let Some(ref names) = write.hashtags {
        posts::set_hashtags(&tx, id, names)?;
    }
    tx.commit()?;

    let post = posts::get(&conn, PostScope::AuthoredBy(user.profile_id), id)?
        .ok_or_else(|| AppError::not_found("Post"))?;
    tracing::info!(post_id = id, author = user.profile_id, "Created post");
    Ok((StatusCode::CREATED, Json(wire::post_detail(&conn, post)?)).into_response())
}

async fn replace_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<PostPayload>,
) -> AppResult<Json<PostDetail>> {
    write_post(&state, &user, id, payload, true)
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<PostPayload>,
) -> AppResult<Json<PostDetail>> {
    write_post(&state, &user, id, payload, false)
}

fn write_post(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    payload: PostPayload,
    full: bool,
) -> AppResult<Json<PostDetail>> {
    let scope = PostScope::AuthoredBy(user.profile_id);
    let mut conn = state.db.get()?;
    let current = posts::get(&conn, scope, id)?.ok_or_else(|| AppError::not_found("Post"))?;
    let write = validate_post(payload, if full { None } else { Some(&current) })?;

    let tx = conn.transaction()?;
    if !posts::update(&tx, user.profile_id, id, &write.fields)? {
        return Err(AppError::not_found("Post"));
    }
    if let Some(ref names) = write.hashtags {
        posts::set_hashtags(&tx, id, names)?;
    }
    tx.commit()?;

    let post = posts::get(&conn, scope, id)?.ok_or_else(|| AppError::not_found("Post"))?;
    tracing::debug!(post_id = id, "Updated post");
    Ok(Json(wire::post_detail(&conn, post)?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !posts::delete(&conn, user.profile_id, id)? {
        return Err(AppError::not_found("Post"));
    }
    tracing::info!(post_id = id, "Deleted post");
    Ok(StatusCode::NO_CONTENT)
}

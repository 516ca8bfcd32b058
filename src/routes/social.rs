//! Follow graph and like endpoints for the calling profile.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::db::models::Profile;
use crate::db::posts::{self, LikeToggle};
use crate::db::profiles::{self, ProfileFilter, ProfileScope};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, REQUIRED};
use crate::wire::{self, Detail, FollowRequest, LikeRequest, ProfileDetail, ProfileListItem};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/", post(follow))
        .route("/unfollow/", post(unfollow))
        .route("/like/", post(like))
        .route("/my-following/", get(list_following))
        .route("/my-following/{id}/", get(get_following))
        .route("/my-followers/", get(list_followers))
        .route("/my-followers/{id}/", get(get_follower))
}

/// Resolve the target of a follow/unfollow request, refusing the caller's
/// own profile.
fn follow_target(
    state: &AppState,
    user: &CurrentUser,
    req: FollowRequest,
    verb: &str,
) -> AppResult<Profile> {
    let mut v = Validator::new();
    let nickname = v.required_text("nickname", req.nickname.as_deref(), usize::MAX);
    v.finish()?;
    let nickname = nickname.unwrap_or_default();

    let conn = state.db.get()?;
    let target =
        profiles::find_by_nickname(&conn, &nickname)?.ok_or_else(|| AppError::not_found("Profile"))?;
    if target.id == user.profile_id {
        return Err(AppError::BadRequest(format!("You cannot {} yourself.", verb)));
    }
    Ok(target)
}

async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<FollowRequest>,
) -> AppResult<Json<Detail>> {
    let target = follow_target(&state, &user, req, "follow")?;
    let conn = state.db.get()?;
    if profiles::follow(&conn, user.profile_id, target.id)? {
        tracing::debug!(follower = user.profile_id, followed = target.id, "Followed profile");
    }
    Ok(Json(Detail::new(format!(
        "You have followed {}.",
        target.nickname
    ))))
}

async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<FollowRequest>,
) -> AppResult<Json<Detail>> {
    let target = follow_target(&state, &user, req, "unfollow")?;
    let conn = state.db.get()?;
    if profiles::unfollow(&conn, user.profile_id, target.id)? {
        tracing::debug!(follower = user.profile_id, followed = target.id, "Unfollowed profile");
    }
    Ok(Json(Detail::new(format!(
        "You have unfollowed {}.",
        target.nickname
    ))))
}

async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<LikeRequest>,
) -> AppResult<Json<Detail>> {
    let post_id = req
        .post_id
        .ok_or_else(|| AppError::field("post_id", REQUIRED))?;

    let conn = state.db.get()?;
    if !posts::exists(&conn, post_id)? {
        return Err(AppError::not_found("Post"));
    }
    let toggle = posts::toggle_like(&conn, post_id, user.profile_id)?;
    tracing::debug!(post_id, profile = user.profile_id, ?toggle, "Toggled like");
    let message = match toggle {
        LikeToggle::Liked => "You have liked this post.",
        LikeToggle::Unliked => "You have removed the like from this post.",
    };
    Ok(Json(Detail::new(message)))
}

fn list_scope(
    state: &AppState,
    scope: ProfileScope,
    filter: &ProfileFilter,
) -> AppResult<Json<Vec<ProfileListItem>>> {
    let conn = state.db.get()?;
    let found = profiles::list(&conn, scope, filter)?;
    Ok(Json(found.into_iter().map(ProfileListItem::from).collect()))
}

fn get_scoped(state: &AppState, scope: ProfileScope, id: i64) -> AppResult<Json<ProfileDetail>> {
    let conn = state.db.get()?;
    let profile =
        profiles::get_in_scope(&conn, scope, id)?.ok_or_else(|| AppError::not_found("Profile"))?;
    Ok(Json(wire::profile_detail(&conn, profile)?))
}

async fn list_following(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ProfileFilter>,
) -> AppResult<Json<Vec<ProfileListItem>>> {
    list_scope(&state, ProfileScope::FollowedBy(user.profile_id), &filter)
}

async fn get_following(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileDetail>> {
    get_scoped(&state, ProfileScope::FollowedBy(user.profile_id), id)
}

async fn list_followers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ProfileFilter>,
) -> AppResult<Json<Vec<ProfileListItem>>> {
    list_scope(&state, ProfileScope::FollowersOf(user.profile_id), &filter)
}

async fn get_follower(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileDetail>> {
    get_scoped(&state, ProfileScope::FollowersOf(user.profile_id), id)
}

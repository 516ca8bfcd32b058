use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::profiles::{self, ProfileFilter, ProfileScope};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, EMAIL_TAKEN, NICKNAME_TAKEN, REQUIRED};
use crate::wire::{self, MyProfileDetail, MyProfileOut, MyProfilePayload, ProfileDetail, ProfileListItem};

const NICKNAME_MAX: usize = 120;
const EMAIL_MAX: usize = 254;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profiles/", get(list_profiles))
        .route("/profiles/{id}/", get(get_profile))
        .route(
            "/my-profile/",
            get(get_my_profile)
                .put(replace_my_profile)
                .patch(update_my_profile),
        )
}

async fn list_profiles(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<ProfileFilter>,
) -> AppResult<Json<Vec<ProfileListItem>>> {
    let conn = state.db.get()?;
    let profiles = profiles::list(&conn, ProfileScope::Directory, &filter)?;
    Ok(Json(profiles.into_iter().map(ProfileListItem::from).collect()))
}

async fn get_profile(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileDetail>> {
    let conn = state.db.get()?;
    let profile = profiles::get(&conn, id)?.ok_or_else(|| AppError::not_found("Profile"))?;
    Ok(Json(wire::profile_detail(&conn, profile)?))
}

async fn get_my_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<MyProfileDetail>> {
    let conn = state.db.get()?;
    let profile = profiles::get(&conn, user.profile_id)?
        .ok_or_else(|| AppError::not_found("Profile"))?;
    Ok(Json(wire::my_profile_detail(&conn, profile)?))
}

async fn replace_my_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<MyProfilePayload>,
) -> AppResult<Json<MyProfileOut>> {
    write_my_profile(&state, &user, payload, true)
}

async fn update_my_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<MyProfilePayload>,
) -> AppResult<Json<MyProfileOut>> {
    write_my_profile(&state, &user, payload, false)
}

/// Shared PUT/PATCH body. With `full`, absent optional fields are cleared
/// and the nickname is required.
fn write_my_profile(
    state: &AppState,
    user: &CurrentUser,
    payload: MyProfilePayload,
    full: bool,
) -> AppResult<Json<MyProfileOut>> {
    let mut conn = state.db.get()?;
    let current = profiles::get(&conn, user.profile_id)?
        .ok_or_else(|| AppError::not_found("Profile"))?;

    let mut v = Validator::new();
    let nickname = match payload.nickname.as_deref() {
        Some(n) => v.text("nickname", n, NICKNAME_MAX),
        None if full => {
            v.add("nickname", REQUIRED);
            None
        }
        None => Some(current.nickname.clone()),
    };
    if let Some(ref n) = nickname {
        if profiles::nickname_taken(&conn, n, Some(current.id))? {
            v.add("nickname", NICKNAME_TAKEN);
        }
    }

    let bio = merge(payload.bio, current.bio.clone(), full);
    let profile_image = merge(payload.profile_image, current.profile_image.clone(), full);

    let user_changes = match payload.user {
        Some(nested) => {
            let mut nested_v = Validator::new();
            let email = match nested.email.as_deref() {
                Some(e) => {
                    let email = nested_v.text("email", e, EMAIL_MAX);
                    match email {
                        Some(ref e) if !e.contains('@') => {
                            nested_v.add("email", "Enter a valid email address.");
                        }
                        Some(ref e) if users::email_taken(&conn, e, Some(user.user_id))? => {
                            nested_v.add("email", EMAIL_TAKEN);
                        }
                        _ => {}
                    }
                    email
                }
                None => None,
            };
            v.nest("user", nested_v);
            Some(users::UserChanges {
                email,
                first_name: nested.first_name.map(|s| s.trim().to_string()),
                last_name: nested.last_name.map(|s| s.trim().to_string()),
                password_hash: None,
            })
        }
        None => None,
    };
    v.finish()?;

    let nickname = nickname.unwrap_or(current.nickname);
    let tx = conn.transaction()?;
    profiles::update(
        &tx,
        current.id,
        &nickname,
        bio.as_deref(),
        profile_image.as_deref(),
    )
    .map_err(|e| e.on_unique(AppError::field("nickname", NICKNAME_TAKEN)))?;
    if let Some(ref changes) = user_changes {
        users::update(&tx, user.user_id, changes)
            .map_err(|e| e.on_unique(AppError::nested_field("user", "email", EMAIL_TAKEN)))?;
    }
    let updated = profiles::get(&tx, current.id)?.ok_or_else(|| AppError::not_found("Profile"))?;
    tx.commit()?;

    tracing::debug!(profile_id = current.id, "Updated own profile");
    Ok(Json(MyProfileOut::from(updated)))
}

/// PATCH keeps the stored value for absent fields; PUT clears them.
fn merge(incoming: Option<Option<String>>, stored: Option<String>, full: bool) -> Option<String> {
    match incoming {
        Some(value) => value,
        None if full => None,
        None => stored,
    }
}

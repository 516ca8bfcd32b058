use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::Connection;

use crate::auth::{password, session};
use crate::db::{profiles, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{extract_token, CurrentUser, JsonBody};
use crate::state::AppState;
use crate::validation::{Validator, EMAIL_TAKEN, NICKNAME_TAKEN, REQUIRED};
use crate::wire::{Detail, RegisterRequest, TokenOut, TokenRequest, UserOut, UserPatch};

const EMAIL_MAX: usize = 254;
const NICKNAME_MAX: usize = 120;

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// Trimmed email with a minimal shape check.
fn validate_email(v: &mut Validator, value: Option<&str>) -> Option<String> {
    let email = v.required_text("email", value, EMAIL_MAX)?;
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        v.add("email", "Enter a valid email address.");
        return None;
    }
    Some(email)
}

fn validate_password(v: &mut Validator, value: Option<&str>) -> Option<String> {
    match value {
        None => {
            v.add("password", REQUIRED);
            None
        }
        Some(p) if p.chars().count() < password::MIN_LENGTH => {
            v.add(
                "password",
                format!(
                    "Ensure this field has at least {} characters.",
                    password::MIN_LENGTH
                ),
            );
            None
        }
        Some(p) => Some(p.to_string()),
    }
}

/// Default nickname: the email's local part.
fn nickname_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let local: String = local.chars().take(NICKNAME_MAX - 21).collect();
    if local.is_empty() {
        "user".to_string()
    } else {
        local
    }
}

/// First unused nickname among `base`, `base_<user id>`, `base_<user id>_2`, ...
fn free_nickname(conn: &Connection, base: &str, user_id: i64) -> AppResult<String> {
    let mut candidate = base.to_string();
    let mut attempt = 1;
    while profiles::nickname_taken(conn, &candidate, None)? {
        candidate = if attempt == 1 {
            format!("{}_{}", base, user_id)
        } else {
            format!("{}_{}_{}", base, user_id, attempt)
        };
        attempt += 1;
    }
    Ok(candidate)
}

// -- Handlers --

/// POST /api/user/register/
/// Create an account and its profile.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<Response> {
    let mut v = Validator::new();
    let email = validate_email(&mut v, req.email.as_deref());
    let plaintext = validate_password(&mut v, req.password.as_deref());
    let nickname = match req.nickname.as_deref() {
        Some(n) => v.text("nickname", n, NICKNAME_MAX),
        None => None,
    };

    let mut conn = state.db.get()?;
    if let Some(ref email) = email {
        if users::email_taken(&conn, email, None)? {
            v.add("email", EMAIL_TAKEN);
        }
    }
    if let Some(ref nickname) = nickname {
        if profiles::nickname_taken(&conn, nickname, None)? {
            v.add("nickname", NICKNAME_TAKEN);
        }
    }
    v.finish()?;

    let (Some(email), Some(plaintext)) = (email, plaintext) else {
        return Err(AppError::Internal("validated fields missing".into()));
    };
    let password_hash = password::hash(&plaintext, state.config.auth.bcrypt_cost)?;

    let tx = conn.transaction()?;
    let user_id = users::create(
        &tx,
        &users::NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
        },
    )
    .map_err(|e| e.on_unique(AppError::field("email", EMAIL_TAKEN)))?;
    let nickname = match nickname {
        Some(n) => n,
        None => free_nickname(&tx, &nickname_from_email(&email), user_id)?,
    };
    profiles::create(&tx, user_id, &nickname)
        .map_err(|e| e.on_unique(AppError::field("nickname", NICKNAME_TAKEN)))?;
    let user = users::get(&tx, user_id)?.ok_or_else(|| AppError::not_found("User"))?;
    tx.commit()?;

    tracing::info!(user_id, nickname = %nickname, "Registered user");
    Ok((StatusCode::CREATED, Json(UserOut::from(user))).into_response())
}

/// POST /api/user/token/
/// Exchange credentials for a session token.
pub async fn token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TokenRequest>,
) -> AppResult<Response> {
    let mut v = Validator::new();
    if req.email.is_none() {
        v.add("email", REQUIRED);
    }
    if req.password.is_none() {
        v.add("password", REQUIRED);
    }
    v.finish()?;

    let email = req.email.unwrap_or_default();
    let plaintext = req.password.unwrap_or_default();

    let conn = state.db.get()?;
    let user = users::find_by_email(&conn, email.trim())?
        .filter(|u| password::verify(&plaintext, &u.password_hash))
        .ok_or_else(|| {
            AppError::BadRequest("Unable to log in with provided credentials.".into())
        })?;

    let hours = state.config.auth.session_hours;
    let token = session::create_session(&conn, user.id, hours)?;
    tracing::debug!(user_id = user.id, "Issued session token");

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.auth.cookie_name, &token, hours),
        )],
        Json(TokenOut { token }),
    )
        .into_response())
}

/// POST /api/user/logout/
/// Drop the presented session.
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = extract_token(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(cookie_name))],
        Json(Detail::new("Successfully logged out.")),
    )
        .into_response())
}

/// GET /api/user/me/
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<UserOut>> {
    let conn = state.db.get()?;
    let account = users::get(&conn, user.user_id)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(account.into()))
}

/// PATCH /api/user/me/
/// Partial account update.
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<UserPatch>,
) -> AppResult<Json<UserOut>> {
    let mut v = Validator::new();
    let email = match req.email.as_deref() {
        Some(e) => validate_email(&mut v, Some(e)),
        None => None,
    };
    let plaintext = match req.password.as_deref() {
        Some(p) => validate_password(&mut v, Some(p)),
        None => None,
    };

    let conn = state.db.get()?;
    if let Some(ref email) = email {
        if users::email_taken(&conn, email, Some(user.user_id))? {
            v.add("email", EMAIL_TAKEN);
        }
    }
    v.finish()?;

    let password_hash = match plaintext {
        Some(p) => Some(password::hash(&p, state.config.auth.bcrypt_cost)?),
        None => None,
    };
    users::update(
        &conn,
        user.user_id,
        &users::UserChanges {
            email,
            first_name: req.first_name.map(|s| s.trim().to_string()),
            last_name: req.last_name.map(|s| s.trim().to_string()),
            password_hash,
        },
    )
    .map_err(|e| e.on_unique(AppError::field("email", EMAIL_TAKEN)))?;

    let account = users::get(&conn, user.user_id)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(account.into()))
}

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::{header, HeaderMap};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The authenticated caller and their profile.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub profile_id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl CurrentUser {
    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Extractor that requires authentication.
/// Reuses the identity resolved by [`require_auth`] when it already ran.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = extract_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;
        let conn = state.db.get()?;
        session::resolve(&conn, token)?.ok_or(AppError::Unauthorized)
    }
}

/// Middleware that rejects every request without a live session, before
/// routing decides anything else.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, &state).await?;
    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Token from `Authorization: Bearer <token>` (or `Token <token>`),
/// falling back to the session cookie.
pub fn extract_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("Token "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty());

    from_header.or_else(|| cookie_value(headers, cookie_name))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

/// `Json` whose rejections answer 400 with a `detail` message.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn headers_with(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut builder = HttpRequest::builder().uri("/");
        for (k, v) in pairs {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0.headers
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let headers = headers_with(&[
            ("authorization", "Bearer abc"),
            ("cookie", "agora_session=def"),
        ]);
        assert_eq!(extract_token(&headers, "agora_session"), Some("abc"));
    }

    #[test]
    fn token_prefix_is_accepted() {
        let headers = headers_with(&[("authorization", "Token xyz")]);
        assert_eq!(extract_token(&headers, "agora_session"), Some("xyz"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let headers = headers_with(&[("cookie", "other=1; agora_session=def")]);
        assert_eq!(extract_token(&headers, "agora_session"), Some("def"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let headers = headers_with(&[("authorization", "Basic Zm9vOmJhcg==")]);
        assert_eq!(extract_token(&headers, "agora_session"), None);
    }

    #[test]
    fn staff_check() {
        let mut user = CurrentUser {
            user_id: 1,
            profile_id: 1,
            email: "a@example.com".into(),
            is_staff: false,
        };
        assert!(matches!(user.require_staff(), Err(AppError::Forbidden)));
        user.is_staff = true;
        assert!(user.require_staff().is_ok());
    }
}

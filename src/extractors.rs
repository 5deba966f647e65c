use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session is found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated)?;

        let (id, username) =
            session::resolve(&state.db, token)?.ok_or(AppError::Unauthenticated)?;

        Ok(CurrentUser { id, username })
    }
}

/// Optional user extractor — returns None instead of 401 when not
/// authenticated. Read-only pages use this to redirect anonymous callers.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Pull a named cookie's value out of the Cookie headers.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let headers = headers_with_cookie("a=1; plaza_session=tok123; b=2");
        assert_eq!(cookie_value(&headers, "plaza_session"), Some("tok123"));
    }

    #[test]
    fn cookie_value_ignores_other_cookies() {
        let headers = headers_with_cookie("other=tok123");
        assert_eq!(cookie_value(&headers, "plaza_session"), None);
    }

    #[test]
    fn cookie_value_handles_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, "plaza_session"), None);
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiError;
use crate::session::SESSION_COOKIE;

/// The authenticated caller, resolved from the session cookie. Handlers that
/// take this extractor are session-gated: a missing or expired session
/// rejects the request with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::AuthRequired)?;

        let session = state
            .sessions
            .get(&token)?
            .ok_or(ApiError::AuthRequired)?;

        Ok(CurrentUser {
            user_id: session.user_id,
            email: session.email,
        })
    }
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Identity of the caller, resolved from the bearer token on every request.
/// Handlers take user ids only from here, never from the body.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("Not authorized, no token".into()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Auth("Invalid Authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Auth("Invalid Authorization header".into()));
    }
    Ok(token.trim())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user_id = state.sessions.validate(token).await?;
        Ok(AuthUser(user_id))
    }
}

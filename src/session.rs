//! Bearer-token gate for protected routes.
//!
//! Handlers that take an [`AuthUser`] argument only run once the request has
//! presented a valid token; the resolved user id is handed to them directly.

use crate::{AppState, errors::AppError, token::TokenService};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use uuid::Uuid;

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

/// Returns the token of a `Bearer <token>` authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::MissingToken)?;
    let user_id = tokens.verify(token).map_err(AppError::InvalidToken)?;
    Ok(AuthUser(user_id))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = authenticate(&parts.headers, &state.tokens)?;
        tracing::debug!(user_id = %user.id(), "Request authenticated");
        Ok(user)
    }
}

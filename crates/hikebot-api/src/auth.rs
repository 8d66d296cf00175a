//! Caller identity for `/social/*`.
//!
//! A bearer token is accepted when JWT signing is configured. The
//! `X-Username` + `X-User-Code` pair is always accepted.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use hikebot_core::{AuthUser, SecurityEvent, SecurityLogger};

use crate::{ApiError, AppState};

pub const USERNAME_HEADER: &str = "X-Username";
pub const USER_CODE_HEADER: &str = "X-User-Code";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn from_bearer(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let Some(jwt) = &state.jwt else {
        return Err(ApiError::Unauthorized("Bearer tokens are not enabled".into()));
    };

    let claims = jwt.validate_token(token).map_err(|e| {
        SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
            username: String::new(),
            method: "bearer",
            reason: e.to_string(),
        });
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;

    match state.social.user(claims.sub)? {
        Some(user) => {
            SecurityLogger::log_event(SecurityEvent::AuthenticationSuccess {
                user_id: user.id,
                method: "bearer",
            });
            Ok(user)
        }
        None => {
            SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
                username: claims.username,
                method: "bearer",
                reason: "account no longer exists".into(),
            });
            Err(ApiError::Unauthorized("Invalid or expired token".into()))
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            return from_bearer(state, token).map(CurrentUser);
        }

        match (
            header_value(parts, USERNAME_HEADER),
            header_value(parts, USER_CODE_HEADER),
        ) {
            (Some(username), Some(user_code)) => Ok(CurrentUser(
                state.social.authenticate_headers(username, user_code)?,
            )),
            _ => Err(ApiError::Unauthorized("Missing auth headers".into())),
        }
    }
}

//! Explicit per-request authentication context. The external identity layer
//! terminates the session and injects the caller's identity and Graph access
//! token as headers; nothing here mutates ambient request state.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::error::ApiError;
use crate::db::models::User;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    /// Delegated Graph access token for provider calls on the caller's
    /// behalf.
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub enum AuthContext {
    Authenticated(Session),
    Anonymous,
}

impl AuthContext {
    /// The session, or the 401 the route should answer with.
    pub fn into_session(self) -> Result<Session, ApiError> {
        match self {
            Self::Authenticated(session) => Ok(session),
            Self::Anonymous => Err(ApiError::Unauthorized),
        }
    }

    pub(crate) fn from_parts(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let access_token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        match (header(USER_ID_HEADER), access_token) {
            (Some(user_id), Some(access_token)) => Self::Authenticated(Session {
                user: User {
                    user_id,
                    name: header(USER_NAME_HEADER).unwrap_or_default(),
                    email: header(USER_EMAIL_HEADER).unwrap_or_default(),
                },
                access_token,
            }),
            _ => Self::Anonymous,
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

//! Caller identity.
//!
//! Authentication happens upstream; the gateway only reads the numeric user
//! id the authentication layer forwards in `x-user-id`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use song_store::UserId;

use crate::models::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, extracted from request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity(pub UserId);

fn parse_user_id(raw: &str) -> Option<UserId> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().map(UserId)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_user_id)
            .map(CallerIdentity)
            .ok_or(ApiError::Unauthorized)
    }
}

//! HTTP response models and the error type shared by all handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use song_ingest::{FieldDefect, ItemOutcome, ItemStatus, INTERNAL_ERROR};
use song_store::Song;
use thiserror::Error;

pub const NOT_FOUND: &str = "The requested route was not found.";
pub const UNAUTHORIZED: &str = "Unauthorized";

// ------------------------------------------------------------------ //
//  Outbound (gateway → client)                                        //
// ------------------------------------------------------------------ //

/// Body of every batch route once the batch has run, whatever the
/// individual items did.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: ItemStatus,
    /// One entry per submitted record, in submission order.
    pub songs: Vec<ItemOutcome>,
}

impl BatchResponse {
    pub fn new(songs: Vec<ItemOutcome>) -> Self {
        Self {
            status: ItemStatus::Succeeded,
            songs,
        }
    }
}

/// `GET /api/song/favorite`
#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub status: ItemStatus,
    pub songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Failed request as seen by the client.
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldDefect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ------------------------------------------------------------------ //
//  Errors                                                             //
// ------------------------------------------------------------------ //

/// Request-level failures. Per-item failures never end up here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected: {0:?}")]
    Rejected(Vec<FieldDefect>),
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("missing or invalid caller identity")]
    Unauthorized,
    #[error("route not found")]
    NotFound,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (errors, message) = match self {
            ApiError::Rejected(defects) => (defects, None),
            ApiError::MalformedBody(reason) => (Vec::new(), Some(reason)),
            ApiError::Unauthorized => (Vec::new(), Some(UNAUTHORIZED.to_string())),
            ApiError::NotFound => (Vec::new(), Some(NOT_FOUND.to_string())),
            ApiError::Internal => (Vec::new(), Some(INTERNAL_ERROR.to_string())),
        };
        let body = FailureBody {
            status: ItemStatus::Failed,
            errors,
            message,
        };
        (status, Json(body)).into_response()
    }
}

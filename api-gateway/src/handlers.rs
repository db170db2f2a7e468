//! Axum HTTP handlers for the song routes.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use song_ingest::{
    decode_items, BatchDriver, BatchOperation, CatalogSongInput, CatalogUpsert, FavoriteRefInput,
    FavoriteToggle, FieldDefect, ItemStatus, RateSongs, RatingInput, SONGS,
};
use tracing::{error, warn};

use crate::{
    auth::CallerIdentity,
    models::{ApiError, BatchResponse, FavoritesResponse, HealthResponse},
    AppState,
};

// ------------------------------------------------------------------ //
//  Request-level validation                                           //
// ------------------------------------------------------------------ //

/// Pull the `songs` array out of a batch body.
///
/// Only the shape of the collection is checked here; each element is
/// validated later in its own slot.
pub fn batch_items(body: Result<Json<Value>, JsonRejection>) -> Result<Vec<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    let songs = match body {
        Value::Object(mut map) => map.remove(SONGS),
        _ => None,
    };
    match songs {
        None | Some(Value::Null) => Err(ApiError::Rejected(vec![FieldDefect::required(SONGS, None)])),
        Some(Value::Array(items)) if items.is_empty() => Err(ApiError::Rejected(vec![
            FieldDefect::required(SONGS, Some(&Value::Array(items))),
        ])),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ApiError::Rejected(vec![FieldDefect::validity(SONGS, Some(&other))])),
    }
}

/// Run one batch and hand its faults to the operator channel. The client
/// response does not depend on whether the sink succeeds.
async fn run_batch<O: BatchOperation>(
    state: &AppState,
    op: &O,
    inputs: &[O::Input],
) -> BatchResponse {
    let report = BatchDriver::new(state.store.as_ref()).run(op, inputs).await;

    if !report.faults.is_empty() {
        if let Err(e) = state.faults.record(&report.faults).await {
            warn!(
                batch_id = %report.batch_id,
                operation = op.name(),
                error = %e,
                "fault sink failed"
            );
        }
    }

    BatchResponse::new(report.outcomes)
}

// ------------------------------------------------------------------ //
//  GET /health                                                        //
// ------------------------------------------------------------------ //

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ------------------------------------------------------------------ //
//  Batch routes                                                       //
// ------------------------------------------------------------------ //

/// `POST /api/song`
pub async fn upsert_songs(
    State(state): State<Arc<AppState>>,
    _caller: CallerIdentity,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let inputs: Vec<CatalogSongInput> = decode_items(batch_items(body)?);
    Ok(Json(run_batch(&state, &CatalogUpsert, &inputs).await))
}

/// `POST /api/song/like`
pub async fn like_songs(
    State(state): State<Arc<AppState>>,
    CallerIdentity(user): CallerIdentity,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let inputs: Vec<FavoriteRefInput> = decode_items(batch_items(body)?);
    Ok(Json(run_batch(&state, &FavoriteToggle::add(user), &inputs).await))
}

/// `POST /api/song/dislike`
pub async fn dislike_songs(
    State(state): State<Arc<AppState>>,
    CallerIdentity(user): CallerIdentity,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let inputs: Vec<FavoriteRefInput> = decode_items(batch_items(body)?);
    Ok(Json(run_batch(&state, &FavoriteToggle::remove(user), &inputs).await))
}

/// `POST /api/song/rate`
pub async fn rate_songs(
    State(state): State<Arc<AppState>>,
    CallerIdentity(user): CallerIdentity,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let inputs: Vec<RatingInput> = decode_items(batch_items(body)?);
    Ok(Json(run_batch(&state, &RateSongs { user_id: user }, &inputs).await))
}

// ------------------------------------------------------------------ //
//  GET /api/song/favorite                                             //
// ------------------------------------------------------------------ //

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    CallerIdentity(user): CallerIdentity,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let songs = state.store.favorite_songs(user).await.map_err(|e| {
        error!(user_id = %user, error = %e, "favorite listing failed");
        ApiError::Internal
    })?;
    Ok(Json(FavoritesResponse {
        status: ItemStatus::Succeeded,
        songs,
    }))
}

// ------------------------------------------------------------------ //
//  Fallback                                                           //
// ------------------------------------------------------------------ //

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

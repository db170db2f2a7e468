//! HTTP gateway for the song ingestion pipeline.
//!
//! Receives JSON batches from clients, checks the request envelope, runs the
//! batch through [`song_ingest::BatchDriver`] and reports one outcome per
//! submitted record. Store faults are forwarded to a [`FaultSink`] and only
//! ever reach the client as a generic message.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod secrets;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use song_ingest::FaultSink;
use song_store::SongStore;
use tower_http::trace::TraceLayer;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub store: Arc<dyn SongStore>,
    /// Operator channel for store faults.
    pub faults: Arc<dyn FaultSink>,
}

// ------------------------------------------------------------------ //
//  Router                                                             //
// ------------------------------------------------------------------ //

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/song", post(handlers::upsert_songs))
        .route("/api/song/like", post(handlers::like_songs))
        .route("/api/song/dislike", post(handlers::dislike_songs))
        .route("/api/song/rate", post(handlers::rate_songs))
        .route("/api/song/favorite", get(handlers::list_favorites))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}


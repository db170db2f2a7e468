//! Song catalog storage.
//!
//! [`SongStore`] is the only surface the ingestion pipeline sees. Each method
//! performs a single read or a single idempotent write and completes with
//! either a value or a [`StoreError`]. A read for a missing key completes
//! with `Ok(None)`, never with an error.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemorySongStore;
pub use models::{NewRating, NewSong, Pace, Song, SongId, StoredRating, UserId};
pub use postgres::PgSongStore;

/// Operational failure of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

#[async_trait]
pub trait SongStore: Send + Sync {
    /// Read one song by surrogate id.
    async fn find_song(&self, id: SongId) -> StoreResult<Option<Song>>;

    /// Insert or overwrite the song keyed by `spotify_song_id`.
    async fn upsert_song(&self, song: &NewSong) -> StoreResult<SongId>;

    /// Mark a song as favorite. Already-favorite songs are left untouched.
    async fn add_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()>;

    /// Drop a favorite mark. Songs that are not favorite are left untouched.
    async fn remove_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()>;

    /// Upsert the rating for `(user, song, pace)`, bumping its counter when
    /// a prior rating exists. Returns the stored counter.
    async fn record_rating(&self, rating: &NewRating) -> StoreResult<u32>;

    /// Favorite songs of a user, oldest first.
    async fn favorite_songs(&self, user_id: UserId) -> StoreResult<Vec<Song>>;
}

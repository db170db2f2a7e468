//! Entities owned by the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  Identifiers                                                        //
// ------------------------------------------------------------------ //

/// Surrogate id assigned to a song by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

/// Opaque id of an already-authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Listening-context tier used to bucket ratings (a single digit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pace(u8);

impl Pace {
    pub const MAX: u8 = 9;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_inner!(SongId, UserId, Pace);

// ------------------------------------------------------------------ //
//  Songs                                                              //
// ------------------------------------------------------------------ //

/// Catalog entry as submitted for upsert, keyed by `spotify_song_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub name: String,
    pub img: Option<String>,
    pub tempo: f64,
    pub loudness: f64,
    pub duration: Option<i32>,
    pub popularity: i32,
    pub album_genre: String,
    pub spotify_album_id: String,
    pub spotify_artist_id: String,
    /// Natural key; unique across the catalog.
    pub spotify_song_id: String,
}

/// A persisted song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    #[serde(flatten)]
    pub fields: NewSong,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ------------------------------------------------------------------ //
//  Ratings                                                            //
// ------------------------------------------------------------------ //

/// One rating submission for `(user, song, pace)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewRating {
    pub user_id: UserId,
    pub song_id: SongId,
    pub pace: Pace,
    pub rating: f64,
}

/// Stored rating row. `counter` counts submissions for the same key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredRating {
    pub user_id: UserId,
    pub song_id: SongId,
    pub pace: Pace,
    pub rating: f64,
    pub counter: u32,
}

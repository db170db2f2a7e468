//! In-memory [`SongStore`] used for tests and local development.
//!
//! Faults can be injected per song so callers can observe how a single
//! failing item is handled while its neighbours go through.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{NewRating, NewSong, Pace, Song, SongId, StoredRating, UserId};
use crate::{SongStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    songs: BTreeMap<SongId, Song>,
    by_spotify_id: HashMap<String, SongId>,
    last_id: i64,
    /// Insertion ordered.
    favorites: Vec<(UserId, SongId)>,
    ratings: HashMap<(UserId, SongId, Pace), StoredRating>,

    failing_reads: HashSet<SongId>,
    failing_writes: HashSet<SongId>,
    failing_upserts: HashSet<String>,

    read_calls: usize,
    write_calls: usize,
}

/// Shared, cloneable in-memory store.
#[derive(Debug, Default, Clone)]
pub struct InMemorySongStore {
    state: Arc<Mutex<State>>,
}

impl InMemorySongStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------- //
    //  Fault injection                                               //
    // -------------------------------------------------------------- //

    /// Every read of `id` fails from now on.
    pub fn fail_reads_of(&self, id: SongId) {
        self.lock().failing_reads.insert(id);
    }

    /// Every favorite/rating write touching `id` fails from now on.
    pub fn fail_writes_for(&self, id: SongId) {
        self.lock().failing_writes.insert(id);
    }

    /// Every upsert of the given natural key fails from now on.
    pub fn fail_upserts_of(&self, spotify_song_id: &str) {
        self.lock().failing_upserts.insert(spotify_song_id.to_string());
    }

    // -------------------------------------------------------------- //
    //  Inspection                                                    //
    // -------------------------------------------------------------- //

    pub fn read_calls(&self) -> usize {
        self.lock().read_calls
    }

    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    /// Non-destructive snapshot of all songs ordered by id.
    pub fn songs(&self) -> Vec<Song> {
        self.lock().songs.values().cloned().collect()
    }

    pub fn song_by_spotify_id(&self, spotify_song_id: &str) -> Option<Song> {
        let state = self.lock();
        state
            .by_spotify_id
            .get(spotify_song_id)
            .and_then(|id| state.songs.get(id))
            .cloned()
    }

    pub fn is_favorite(&self, user_id: UserId, song_id: SongId) -> bool {
        self.lock().favorites.contains(&(user_id, song_id))
    }

    pub fn favorite_count(&self) -> usize {
        self.lock().favorites.len()
    }

    pub fn rating(&self, user_id: UserId, song_id: SongId, pace: Pace) -> Option<StoredRating> {
        self.lock().ratings.get(&(user_id, song_id, pace)).copied()
    }
}

fn injected(what: &str, key: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("injected {what} fault for {key}"))
}

#[async_trait]
impl SongStore for InMemorySongStore {
    async fn find_song(&self, id: SongId) -> StoreResult<Option<Song>> {
        let mut state = self.lock();
        state.read_calls += 1;
        if state.failing_reads.contains(&id) {
            return Err(injected("read", id));
        }
        Ok(state.songs.get(&id).cloned())
    }

    async fn upsert_song(&self, song: &NewSong) -> StoreResult<SongId> {
        let mut state = self.lock();
        state.write_calls += 1;
        if state.failing_upserts.contains(&song.spotify_song_id) {
            return Err(injected("upsert", &song.spotify_song_id));
        }

        let now = Utc::now();
        if let Some(id) = state.by_spotify_id.get(&song.spotify_song_id).copied() {
            if let Some(existing) = state.songs.get_mut(&id) {
                existing.fields = song.clone();
                existing.updated_at = now;
                return Ok(id);
            }
        }

        state.last_id += 1;
        let id = SongId(state.last_id);
        state.by_spotify_id.insert(song.spotify_song_id.clone(), id);
        state.songs.insert(
            id,
            Song {
                id,
                fields: song.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn add_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()> {
        let mut state = self.lock();
        state.write_calls += 1;
        if state.failing_writes.contains(&song_id) {
            return Err(injected("favorite", song_id));
        }
        if !state.favorites.contains(&(user_id, song_id)) {
            state.favorites.push((user_id, song_id));
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()> {
        let mut state = self.lock();
        state.write_calls += 1;
        if state.failing_writes.contains(&song_id) {
            return Err(injected("favorite", song_id));
        }
        state.favorites.retain(|entry| *entry != (user_id, song_id));
        Ok(())
    }

    async fn record_rating(&self, rating: &NewRating) -> StoreResult<u32> {
        let mut state = self.lock();
        state.write_calls += 1;
        if state.failing_writes.contains(&rating.song_id) {
            return Err(injected("rating", rating.song_id));
        }

        let stored = state
            .ratings
            .entry((rating.user_id, rating.song_id, rating.pace))
            .and_modify(|r| {
                r.rating = rating.rating;
                r.counter += 1;
            })
            .or_insert(StoredRating {
                user_id: rating.user_id,
                song_id: rating.song_id,
                pace: rating.pace,
                rating: rating.rating,
                counter: 1,
            });
        Ok(stored.counter)
    }

    async fn favorite_songs(&self, user_id: UserId) -> StoreResult<Vec<Song>> {
        let mut state = self.lock();
        state.read_calls += 1;
        let songs = state
            .favorites
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, song_id)| state.songs.get(song_id).cloned())
            .collect();
        Ok(songs)
    }
}

//! Favorite add/remove for the calling user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use song_store::{Song, SongId, SongStore, StoreResult, UserId};

use crate::driver::BatchOperation;
use crate::normalize::FieldReader;
use crate::operations::SONGS;
use crate::outcome::FieldDefect;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FavoriteRefInput {
    pub song_id: Option<Value>,
}

/// Whole-batch direction of a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteMode {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy)]
pub struct FavoriteToggle {
    pub user_id: UserId,
    pub mode: FavoriteMode,
}

impl FavoriteToggle {
    pub fn add(user_id: UserId) -> Self {
        Self {
            user_id,
            mode: FavoriteMode::Add,
        }
    }

    pub fn remove(user_id: UserId) -> Self {
        Self {
            user_id,
            mode: FavoriteMode::Remove,
        }
    }
}

#[async_trait]
impl BatchOperation for FavoriteToggle {
    type Input = FavoriteRefInput;
    type Record = SongId;
    type Target = Song;

    fn name(&self) -> &'static str {
        match self.mode {
            FavoriteMode::Add => "favorite_add",
            FavoriteMode::Remove => "favorite_remove",
        }
    }

    fn validate(&self, index: usize, input: &FavoriteRefInput) -> Result<SongId, Vec<FieldDefect>> {
        let mut r = FieldReader::new(SONGS, index);
        match r.song_id("song_id", input.song_id.as_ref()) {
            Some(id) => Ok(id),
            None => Err(r.into_defects()),
        }
    }

    async fn resolve(&self, store: &dyn SongStore, id: &SongId) -> StoreResult<Option<Song>> {
        store.find_song(*id).await
    }

    async fn persist(&self, store: &dyn SongStore, _id: SongId, song: Song) -> StoreResult<()> {
        match self.mode {
            FavoriteMode::Add => store.add_favorite(self.user_id, song.id).await,
            FavoriteMode::Remove => store.remove_favorite(self.user_id, song.id).await,
        }
    }
}

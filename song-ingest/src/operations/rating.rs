//! Song ratings keyed by (user, song, pace).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use song_store::{NewRating, Pace, Song, SongId, SongStore, StoreResult, UserId};

use crate::driver::BatchOperation;
use crate::normalize::FieldReader;
use crate::operations::SONGS;
use crate::outcome::FieldDefect;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RatingInput {
    pub song_id: Option<Value>,
    pub pace: Option<Value>,
    pub rate: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRecord {
    pub song_id: SongId,
    pub pace: Pace,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateSongs {
    pub user_id: UserId,
}

#[async_trait]
impl BatchOperation for RateSongs {
    type Input = RatingInput;
    type Record = RatingRecord;
    type Target = Song;

    fn name(&self) -> &'static str {
        "rating"
    }

    fn validate(&self, index: usize, input: &RatingInput) -> Result<RatingRecord, Vec<FieldDefect>> {
        let mut r = FieldReader::new(SONGS, index);
        let song_id = r.song_id("song_id", input.song_id.as_ref());
        let pace = r.pace("pace", input.pace.as_ref());
        let rate = r.decimal("rate", input.rate.as_ref());

        match (song_id, pace, rate) {
            (Some(song_id), Some(pace), Some(rate)) if r.is_clean() => Ok(RatingRecord {
                song_id,
                pace,
                rate,
            }),
            _ => Err(r.into_defects()),
        }
    }

    async fn resolve(&self, store: &dyn SongStore, record: &RatingRecord) -> StoreResult<Option<Song>> {
        store.find_song(record.song_id).await
    }

    async fn persist(&self, store: &dyn SongStore, record: RatingRecord, song: Song) -> StoreResult<()> {
        let rating = NewRating {
            user_id: self.user_id,
            song_id: song.id,
            pace: record.pace,
            rating: record.rate,
        };
        store.record_rating(&rating).await.map(|_| ())
    }
}

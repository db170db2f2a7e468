//! Catalog upsert keyed by `spotify_song_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use song_store::{NewSong, SongStore, StoreResult};

use crate::driver::BatchOperation;
use crate::normalize::FieldReader;
use crate::operations::SONGS;
use crate::outcome::FieldDefect;

/// One submitted catalog entry, fields still raw.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogSongInput {
    pub name: Option<Value>,
    pub img: Option<Value>,
    pub tempo: Option<Value>,
    pub loudness: Option<Value>,
    pub duration: Option<Value>,
    pub popularity: Option<Value>,
    pub album_genre: Option<Value>,
    pub spotify_album_id: Option<Value>,
    pub spotify_artist_id: Option<Value>,
    pub spotify_song_id: Option<Value>,
}

/// Insert-or-overwrite songs. The upsert resolves identity itself, so no
/// separate lookup runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogUpsert;

#[async_trait]
impl BatchOperation for CatalogUpsert {
    type Input = CatalogSongInput;
    type Record = NewSong;
    type Target = ();

    fn name(&self) -> &'static str {
        "catalog_upsert"
    }

    fn validate(&self, index: usize, input: &CatalogSongInput) -> Result<NewSong, Vec<FieldDefect>> {
        let mut r = FieldReader::new(SONGS, index);

        let name = r.text("name", input.name.as_ref());
        let img = r.optional_url("img", input.img.as_ref());
        let tempo = r.decimal("tempo", input.tempo.as_ref());
        let loudness = r.decimal("loudness", input.loudness.as_ref());
        let duration = r.optional_integer("duration", input.duration.as_ref());
        let popularity = r.integer("popularity", input.popularity.as_ref());
        let album_genre = r.text("album_genre", input.album_genre.as_ref());
        let spotify_album_id = r.text("spotify_album_id", input.spotify_album_id.as_ref());
        let spotify_artist_id = r.text("spotify_artist_id", input.spotify_artist_id.as_ref());
        let spotify_song_id = r.text("spotify_song_id", input.spotify_song_id.as_ref());

        match (
            name,
            tempo,
            loudness,
            popularity,
            album_genre,
            spotify_album_id,
            spotify_artist_id,
            spotify_song_id,
        ) {
            (
                Some(name),
                Some(tempo),
                Some(loudness),
                Some(popularity),
                Some(album_genre),
                Some(spotify_album_id),
                Some(spotify_artist_id),
                Some(spotify_song_id),
            ) if r.is_clean() => Ok(NewSong {
                name,
                img,
                tempo,
                loudness,
                duration,
                popularity,
                album_genre,
                spotify_album_id,
                spotify_artist_id,
                spotify_song_id,
            }),
            _ => Err(r.into_defects()),
        }
    }

    async fn resolve(&self, _store: &dyn SongStore, _record: &NewSong) -> StoreResult<Option<()>> {
        Ok(Some(()))
    }

    async fn persist(&self, store: &dyn SongStore, record: NewSong, _target: ()) -> StoreResult<()> {
        store.upsert_song(&record).await.map(|_| ())
    }
}

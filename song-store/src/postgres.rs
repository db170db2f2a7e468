//! PostgreSQL implementation of [`SongStore`].
//!
//! Uniqueness and counter increments are enforced by the database itself
//! (`ON CONFLICT`), so concurrent batches touching the same key stay
//! consistent without any application-level locking.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewRating, NewSong, Song, SongId, UserId};
use crate::{SongStore, StoreError, StoreResult};

/// Shared connection pool.
#[derive(Debug, Clone)]
pub struct PgSongStore {
    pool: PgPool,
}

impl PgSongStore {
    /// Connect to PostgreSQL using the supplied `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Create the tables this store relies on if they don't exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                id                BIGSERIAL PRIMARY KEY,
                name              TEXT NOT NULL,
                img               TEXT,
                tempo             DOUBLE PRECISION NOT NULL,
                loudness          DOUBLE PRECISION NOT NULL,
                duration          INTEGER,
                popularity        INTEGER NOT NULL,
                album_genre       TEXT NOT NULL,
                spotify_album_id  TEXT NOT NULL,
                spotify_artist_id TEXT NOT NULL,
                spotify_song_id   TEXT NOT NULL UNIQUE,
                created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS user_favorite_songs (
                user_id    BIGINT NOT NULL,
                song_id    BIGINT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, song_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS user_song_rates (
                user_id    BIGINT NOT NULL,
                song_id    BIGINT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                pace       SMALLINT NOT NULL,
                rating     DOUBLE PRECISION NOT NULL,
                counter    INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, song_id, pace)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS request_log (
                id         BIGSERIAL PRIMARY KEY,
                batch_id   UUID NOT NULL,
                operation  TEXT NOT NULL,
                item_index INTEGER NOT NULL,
                stage      TEXT NOT NULL,
                detail     TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .context("Failed to create schema")?;
        }

        info!("song store schema ready");
        Ok(())
    }

    /// Append one operator-facing diagnostic row.
    pub async fn insert_request_log(
        &self,
        batch_id: Uuid,
        operation: &str,
        item_index: usize,
        stage: &str,
        detail: &str,
    ) -> StoreResult<()> {
        let item_index = i32::try_from(item_index)
            .map_err(|_| StoreError::Corrupt(format!("item index {item_index} out of range")))?;

        sqlx::query(
            r#"
            INSERT INTO request_log (batch_id, operation, item_index, stage, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(batch_id)
        .bind(operation)
        .bind(item_index)
        .bind(stage)
        .bind(detail)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

const SONG_COLUMNS: &str = "id, name, img, tempo, loudness, duration, popularity, album_genre, \
     spotify_album_id, spotify_artist_id, spotify_song_id, created_at, updated_at";

fn song_from_row(r: &PgRow) -> StoreResult<Song> {
    Ok(Song {
        id: SongId(r.try_get("id")?),
        fields: NewSong {
            name: r.try_get("name")?,
            img: r.try_get("img")?,
            tempo: r.try_get("tempo")?,
            loudness: r.try_get("loudness")?,
            duration: r.try_get("duration")?,
            popularity: r.try_get("popularity")?,
            album_genre: r.try_get("album_genre")?,
            spotify_album_id: r.try_get("spotify_album_id")?,
            spotify_artist_id: r.try_get("spotify_artist_id")?,
            spotify_song_id: r.try_get("spotify_song_id")?,
        },
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl SongStore for PgSongStore {
    async fn find_song(&self, id: SongId) -> StoreResult<Option<Song>> {
        let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(song_from_row).transpose()
    }

    async fn upsert_song(&self, song: &NewSong) -> StoreResult<SongId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO songs
                (name, img, tempo, loudness, duration, popularity, album_genre,
                 spotify_album_id, spotify_artist_id, spotify_song_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (spotify_song_id) DO UPDATE SET
                name              = EXCLUDED.name,
                img               = EXCLUDED.img,
                tempo             = EXCLUDED.tempo,
                loudness          = EXCLUDED.loudness,
                duration          = EXCLUDED.duration,
                popularity        = EXCLUDED.popularity,
                album_genre       = EXCLUDED.album_genre,
                spotify_album_id  = EXCLUDED.spotify_album_id,
                spotify_artist_id = EXCLUDED.spotify_artist_id,
                updated_at        = NOW()
            RETURNING id
            "#,
        )
        .bind(&song.name)
        .bind(&song.img)
        .bind(song.tempo)
        .bind(song.loudness)
        .bind(song.duration)
        .bind(song.popularity)
        .bind(&song.album_genre)
        .bind(&song.spotify_album_id)
        .bind(&song.spotify_artist_id)
        .bind(&song.spotify_song_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SongId(id))
    }

    async fn add_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_favorite_songs (user_id, song_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, song_id) DO NOTHING
            "#,
        )
        .bind(user_id.0)
        .bind(song_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_favorite(&self, user_id: UserId, song_id: SongId) -> StoreResult<()> {
        sqlx::query("DELETE FROM user_favorite_songs WHERE user_id = $1 AND song_id = $2")
            .bind(user_id.0)
            .bind(song_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_rating(&self, rating: &NewRating) -> StoreResult<u32> {
        let counter: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO user_song_rates (user_id, song_id, pace, rating, counter)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (user_id, song_id, pace) DO UPDATE SET
                rating     = EXCLUDED.rating,
                counter    = user_song_rates.counter + 1,
                updated_at = NOW()
            RETURNING counter
            "#,
        )
        .bind(rating.user_id.0)
        .bind(rating.song_id.0)
        .bind(i16::from(rating.pace.get()))
        .bind(rating.rating)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(counter)
            .map_err(|_| StoreError::Corrupt(format!("negative rating counter {counter}")))
    }

    async fn favorite_songs(&self, user_id: UserId) -> StoreResult<Vec<Song>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.name, s.img, s.tempo, s.loudness, s.duration, s.popularity,
                   s.album_genre, s.spotify_album_id, s.spotify_artist_id,
                   s.spotify_song_id, s.created_at, s.updated_at
            FROM user_favorite_songs f
            JOIN songs s ON s.id = f.song_id
            WHERE f.user_id = $1
            ORDER BY f.created_at, s.id
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(song_from_row).collect()
    }
}

//! Song document store.
//!
//! The playlist's create/list/update/delete surface. Songs live in the same
//! SQLite file as the cache generations and share the [`Database`] handle.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use crate::Error;
use crate::cache::Database;

/// A song in the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub likes: i64,
    pub created_at: String,
}

/// Partial update for a song. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SongPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub likes: Option<i64>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.likes.is_none()
    }
}

fn required(field: &str, value: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Document-style id: 20 hex chars derived from content and creation time.
fn song_id(title: &str, artist: &str, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(artist.as_bytes());
    hasher.update(b"\n");
    hasher.update(created_at.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(20);
    id
}

fn read_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        likes: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    /// Add a song with zero likes.
    ///
    /// Title and artist are trimmed and must not be empty.
    pub async fn create_song(&self, title: &str, artist: &str) -> Result<Song, Error> {
        let title = required("title", title)?;
        let artist = required("artist", artist)?;
        let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
        let song = Song { id: song_id(&title, &artist, &created_at), title, artist, likes: 0, created_at };

        let row = song.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO songs (id, title, artist, likes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![row.id, row.title, row.artist, row.likes, row.created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(id = %song.id, "created song");
        Ok(song)
    }

    /// All songs, in the order they were added.
    pub async fn list_songs(&self) -> Result<Vec<Song>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Song>, Error> {
                let mut stmt =
                    conn.prepare("SELECT id, title, artist, likes, created_at FROM songs ORDER BY rowid ASC")?;
                let songs = stmt.query_map([], read_song)?.collect::<Result<Vec<_>, _>>()?;
                Ok(songs)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a song by id.
    pub async fn get_song(&self, id: &str) -> Result<Option<Song>, Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Song>, Error> {
                let result = conn.query_row(
                    "SELECT id, title, artist, likes, created_at FROM songs WHERE id = ?1",
                    params![id],
                    read_song,
                );
                match result {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Apply a partial update and return the updated song.
    pub async fn update_song(&self, id: &str, patch: SongPatch) -> Result<Song, Error> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("update must set at least one field".into()));
        }
        let title = patch.title.as_deref().map(|t| required("title", t)).transpose()?;
        let artist = patch.artist.as_deref().map(|a| required("artist", a)).transpose()?;
        if let Some(likes) = patch.likes
            && likes < 0
        {
            return Err(Error::InvalidInput("likes cannot be negative".into()));
        }

        let owned = id.to_string();
        let likes = patch.likes;
        let updated = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count = conn.execute(
                    "UPDATE songs SET
                        title = COALESCE(?2, title),
                        artist = COALESCE(?3, artist),
                        likes = COALESCE(?4, likes)
                    WHERE id = ?1",
                    params![owned, title, artist, likes],
                )?;
                Ok(count)
            })
            .await
            .map_err(Error::from)?;

        if updated == 0 {
            return Err(Error::NotFound(format!("song {id}")));
        }

        self.get_song(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {id}")))
    }

    /// Increment a song's like counter and return the updated song.
    pub async fn like_song(&self, id: &str) -> Result<Song, Error> {
        let owned = id.to_string();
        let updated = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count = conn.execute("UPDATE songs SET likes = likes + 1 WHERE id = ?1", params![owned])?;
                Ok(count)
            })
            .await
            .map_err(Error::from)?;

        if updated == 0 {
            return Err(Error::NotFound(format!("song {id}")));
        }

        self.get_song(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {id}")))
    }

    /// Delete a song.
    pub async fn delete_song(&self, id: &str) -> Result<(), Error> {
        let owned = id.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count = conn.execute("DELETE FROM songs WHERE id = ?1", params![owned])?;
                Ok(count)
            })
            .await
            .map_err(Error::from)?;

        if deleted == 0 {
            return Err(Error::NotFound(format!("song {id}")));
        }
        Ok(())
    }
}

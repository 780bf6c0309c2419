//! Song tools: the playlist's create/list/update/like/delete surface.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use encore_core::{Database, Song, SongPatch};

use super::json_result;

/// Parameters for the songs_create tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SongsCreateParams {
    pub title: String,
    pub artist: String,
}

/// Parameters for the songs_update tool. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SongsUpdateParams {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
}

/// Parameters for tools addressing one song by id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SongIdParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SongsListOutput {
    pub count: usize,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SongsDeleteOutput {
    pub deleted: String,
}

pub async fn create_impl(db: &Database, params: SongsCreateParams) -> Result<CallToolResult, McpError> {
    let song = db.create_song(&params.title, &params.artist).await?;
    tracing::debug!(id = %song.id, "song created");
    json_result(&song)
}

pub async fn list_impl(db: &Database) -> Result<CallToolResult, McpError> {
    let songs = db.list_songs().await?;
    json_result(&SongsListOutput { count: songs.len(), songs })
}

pub async fn update_impl(db: &Database, params: SongsUpdateParams) -> Result<CallToolResult, McpError> {
    let patch = SongPatch { title: params.title, artist: params.artist, likes: params.likes };
    let song = db.update_song(&params.id, patch).await?;
    json_result(&song)
}

pub async fn like_impl(db: &Database, params: SongIdParams) -> Result<CallToolResult, McpError> {
    let song = db.like_song(&params.id).await?;
    json_result(&song)
}

pub async fn delete_impl(db: &Database, params: SongIdParams) -> Result<CallToolResult, McpError> {
    db.delete_song(&params.id).await?;
    tracing::debug!(id = %params.id, "song deleted");
    json_result(&SongsDeleteOutput { deleted: params.id })
}

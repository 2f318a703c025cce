//! YouTube Playlists and PlaylistItems API types.

use crate::model::{NewPlaylist, Playlist, PlaylistVideo, PrivacyStatus};
use crate::youtube_api::types::{ListResponse, ResourceId};
use serde::{Deserialize, Serialize};

/// Response structure for the `playlists.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/list>
pub type PlaylistListResponse = ListResponse<PlaylistResource>;

/// A `playlist` resource.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistSnippet,
    /// Absent when the request did not ask for the `status` part.
    pub status: Option<PlaylistStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistStatus {
    #[serde(rename = "privacyStatus")]
    pub privacy_status: PrivacyStatus,
}

impl From<PlaylistResource> for Playlist {
    fn from(playlist: PlaylistResource) -> Self {
        Playlist {
            playlist_id: playlist.id,
            title: playlist.snippet.title,
            description: playlist.snippet.description,
            privacy_status: playlist
                .status
                .map(|s| s.privacy_status)
                .unwrap_or_default(),
        }
    }
}

/// Request body for `playlists.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistInsertRequest {
    pub snippet: PlaylistSnippet,
    pub status: PlaylistStatus,
}

impl From<&NewPlaylist> for PlaylistInsertRequest {
    fn from(playlist: &NewPlaylist) -> Self {
        Self {
            snippet: PlaylistSnippet {
                title: playlist.title.clone(),
                description: playlist.description.clone(),
            },
            status: PlaylistStatus {
                privacy_status: playlist.privacy_status,
            },
        }
    }
}

/// The part of a `playlists.insert` response we care about.
#[derive(Debug, Deserialize)]
pub struct InsertedPlaylist {
    pub id: String,
}

/// Response structure for the `playlistItems.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
pub type PlaylistItemListResponse = ListResponse<PlaylistItem>;

/// A `playlistItem` resource: one entry of a playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    /// Zero-based position of the entry within its playlist.
    #[serde(default)]
    pub position: u32,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl PlaylistItem {
    /// The video this entry refers to. An entry without a video id is handed back.
    pub fn into_video(self) -> Result<PlaylistVideo, Self> {
        let video_id = match (&self.content_details, &self.snippet.resource_id.video_id) {
            (Some(details), _) => details.video_id.clone(),
            (None, Some(video_id)) => video_id.clone(),
            (None, None) => return Err(self),
        };
        Ok(PlaylistVideo {
            video_id,
            title: self.snippet.title,
            position: self.snippet.position,
        })
    }
}

/// Request body for `playlistItems.insert`. Without a position, the video is appended.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistItemInsertRequest {
    pub snippet: PlaylistItemInsertSnippet,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItemInsertSnippet {
    #[serde(rename = "playlistId")]
    pub playlist_id: String,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

impl PlaylistItemInsertRequest {
    pub fn new(playlist_id: &str, video_id: &str) -> Self {
        Self {
            snippet: PlaylistItemInsertSnippet {
                playlist_id: playlist_id.to_string(),
                resource_id: ResourceId::video(video_id),
            },
        }
    }
}

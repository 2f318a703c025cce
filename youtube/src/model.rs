//! Account items that can be copied between YouTube accounts.
//!
//! These are the engine's view of the provider's resources: just the fields needed to
//! recognise an item on the destination and to recreate it there. The wire formats live in
//! [`crate::youtube_api`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A category of transferable account data.
///
/// The declaration order is the order in which a multi-domain transfer processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Subscriptions,
    LikedVideos,
    Playlists,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Subscriptions, Domain::LikedVideos, Domain::Playlists];
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Subscriptions => f.write_str("subscriptions"),
            Domain::LikedVideos => f.write_str("liked videos"),
            Domain::Playlists => f.write_str("playlists"),
        }
    }
}

/// Something the orchestrator can look up in a destination index and report on.
pub trait Item {
    /// The value that identifies this item on any account.
    fn key(&self) -> &str;
    /// Human-readable label used in reports.
    fn title(&self) -> &str;
}

/// A channel the account is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionItem {
    pub channel_id: String,
    pub channel_title: String,
}

impl Item for SubscriptionItem {
    fn key(&self) -> &str {
        &self.channel_id
    }

    fn title(&self) -> &str {
        &self.channel_title
    }
}

/// A video the account has rated "like".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikedVideo {
    pub video_id: String,
    pub title: String,
}

impl Item for LikedVideo {
    fn key(&self) -> &str {
        &self.video_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// Visibility of a playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Public,
    Unlisted,
}

/// A playlist owned by the account.
///
/// Its videos are listed separately, see [`crate::enumerate::playlist_videos`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub privacy_status: PrivacyStatus,
}

impl Item for Playlist {
    fn key(&self) -> &str {
        &self.playlist_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// One entry of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistVideo {
    pub video_id: String,
    pub title: String,
    /// Zero-based position in the source playlist.
    pub position: u32,
}

impl Item for PlaylistVideo {
    fn key(&self) -> &str {
        &self.video_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// What is needed to create a playlist shell on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlaylist {
    pub title: String,
    pub description: String,
    pub privacy_status: PrivacyStatus,
}

/// One page of a listing endpoint.
#[derive(Debug)]
pub struct Page<T> {
    pub items: std::collections::VecDeque<T>,
    pub next_page_token: Option<String>,
}

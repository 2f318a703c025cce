//! Deciding whether an item already exists on the destination account.
//!
//! The destination is listed once per run and kept in memory: the set does not change under
//! us except through our own creates, which are recorded with [`ExistingIndex::insert`]. That
//! costs one list call per page instead of one lookup call per source item.

use crate::enumerate;
use crate::gateway::{Gateway, GatewayError, YouTubeApi};
use crate::model::Item;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Keys of the items present on the destination.
#[derive(Debug, Default, Clone)]
pub struct ExistingIndex {
    keys: HashSet<String>,
}

impl ExistingIndex {
    pub fn from_items<T: Item>(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            keys: items.into_iter().map(|i| i.key().to_string()).collect(),
        }
    }

    pub fn contains(&self, item: &impl Item) -> bool {
        self.keys.contains(item.key())
    }

    /// Records an item created during this run.
    pub fn insert(&mut self, item: &impl Item) {
        self.keys.insert(item.key().to_string());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Channels the destination is already subscribed to.
pub async fn existing_subscriptions<A: YouTubeApi>(
    dest: &Gateway<'_, A>,
    page_size: u32,
) -> Result<ExistingIndex, GatewayError> {
    let items = enumerate::collect_all(enumerate::subscriptions(dest, page_size)).await?;
    tracing::debug!(count = items.len(), "indexed destination subscriptions");
    Ok(ExistingIndex::from_items(items))
}

/// Videos the destination has already liked.
pub async fn existing_likes<A: YouTubeApi>(
    dest: &Gateway<'_, A>,
    page_size: u32,
) -> Result<ExistingIndex, GatewayError> {
    let items = enumerate::collect_all(enumerate::liked_videos(dest, page_size)).await?;
    tracing::debug!(count = items.len(), "indexed destination likes");
    Ok(ExistingIndex::from_items(items))
}

/// Videos already in one of the destination's playlists.
pub async fn playlist_contents<A: YouTubeApi>(
    dest: &Gateway<'_, A>,
    playlist_id: &str,
    page_size: u32,
) -> Result<ExistingIndex, GatewayError> {
    let items =
        enumerate::collect_all(enumerate::playlist_videos(dest, playlist_id, page_size)).await?;
    tracing::debug!(playlist_id, count = items.len(), "indexed destination playlist");
    Ok(ExistingIndex::from_items(items))
}

/// How a source playlist is matched against the destination's playlists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaylistMatch {
    /// Titles must be identical.
    #[default]
    Exact,
    /// Titles must be identical ignoring case.
    CaseInsensitive,
}

impl PlaylistMatch {
    fn normalize<'t>(&self, title: &'t str) -> Cow<'t, str> {
        match self {
            PlaylistMatch::Exact => Cow::Borrowed(title),
            PlaylistMatch::CaseInsensitive => Cow::Owned(title.to_lowercase()),
        }
    }
}

/// The destination's playlists, looked up by title.
#[derive(Debug)]
pub struct PlaylistDirectory {
    by_title: HashMap<String, String>,
    matching: PlaylistMatch,
}

impl PlaylistDirectory {
    pub fn new(matching: PlaylistMatch) -> Self {
        Self {
            by_title: HashMap::new(),
            matching,
        }
    }

    pub async fn load<A: YouTubeApi>(
        dest: &Gateway<'_, A>,
        page_size: u32,
        matching: PlaylistMatch,
    ) -> Result<Self, GatewayError> {
        let mut directory = Self::new(matching);
        let playlists = enumerate::collect_all(enumerate::playlists(dest, page_size)).await?;
        for playlist in playlists {
            directory.insert(&playlist.title, &playlist.playlist_id);
        }
        tracing::debug!(count = directory.by_title.len(), "indexed destination playlists");
        Ok(directory)
    }

    /// The ID of the destination playlist matching `title`, if any.
    pub fn find(&self, title: &str) -> Option<&str> {
        self.by_title
            .get(self.matching.normalize(title).as_ref())
            .map(String::as_str)
    }

    /// Adds a playlist. When several share a title, the first one wins.
    pub fn insert(&mut self, title: &str, playlist_id: &str) {
        self.by_title
            .entry(self.matching.normalize(title).into_owned())
            .or_insert_with(|| playlist_id.to_string());
    }
}

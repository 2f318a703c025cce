//! In-memory YouTube account for exercising the transfer engine without the network.
//!
//! A [`MockAccount`] keeps subscriptions, likes and playlists in memory, pages through them the
//! way the real API does (numeric page tokens), and counts every call so tests can assert on
//! how much work the engine did. Failures can be scripted per call or per item.

use crate::gateway::{GatewayError, YouTubeApi};
use crate::model::{
    LikedVideo, NewPlaylist, Page, Playlist, PlaylistVideo, PrivacyStatus, SubscriptionItem,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    subscriptions: Vec<SubscriptionItem>,
    liked: Vec<LikedVideo>,
    playlists: Vec<(Playlist, Vec<PlaylistVideo>)>,
    next_playlist: usize,

    /// Consumed front to back by create calls before anything else is checked.
    create_failures: VecDeque<GatewayError>,
    /// Consumed front to back by list calls.
    list_failures: VecDeque<GatewayError>,
    /// Creates touching these keys always fail.
    item_failures: HashMap<String, GatewayError>,
    /// Number of create calls allowed before the quota runs out.
    quota_after: Option<usize>,

    create_attempts: usize,
    subscription_inserts: usize,
    list_calls: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MockAccount {
    state: Mutex<State>,
}

fn page_of<T: Clone>(items: &[T], max_results: u32, page_token: Option<String>) -> Page<T> {
    let start = page_token.map_or(0, |t| t.parse::<usize>().expect("mock page token"));
    let end = (start + max_results as usize).min(items.len());
    Page {
        items: items[start..end].iter().cloned().collect(),
        next_page_token: (end < items.len()).then(|| end.to_string()),
    }
}

impl MockAccount {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    pub(crate) fn with_subscriptions(self, channels: &[&str]) -> Self {
        self.state()
            .subscriptions
            .extend(channels.iter().map(|id| SubscriptionItem {
                channel_id: id.to_string(),
                channel_title: format!("Channel {id}"),
            }));
        self
    }

    pub(crate) fn with_liked(self, videos: &[&str]) -> Self {
        self.state().liked.extend(videos.iter().map(|id| LikedVideo {
            video_id: id.to_string(),
            title: format!("Video {id}"),
        }));
        self
    }

    pub(crate) fn with_playlist(self, title: &str, videos: &[&str]) -> Self {
        {
            let mut state = self.state();
            state.next_playlist += 1;
            let playlist = Playlist {
                playlist_id: format!("PL{}", state.next_playlist),
                title: title.to_string(),
                description: format!("{title} description"),
                privacy_status: PrivacyStatus::Public,
            };
            let entries = videos
                .iter()
                .enumerate()
                .map(|(position, id)| PlaylistVideo {
                    video_id: id.to_string(),
                    title: format!("Video {id}"),
                    position: position as u32,
                })
                .collect();
            state.playlists.push((playlist, entries));
        }
        self
    }

    pub(crate) fn fail_next_creates(&self, errors: impl IntoIterator<Item = GatewayError>) {
        self.state().create_failures.extend(errors);
    }

    pub(crate) fn fail_next_lists(&self, errors: impl IntoIterator<Item = GatewayError>) {
        self.state().list_failures.extend(errors);
    }

    pub(crate) fn fail_item(&self, key: &str, error: GatewayError) {
        self.state().item_failures.insert(key.to_string(), error);
    }

    /// The create call after the first `creates` ones reports [`GatewayError::QuotaExceeded`],
    /// and so does every call after it.
    pub(crate) fn quota_after(&self, creates: usize) {
        self.state().quota_after = Some(creates);
    }

    pub(crate) fn create_attempts(&self) -> usize {
        self.state().create_attempts
    }

    pub(crate) fn subscription_inserts(&self) -> usize {
        self.state().subscription_inserts
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub(crate) fn is_subscribed(&self, channel_id: &str) -> bool {
        self.state()
            .subscriptions
            .iter()
            .any(|s| s.channel_id == channel_id)
    }

    pub(crate) fn subscribed_ids(&self) -> Vec<String> {
        self.state()
            .subscriptions
            .iter()
            .map(|s| s.channel_id.clone())
            .collect()
    }

    pub(crate) fn liked_ids(&self) -> Vec<String> {
        self.state()
            .liked
            .iter()
            .map(|v| v.video_id.clone())
            .collect()
    }

    pub(crate) fn playlist_titles(&self) -> Vec<String> {
        self.state()
            .playlists
            .iter()
            .map(|(p, _)| p.title.clone())
            .collect()
    }

    pub(crate) fn playlist(&self, title: &str) -> Option<(Playlist, Vec<String>)> {
        self.state()
            .playlists
            .iter()
            .find(|(p, _)| p.title == title)
            .map(|(p, videos)| {
                (
                    p.clone(),
                    videos.iter().map(|v| v.video_id.clone()).collect(),
                )
            })
    }

    /// Bookkeeping shared by every create call.
    fn attempt_create(&self, key: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.create_attempts += 1;
        if let Some(error) = state.create_failures.pop_front() {
            return Err(error);
        }
        if state
            .quota_after
            .is_some_and(|allowed| state.create_attempts > allowed)
        {
            return Err(GatewayError::QuotaExceeded);
        }
        if let Some(error) = state.item_failures.get(key) {
            return Err(error.clone());
        }
        Ok(())
    }

    fn attempt_list(&self) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.list_calls += 1;
        match state.list_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl YouTubeApi for MockAccount {
    async fn list_subscriptions(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<SubscriptionItem>, GatewayError> {
        self.attempt_list()?;
        Ok(page_of(&self.state().subscriptions, max_results, page_token))
    }

    async fn insert_subscription(&self, channel_id: &str) -> Result<(), GatewayError> {
        self.attempt_create(channel_id)?;
        let mut state = self.state();
        state.subscription_inserts += 1;
        state.subscriptions.push(SubscriptionItem {
            channel_id: channel_id.to_string(),
            channel_title: format!("Channel {channel_id}"),
        });
        Ok(())
    }

    async fn list_liked_videos(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<LikedVideo>, GatewayError> {
        self.attempt_list()?;
        Ok(page_of(&self.state().liked, max_results, page_token))
    }

    async fn rate_video(&self, video_id: &str) -> Result<(), GatewayError> {
        self.attempt_create(video_id)?;
        let mut state = self.state();
        if !state.liked.iter().any(|v| v.video_id == video_id) {
            state.liked.push(LikedVideo {
                video_id: video_id.to_string(),
                title: format!("Video {video_id}"),
            });
        }
        Ok(())
    }

    async fn list_playlists(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<Playlist>, GatewayError> {
        self.attempt_list()?;
        let playlists: Vec<_> = self
            .state()
            .playlists
            .iter()
            .map(|(p, _)| p.clone())
            .collect();
        Ok(page_of(&playlists, max_results, page_token))
    }

    async fn insert_playlist(&self, playlist: &NewPlaylist) -> Result<String, GatewayError> {
        self.attempt_create(&playlist.title)?;
        let mut state = self.state();
        state.next_playlist += 1;
        let playlist_id = format!("PL{}", state.next_playlist);
        state.playlists.push((
            Playlist {
                playlist_id: playlist_id.clone(),
                title: playlist.title.clone(),
                description: playlist.description.clone(),
                privacy_status: playlist.privacy_status,
            },
            Vec::new(),
        ));
        Ok(playlist_id)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<PlaylistVideo>, GatewayError> {
        self.attempt_list()?;
        let state = self.state();
        let Some((_, videos)) = state
            .playlists
            .iter()
            .find(|(p, _)| p.playlist_id == playlist_id)
        else {
            return Err(GatewayError::NotFound(format!("playlist {playlist_id}")));
        };
        Ok(page_of(videos, max_results, page_token))
    }

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), GatewayError> {
        self.attempt_create(video_id)?;
        let mut state = self.state();
        let Some((_, videos)) = state
            .playlists
            .iter_mut()
            .find(|(p, _)| p.playlist_id == playlist_id)
        else {
            return Err(GatewayError::NotFound(format!("playlist {playlist_id}")));
        };
        let position = videos.len() as u32;
        videos.push(PlaylistVideo {
            video_id: video_id.to_string(),
            title: format!("Video {video_id}"),
            position,
        });
        Ok(())
    }
}

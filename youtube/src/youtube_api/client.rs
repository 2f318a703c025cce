//! Core YouTube API client functionality and authentication management.

use crate::gateway::{GatewayError, YouTubeApi, classify_response};
use crate::model::{LikedVideo, NewPlaylist, Page, Playlist, PlaylistVideo, SubscriptionItem};
use crate::oauth::OAuthManager;
use crate::youtube_api::{
    channels::{Channel, ChannelListResponse},
    playlists::{
        InsertedPlaylist, PlaylistInsertRequest, PlaylistItem, PlaylistItemInsertRequest,
        PlaylistItemListResponse, PlaylistListResponse,
    },
    subscriptions::{Subscription, SubscriptionInsertRequest, SubscriptionListResponse},
    videos::{RATING_LIKE, VideoListResponse},
};
use eyre::Context;
use http::Method;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::instrument;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Creates a token that is already considered expired, forcing a refresh before first use.
    ///
    /// Tokens loaded from disk start out this way since we don't know when they were issued.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Creates a token whose expiry is computed from its `expires_in`, minus a 5-minute buffer.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Refreshes this token using the provided OAuth manager, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(&self.token)
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);

                // Google usually omits the refresh token from refresh responses.
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                }

                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Uses the current time + expires_in - 5 minutes, or 55 minutes if expires_in is missing.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(Duration::from_secs(300)),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// Client for one account on the YouTube Data API v3.
///
/// The client refreshes its access token before a request whenever the token is within five
/// minutes of expiring. Clones share the same token.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    /// OAuth manager for refreshing tokens (shared across clients)
    oauth_manager: Arc<OAuthManager>,
    client: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(
        token: TimeBoundAccessToken,
        oauth_manager: Arc<OAuthManager>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
            client,
        }
    }

    /// Returns a clone of the underlying OAuth2 token, e.g. for saving it to disk.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::debug!("access token expired, attempting refresh");
            if !token.refresh(&self.oauth_manager).await? {
                eyre::bail!("unable to refresh expired access token");
            }
            tracing::debug!("access token successfully refreshed");
        }

        Ok(token.token.access_token().secret().to_string())
    }

    /// Makes an authenticated HTTP request to the YouTube API.
    ///
    /// Non-success responses are turned into a [`GatewayError`] with [`classify_response`].
    /// Failing to obtain a fresh access token is reported as [`GatewayError::AuthExpired`].
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&(impl Serialize + Sync)>,
    ) -> Result<reqwest::Response, GatewayError> {
        let access_token = self
            .fresh_access_token()
            .await
            .map_err(|e| GatewayError::AuthExpired(format!("{e:#}")))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params);

        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("{method} {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_response(status.as_u16(), &body);
            tracing::debug!(%method, url, %status, error = %error, "YouTube API request failed");
            return Err(error);
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let url = format!("{API_BASE}/{resource}");
        let response = self
            .make_authenticated_request(Method::GET, &url, query_params, None::<&()>)
            .await?;
        read_json(response, resource).await
    }

    async fn post(
        &self,
        resource: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&(impl Serialize + Sync)>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{API_BASE}/{resource}");
        self.make_authenticated_request(Method::POST, &url, query_params, json_body)
            .await
    }

    /// Fetches one page of a list endpoint.
    async fn list_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        part: &str,
        extra: &[(&str, &str)],
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<T, GatewayError> {
        let max_results_string = max_results.to_string();
        let mut query_params = vec![("part", part), ("maxResults", max_results_string.as_str())];
        query_params.extend_from_slice(extra);

        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
        }

        self.get(resource, &query_params).await
    }

    /// The channel that belongs to the authorized account.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn my_channel(&self) -> Result<Channel, GatewayError> {
        let channels: ChannelListResponse = self
            .list_page("channels", "id,snippet", &[("mine", "true")], 1, None)
            .await?;
        channels.items.into_iter().next().ok_or_else(|| {
            GatewayError::NotFound("the authorized account has no YouTube channel".to_string())
        })
    }
}

/// Reads a success response body and decodes it.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, GatewayError> {
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("read {resource} response: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| GatewayError::Decode(format!("parse {resource} response: {e}")))
}

impl YouTubeApi for YouTubeClient {
    /// <https://developers.google.com/youtube/v3/docs/subscriptions/list>
    async fn list_subscriptions(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<SubscriptionItem>, GatewayError> {
        let response: SubscriptionListResponse = self
            .list_page(
                "subscriptions",
                "snippet",
                &[("mine", "true")],
                max_results,
                page_token.as_deref(),
            )
            .await?;
        tracing::debug!(
            total_results = response.page_info.total_results,
            returned_items = response.items.len(),
            "fetched subscriptions"
        );
        Ok(response.into_page(Subscription::into_item))
    }

    /// <https://developers.google.com/youtube/v3/docs/subscriptions/insert>
    async fn insert_subscription(&self, channel_id: &str) -> Result<(), GatewayError> {
        self.post(
            "subscriptions",
            &[("part", "snippet")],
            Some(&SubscriptionInsertRequest::new(channel_id)),
        )
        .await?;
        Ok(())
    }

    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    async fn list_liked_videos(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<LikedVideo>, GatewayError> {
        let response: VideoListResponse = self
            .list_page(
                "videos",
                "id,snippet",
                &[("myRating", RATING_LIKE)],
                max_results,
                page_token.as_deref(),
            )
            .await?;
        tracing::debug!(
            total_results = response.page_info.total_results,
            returned_items = response.items.len(),
            "fetched liked videos"
        );
        Ok(response.into_page(|v| Ok(LikedVideo::from(v))))
    }

    /// <https://developers.google.com/youtube/v3/docs/videos/rate>
    async fn rate_video(&self, video_id: &str) -> Result<(), GatewayError> {
        self.post(
            "videos/rate",
            &[("id", video_id), ("rating", RATING_LIKE)],
            None::<&()>,
        )
        .await?;
        Ok(())
    }

    /// <https://developers.google.com/youtube/v3/docs/playlists/list>
    async fn list_playlists(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<Playlist>, GatewayError> {
        let response: PlaylistListResponse = self
            .list_page(
                "playlists",
                "snippet,status",
                &[("mine", "true")],
                max_results,
                page_token.as_deref(),
            )
            .await?;
        tracing::debug!(
            total_results = response.page_info.total_results,
            returned_items = response.items.len(),
            "fetched playlists"
        );
        Ok(response.into_page(|p| Ok(Playlist::from(p))))
    }

    /// <https://developers.google.com/youtube/v3/docs/playlists/insert>
    async fn insert_playlist(&self, playlist: &NewPlaylist) -> Result<String, GatewayError> {
        let response = self
            .post(
                "playlists",
                &[("part", "snippet,status")],
                Some(&PlaylistInsertRequest::from(playlist)),
            )
            .await?;
        let inserted: InsertedPlaylist = read_json(response, "playlists").await?;
        Ok(inserted.id)
    }

    /// <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<PlaylistVideo>, GatewayError> {
        let response: PlaylistItemListResponse = self
            .list_page(
                "playlistItems",
                "snippet,contentDetails",
                &[("playlistId", playlist_id)],
                max_results,
                page_token.as_deref(),
            )
            .await?;
        tracing::debug!(
            playlist_id,
            total_results = response.page_info.total_results,
            returned_items = response.items.len(),
            "fetched playlist items"
        );
        Ok(response.into_page(PlaylistItem::into_video))
    }

    /// <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), GatewayError> {
        self.post(
            "playlistItems",
            &[("part", "snippet")],
            Some(&PlaylistItemInsertRequest::new(playlist_id, video_id)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2::basic::BasicTokenType;
    use oauth2::{AccessToken, EmptyExtraTokenFields, RefreshToken};

    fn token(expires_in: Option<Duration>) -> BasicTokenResponse {
        let mut token = BasicTokenResponse::new(
            AccessToken::new("access".to_string()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_expires_in(expires_in.as_ref());
        token.set_refresh_token(Some(RefreshToken::new("refresh".to_string())));
        token
    }

    #[test]
    fn loaded_tokens_start_expired() {
        assert!(TimeBoundAccessToken::expired(token(Some(Duration::from_secs(3600)))).is_expired());
    }

    #[test]
    fn fresh_token_keeps_a_safety_buffer() {
        let fresh = TimeBoundAccessToken::new(token(Some(Duration::from_secs(3600))));
        assert!(!fresh.is_expired());

        // Less than the buffer left counts as expired right away.
        let nearly_gone = TimeBoundAccessToken::new(token(Some(Duration::from_secs(60))));
        assert!(nearly_gone.is_expired());
    }

    #[test]
    fn missing_expiry_assumes_an_hour() {
        assert!(!TimeBoundAccessToken::new(token(None)).is_expired());
    }
}

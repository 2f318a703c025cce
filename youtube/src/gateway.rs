//! Quota-aware access to the YouTube Data API.
//!
//! Everything the transfer engine does to an account goes through a [`Gateway`], which wraps an
//! implementation of [`YouTubeApi`] and adds three things on top of the raw calls:
//!
//! - responses are classified into a typed [`GatewayError`] instead of opaque HTTP failures,
//! - transient failures ([`GatewayError::RateLimited`] and [`GatewayError::Transport`]) are retried
//!   with bounded exponential backoff, while [`GatewayError::QuotaExceeded`] is surfaced
//!   immediately,
//! - every attempt is charged against a [`QuotaLedger`] using the provider's fixed unit costs.
//!
//! See: <https://developers.google.com/youtube/v3/determine_quota_cost>

use crate::model::{LikedVideo, NewPlaylist, Page, Playlist, PlaylistVideo, SubscriptionItem};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Error reasons that mean the daily unit budget is gone.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

/// Error reasons that mean "slow down", not "stop".
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Error reasons the provider uses when the thing we tried to create already exists.
const DUPLICATE_REASONS: &[&str] = &["subscriptionDuplicate", "duplicate"];

/// The narrow set of authorized calls the transfer engine needs from one account.
///
/// [`crate::youtube_api::YouTubeClient`] implements this against the real API; tests use an
/// in-memory account. Implementations report failures already classified as [`GatewayError`],
/// typically through [`classify_response`].
pub trait YouTubeApi: Sync {
    /// `subscriptions.list` with `mine=true`.
    fn list_subscriptions(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<SubscriptionItem>, GatewayError>> + Send;

    /// `subscriptions.insert` for the given channel.
    fn insert_subscription(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// `videos.list` with `myRating=like`.
    fn list_liked_videos(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<LikedVideo>, GatewayError>> + Send;

    /// `videos.rate` with `rating=like`.
    fn rate_video(&self, video_id: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// `playlists.list` with `mine=true`.
    fn list_playlists(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Playlist>, GatewayError>> + Send;

    /// `playlists.insert`, returning the ID of the new playlist.
    fn insert_playlist(
        &self,
        playlist: &NewPlaylist,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// `playlistItems.list` for one playlist.
    fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<PlaylistVideo>, GatewayError>> + Send;

    /// `playlistItems.insert`, appending the video to the end of the playlist.
    fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// A provider operation, used for quota accounting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSubscriptions,
    InsertSubscription,
    ListLikedVideos,
    RateVideo,
    ListPlaylists,
    InsertPlaylist,
    ListPlaylistItems,
    InsertPlaylistItem,
}

impl Operation {
    /// Quota units the provider charges for one call.
    pub fn cost(self) -> u64 {
        match self {
            Operation::ListSubscriptions
            | Operation::ListLikedVideos
            | Operation::ListPlaylists
            | Operation::ListPlaylistItems => 1,
            Operation::InsertSubscription
            | Operation::RateVideo
            | Operation::InsertPlaylist
            | Operation::InsertPlaylistItem => 50,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListSubscriptions => "subscriptions.list",
            Operation::InsertSubscription => "subscriptions.insert",
            Operation::ListLikedVideos => "videos.list",
            Operation::RateVideo => "videos.rate",
            Operation::ListPlaylists => "playlists.list",
            Operation::InsertPlaylist => "playlists.insert",
            Operation::ListPlaylistItems => "playlistItems.list",
            Operation::InsertPlaylistItem => "playlistItems.insert",
        };
        f.write_str(name)
    }
}

/// A classified failure of one provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("daily API quota exceeded")]
    QuotaExceeded,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("authorization expired: {0}")]
    AuthExpired(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed API response: {0}")]
    Decode(String),

    #[error("unexpected HTTP status {status}: {message}")]
    Unknown { status: u16, message: String },
}

/// The variant of a [`GatewayError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    QuotaExceeded,
    RateLimited,
    NotFound,
    Forbidden,
    AuthExpired,
    Duplicate,
    Transport,
    Decode,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::QuotaExceeded => "quota exceeded",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::NotFound => "not found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AuthExpired => "authorization expired",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "malformed response",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::QuotaExceeded => ErrorKind::QuotaExceeded,
            GatewayError::RateLimited(_) => ErrorKind::RateLimited,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Forbidden(_) => ErrorKind::Forbidden,
            GatewayError::AuthExpired(_) => ErrorKind::AuthExpired,
            GatewayError::Duplicate(_) => ErrorKind::Duplicate,
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Decode(_) => ErrorKind::Decode,
            GatewayError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Whether retrying the same call later has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited(_) | GatewayError::Transport(_)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// The `error` object of a Google API error response.
///
/// See: <https://developers.google.com/youtube/v3/docs/errors>
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Classify a non-success response by HTTP status and response body.
///
/// The body's `error.errors[].reason` codes take precedence over the status, since the
/// provider reports both quota exhaustion and rate limiting as `403 Forbidden`.
pub fn classify_response(status: u16, body: &str) -> GatewayError {
    let (message, reasons) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.message,
            envelope
                .error
                .errors
                .into_iter()
                .map(|detail| detail.reason)
                .collect::<Vec<_>>(),
        ),
        Err(_) => (body.trim().to_string(), Vec::new()),
    };
    let has_reason = |wanted: &[&str]| reasons.iter().any(|r| wanted.contains(&r.as_str()));

    if has_reason(QUOTA_REASONS) {
        return GatewayError::QuotaExceeded;
    }
    if status == 429 || has_reason(RATE_LIMIT_REASONS) {
        return GatewayError::RateLimited(message);
    }
    if status == 409 || has_reason(DUPLICATE_REASONS) {
        return GatewayError::Duplicate(message);
    }
    match status {
        401 => GatewayError::AuthExpired(message),
        403 => GatewayError::Forbidden(message),
        404 => GatewayError::NotFound(message),
        500..=599 => GatewayError::Transport(format!("HTTP {status}: {message}")),
        _ => GatewayError::Unknown { status, message },
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each attempt after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// How long to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Running total of quota units charged by one gateway.
#[derive(Debug, Default)]
pub struct QuotaLedger {
    units: AtomicU64,
    calls: AtomicU64,
}

impl QuotaLedger {
    fn charge(&self, operation: Operation) {
        self.units.fetch_add(operation.cost(), Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Units charged so far.
    pub fn units(&self) -> u64 {
        self.units.load(Ordering::Relaxed)
    }

    /// Calls attempted so far, retries included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

/// One account's [`YouTubeApi`] with retries and quota accounting.
#[derive(Debug)]
pub struct Gateway<'a, A> {
    api: &'a A,
    retry: RetryPolicy,
    ledger: QuotaLedger,
}

impl<'a, A: YouTubeApi> Gateway<'a, A> {
    pub fn new(api: &'a A, retry: RetryPolicy) -> Self {
        Self {
            api,
            retry,
            ledger: QuotaLedger::default(),
        }
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    /// Runs `request` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `QuotaExceeded` is returned on first sight.
    async fn call<T, F, Fut>(&self, operation: Operation, mut request: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.ledger.charge(operation);
            match request().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        %operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient API failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(GatewayError::QuotaExceeded) => {
                    tracing::error!(%operation, "API quota exhausted");
                    return Err(GatewayError::QuotaExceeded);
                }
                Err(e) => {
                    tracing::debug!(%operation, attempt, error = %e, "API call failed");
                    return Err(e);
                }
            }
        }
    }

    pub async fn list_subscriptions(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<SubscriptionItem>, GatewayError> {
        self.call(Operation::ListSubscriptions, || {
            self.api.list_subscriptions(max_results, page_token.clone())
        })
        .await
    }

    pub async fn insert_subscription(&self, channel_id: &str) -> Result<(), GatewayError> {
        self.call(Operation::InsertSubscription, || {
            self.api.insert_subscription(channel_id)
        })
        .await
    }

    pub async fn list_liked_videos(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<LikedVideo>, GatewayError> {
        self.call(Operation::ListLikedVideos, || {
            self.api.list_liked_videos(max_results, page_token.clone())
        })
        .await
    }

    pub async fn rate_video(&self, video_id: &str) -> Result<(), GatewayError> {
        self.call(Operation::RateVideo, || self.api.rate_video(video_id))
            .await
    }

    pub async fn list_playlists(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<Playlist>, GatewayError> {
        self.call(Operation::ListPlaylists, || {
            self.api.list_playlists(max_results, page_token.clone())
        })
        .await
    }

    pub async fn insert_playlist(&self, playlist: &NewPlaylist) -> Result<String, GatewayError> {
        self.call(Operation::InsertPlaylist, || self.api.insert_playlist(playlist))
            .await
    }

    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<Page<PlaylistVideo>, GatewayError> {
        self.call(Operation::ListPlaylistItems, || {
            self.api
                .list_playlist_items(playlist_id, max_results, page_token.clone())
        })
        .await
    }

    pub async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), GatewayError> {
        self.call(Operation::InsertPlaylistItem, || {
            self.api.insert_playlist_item(playlist_id, video_id)
        })
        .await
    }
}

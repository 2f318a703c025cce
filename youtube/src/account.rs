//! Connecting to the two accounts of a transfer.

use crate::oauth::OAuthManager;
use crate::report::Side;
use crate::youtube_api::channels::Channel;
use crate::youtube_api::{TimeBoundAccessToken, YouTubeClient};
use eyre::Context;
use oauth2::basic::BasicTokenResponse;
use std::path::Path;
use std::sync::Arc;

/// An authorized client together with the channel it acts as.
#[derive(Debug, Clone)]
pub struct Account {
    pub side: Side,
    pub channel: Channel,
    pub yt: YouTubeClient,
}

impl Account {
    /// A name for this account that is stable across runs.
    pub fn key(&self) -> &str {
        &self.channel.id
    }

    /// Writes the client's current token to `path` so the next run can skip the browser.
    pub async fn save_token(&self, path: &Path) -> eyre::Result<()> {
        save_token(path, &self.yt.token().await).await
    }
}

/// Reads a stored token. A missing or unreadable file means there is no usable token.
pub async fn load_token(path: &Path) -> eyre::Result<Option<BasicTokenResponse>> {
    if !tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("check for token file {}", path.display()))?
    {
        return Ok(None);
    }
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read token file {}", path.display()))?;
    match serde_json::from_str(&contents) {
        Ok(token) => Ok(Some(token)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable token file");
            Ok(None)
        }
    }
}

pub async fn save_token(path: &Path, token: &BasicTokenResponse) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(token).context("serialize token")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("write token file {}", path.display()))
}

/// Produces a ready-to-use client for one side of the transfer.
///
/// A stored token is refreshed right away, so a revoked grant is noticed here rather than in
/// the middle of a transfer. Without a usable token, the user is sent through the browser
/// flow. Either way the new token is written back to `token_path`.
#[tracing::instrument(skip(token_path, oauth_manager, http), fields(token_path = %token_path.display()))]
pub async fn connect(
    side: Side,
    token_path: &Path,
    oauth_manager: Arc<OAuthManager>,
    http: reqwest::Client,
) -> eyre::Result<Account> {
    let stored = load_token(token_path).await?;

    let mut token = None;
    if let Some(stored) = stored {
        tracing::info!("refreshing stored token");
        let mut stored = TimeBoundAccessToken::expired(stored);
        if stored
            .refresh(&oauth_manager)
            .await
            .context("refresh stored token")?
        {
            token = Some(stored);
        } else {
            tracing::warn!("stored token no longer valid, need to re-authorize");
        }
    }

    let token = match token {
        Some(token) => token,
        None => {
            eprintln!("Sign in with the {side} account in your browser.");
            let raw = oauth_manager
                .authenticate()
                .await
                .with_context(|| format!("authorize {side} account"))?;
            TimeBoundAccessToken::new(raw)
        }
    };

    let yt = YouTubeClient::new(token, oauth_manager, http);
    // Doubles as a check that the token is accepted.
    let channel = yt
        .my_channel()
        .await
        .with_context(|| format!("look up {side} channel"))?;
    tracing::info!(channel_id = %channel.id, title = %channel.snippet.title, "connected");

    let account = Account { side, channel, yt };
    account.save_token(token_path).await?;
    Ok(account)
}

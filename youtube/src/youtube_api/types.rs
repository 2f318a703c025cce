//! Common types shared across the YouTube Data API list endpoints.

use crate::model::Page;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Paging details for a list response.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions/list#pageInfo>
#[derive(Debug, Default, Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults", default)]
    pub total_results: u32,
}

/// The envelope every `*.list` call returns.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "VecDeque::new")]
    pub items: VecDeque<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page
    /// in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    /// Converts the wire items into engine items.
    ///
    /// Entries that `convert` hands back cannot be copied anywhere, so they are left out of the
    /// page with a warning.
    pub fn into_page<U>(self, mut convert: impl FnMut(T) -> Result<U, T>) -> Page<U>
    where
        T: fmt::Debug,
    {
        let mut items = VecDeque::with_capacity(self.items.len());
        for entry in self.items {
            match convert(entry) {
                Ok(item) => items.push_back(item),
                Err(rejected) => {
                    tracing::warn!(?rejected, "skipping list entry without a usable id");
                }
            }
        }
        Page {
            items,
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Identifies the resource a subscription or playlist item points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceId {
    /// The type of the referenced resource, e.g. `youtube#channel` or `youtube#video`.
    pub kind: String,
    #[serde(rename = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(rename = "videoId", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl ResourceId {
    pub fn channel(channel_id: &str) -> Self {
        Self {
            kind: "youtube#channel".to_string(),
            channel_id: Some(channel_id.to_string()),
            video_id: None,
        }
    }

    pub fn video(video_id: &str) -> Self {
        Self {
            kind: "youtube#video".to_string(),
            channel_id: None,
            video_id: Some(video_id.to_string()),
        }
    }
}

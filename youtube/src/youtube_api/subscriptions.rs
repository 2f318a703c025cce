//! YouTube Subscriptions API types.

use crate::model::SubscriptionItem;
use crate::youtube_api::types::{ListResponse, ResourceId};
use serde::{Deserialize, Serialize};

/// Response structure for the `subscriptions.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions/list>
pub type SubscriptionListResponse = ListResponse<Subscription>;

/// A `subscription` resource links the account to one channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Subscription {
    /// The ID of the subscription itself, not of the channel.
    pub id: String,
    pub snippet: SubscriptionSnippet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionSnippet {
    /// The subscribed channel's title.
    #[serde(default)]
    pub title: String,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

impl Subscription {
    /// The subscribed channel. A resource that does not point at one is handed back.
    pub fn into_item(self) -> Result<SubscriptionItem, Self> {
        match self.snippet.resource_id.channel_id {
            Some(channel_id) => Ok(SubscriptionItem {
                channel_id,
                channel_title: self.snippet.title,
            }),
            None => Err(self),
        }
    }
}

/// Request body for `subscriptions.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions/insert>
#[derive(Debug, Serialize)]
pub struct SubscriptionInsertRequest {
    pub snippet: SubscriptionInsertSnippet,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionInsertSnippet {
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

impl SubscriptionInsertRequest {
    pub fn new(channel_id: &str) -> Self {
        Self {
            snippet: SubscriptionInsertSnippet {
                resource_id: ResourceId::channel(channel_id),
            },
        }
    }
}

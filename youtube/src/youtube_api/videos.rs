//! YouTube Videos API types.

use crate::model::LikedVideo;
use crate::youtube_api::types::ListResponse;
use serde::{Deserialize, Serialize};

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
pub type VideoListResponse = ListResponse<Video>;

/// A `video` resource, reduced to what is needed to identify a liked video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    /// Absent when the request did not ask for the `snippet` part.
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
}

impl From<Video> for LikedVideo {
    fn from(video: Video) -> Self {
        LikedVideo {
            title: video.snippet.map(|s| s.title).unwrap_or_default(),
            video_id: video.id,
        }
    }
}

/// The `rating` value that marks a video as liked, for both `videos.rate` and the `myRating`
/// filter of `videos.list`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/rate>
pub const RATING_LIKE: &str = "like";

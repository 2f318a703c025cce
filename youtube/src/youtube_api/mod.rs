//! YouTube Data API v3 client and wire types.
//!
//! [`YouTubeClient`] is the production implementation of [`crate::gateway::YouTubeApi`]. The
//! submodules hold the JSON shapes of the resources it reads and writes, and their conversions
//! into the engine's [`crate::model`] types.

pub mod channels;
pub mod client;
pub mod playlists;
pub mod subscriptions;
pub mod types;
pub mod videos;

pub use client::{TimeBoundAccessToken, YouTubeClient};

//! Copy subscriptions, liked videos and playlists from one YouTube account to another.
//!
//! The engine ([`transfer`]) talks to each account only through the [`gateway::YouTubeApi`]
//! trait, which [`youtube_api::YouTubeClient`] implements against the YouTube Data API v3.
//! Runs are idempotent: anything already present on the destination is left alone, so an
//! interrupted or quota-limited transfer is resumed by simply running it again.
//!
//! ```no_run
//! # async fn run(
//! #     source: &youtube_transfer::youtube_api::YouTubeClient,
//! #     dest: &youtube_transfer::youtube_api::YouTubeClient,
//! # ) {
//! use youtube_transfer::{Domain, TransferPolicy, transfer};
//!
//! let summary = transfer(source, dest, &Domain::ALL, TransferPolicy::default()).await;
//! println!("{summary}");
//! # }
//! ```

pub mod account;
pub mod config;
pub mod enumerate;
pub mod gateway;
pub mod menu;
pub mod model;
pub mod oauth;
pub mod report;
pub mod resolve;
pub mod transfer;
pub mod youtube_api;

#[cfg(test)]
mod mock;

pub use gateway::{GatewayError, YouTubeApi};
pub use model::Domain;
pub use report::{TransferReport, TransferSummary};
pub use transfer::{Transfer, TransferLocks, TransferPolicy, transfer};

//! Lazy enumeration of cursor-paginated listings.
//!
//! Every listing endpoint the engine uses returns at most 50 items plus an optional
//! `nextPageToken`. [`PagedStream`] hides that behind a single [`Stream`] that fetches the next
//! page only once the current one has been drained. A failed page request (after the
//! gateway's own retries) ends the stream with that error; it is never mistaken for the end of
//! the listing.

use crate::gateway::{Gateway, GatewayError, YouTubeApi};
use crate::model::{LikedVideo, Page, Playlist, PlaylistVideo, SubscriptionItem};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::{Stream, StreamExt};

/// Largest page the YouTube Data API will return.
pub const MAX_PAGE_SIZE: u32 = 50;

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = Result<(F, Page<T>), GatewayError>> + 'a + Send>>;

/// A paginated stream that fetches subsequent pages from a list endpoint on demand.
///
/// Only forward pagination is supported. The stream is not restartable: to walk the listing
/// again, build a new one, which starts over from the first page.
pub struct PagedStream<'a, T, F> {
    /// Items of the most recent page not yet yielded
    current_items: VecDeque<T>,
    /// The in-flight page request, if any
    pending_request: Option<OneFuturePage<'a, F, T>>,
    is_done: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Creates a stream whose first poll requests the first page.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<Page<T>, GatewayError>> + Send + 'a,
    {
        let first_page = async move {
            let page = fetcher(None).await?;
            Ok((fetcher, page))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            current_items: VecDeque::new(),
            is_done: false,
        }
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<Page<T>, GatewayError>> + Send + 'a,
{
    type Item = Result<T, GatewayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if self.is_done {
                return Poll::Ready(None);
            }

            let Some(pending) = self.pending_request.as_mut() else {
                self.is_done = true;
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Ready(Ok((fetcher, page))) => {
                    self.current_items.extend(page.items);

                    if let Some(next_token) = page.next_page_token {
                        // Queued, but not polled until this page has been drained.
                        self.pending_request = Some(Box::pin(async move {
                            let page = fetcher(Some(next_token)).await?;
                            Ok((fetcher, page))
                        }));
                    } else {
                        self.is_done = true;
                        self.pending_request = None;
                    }
                    continue;
                }
                Poll::Ready(Err(e)) => {
                    self.pending_request = None;
                    self.is_done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// All channels the account is subscribed to.
pub fn subscriptions<'a, A: YouTubeApi>(
    gateway: &'a Gateway<'_, A>,
    page_size: u32,
) -> impl Stream<Item = Result<SubscriptionItem, GatewayError>> + 'a {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    PagedStream::new(move |page_token| gateway.list_subscriptions(page_size, page_token))
}

/// All videos the account has liked.
pub fn liked_videos<'a, A: YouTubeApi>(
    gateway: &'a Gateway<'_, A>,
    page_size: u32,
) -> impl Stream<Item = Result<LikedVideo, GatewayError>> + 'a {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    PagedStream::new(move |page_token| gateway.list_liked_videos(page_size, page_token))
}

/// All playlists the account owns.
pub fn playlists<'a, A: YouTubeApi>(
    gateway: &'a Gateway<'_, A>,
    page_size: u32,
) -> impl Stream<Item = Result<Playlist, GatewayError>> + 'a {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    PagedStream::new(move |page_token| gateway.list_playlists(page_size, page_token))
}

/// The entries of one playlist, in playlist order.
pub fn playlist_videos<'a, A: YouTubeApi>(
    gateway: &'a Gateway<'_, A>,
    playlist_id: &'a str,
    page_size: u32,
) -> impl Stream<Item = Result<PlaylistVideo, GatewayError>> + 'a {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    PagedStream::new(move |page_token| {
        gateway.list_playlist_items(playlist_id, page_size, page_token)
    })
}

/// Drains a listing, stopping at the first error.
pub async fn collect_all<T>(
    stream: impl Stream<Item = Result<T, GatewayError>>,
) -> Result<Vec<T>, GatewayError> {
    let mut stream = std::pin::pin!(stream);
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item?);
    }
    Ok(items)
}

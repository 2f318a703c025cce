//! The transfer orchestrator.
//!
//! For each requested [`Domain`], the orchestrator lists everything on the source account,
//! indexes what the destination already has, and then walks the source items in order:
//! items already present are skipped, the rest are created on the destination. Each item
//! yields exactly one [`Outcome`] in the domain's [`TransferReport`].
//!
//! Failure policy:
//!
//! - [`GatewayError::QuotaExceeded`] stops the whole run. The current domain is marked halted,
//!   its remaining items are counted as not attempted, and later domains are not started.
//! - Any other failure is recorded against the item and the loop moves on.
//! - A run of identical failures (see [`TransferPolicy::breaker_threshold`]) means the account
//!   rather than the item is the problem, so the domain is abandoned.
//!
//! Items are processed one at a time, in source order.

use crate::enumerate;
use crate::gateway::{ErrorKind, Gateway, GatewayError, RetryPolicy, YouTubeApi};
use crate::model::{Domain, Item, NewPlaylist, Playlist, PrivacyStatus};
use crate::report::{Halt, Ledger, Outcome, Side, TransferReport, TransferSummary};
use crate::resolve::{self, ExistingIndex, PlaylistDirectory, PlaylistMatch};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::Instrument;

/// Knobs for a transfer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferPolicy {
    /// Items requested per listing call (1-50).
    pub page_size: u32,
    /// Attempts per call for rate-limited or network failures, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled for each further retry.
    pub retry_base_delay_ms: u64,
    /// Consecutive identical failures that abandon a domain. 0 disables the breaker.
    pub breaker_threshold: u32,
    /// Pause after each successful create.
    pub pacing_ms: u64,
    /// Visibility of playlists created on the destination.
    pub playlist_privacy: PrivacyStatus,
    /// How source playlists are matched to existing destination playlists.
    pub playlist_match: PlaylistMatch,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            page_size: enumerate::MAX_PAGE_SIZE,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            breaker_threshold: 5,
            pacing_ms: 500,
            playlist_privacy: PrivacyStatus::Private,
            playlist_match: PlaylistMatch::Exact,
        }
    }
}

impl TransferPolicy {
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Trips after too many consecutive failures of one kind.
#[derive(Debug)]
struct Breaker {
    threshold: u32,
    last: Option<ErrorKind>,
    streak: u32,
}

impl Breaker {
    fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last: None,
            streak: 0,
        }
    }

    fn success(&mut self) {
        self.last = None;
        self.streak = 0;
    }

    /// Records a failure and returns the halt if the breaker trips.
    ///
    /// Missing resources say something about the item, not the account, so they never trip it.
    fn failure(&mut self, kind: ErrorKind) -> Option<Halt> {
        if kind == ErrorKind::NotFound {
            return None;
        }
        if self.last == Some(kind) {
            self.streak += 1;
        } else {
            self.last = Some(kind);
            self.streak = 1;
        }
        (self.threshold > 0 && self.streak >= self.threshold).then_some(Halt::CircuitOpen {
            kind,
            consecutive: self.streak,
        })
    }
}

/// How an item missing from the destination is created there, given its key.
#[derive(Debug, Clone, Copy)]
enum CreateStep<'a> {
    /// `key` is a channel id.
    Subscribe,
    /// `key` is a video id.
    Like,
    /// `key` is a video id, appended to the given destination playlist.
    AddToPlaylist(&'a str),
}

/// Copies account data from one account to another.
///
/// Both accounts are borrowed for the duration of the transfer and only used through their
/// [`YouTubeApi`] implementation.
#[derive(Debug)]
pub struct Transfer<'a, S, D> {
    source: Gateway<'a, S>,
    dest: Gateway<'a, D>,
    policy: TransferPolicy,
}

impl<'a, S: YouTubeApi, D: YouTubeApi> Transfer<'a, S, D> {
    pub fn new(source: &'a S, dest: &'a D, policy: TransferPolicy) -> Self {
        let retry = policy.retry();
        Self {
            source: Gateway::new(source, retry),
            dest: Gateway::new(dest, retry),
            policy,
        }
    }

    fn units_spent(&self) -> u64 {
        self.source.ledger().units() + self.dest.ledger().units()
    }

    /// Transfers every requested domain, in [`Domain`] order, and reports on each of them.
    ///
    /// Once a domain hits the quota, the domains after it are reported as halted without
    /// touching either account.
    pub async fn run(&self, domains: &[Domain]) -> TransferSummary {
        let started_at = Timestamp::now();
        let requested: BTreeSet<Domain> = domains.iter().copied().collect();
        let mut reports = Vec::with_capacity(requested.len());
        let mut quota_exhausted = false;

        for domain in requested {
            if quota_exhausted {
                tracing::info!(%domain, "not started, quota exhausted");
                let mut report = TransferReport::new(domain);
                report.halt = Some(Halt::QuotaExceeded);
                reports.push(report);
                continue;
            }

            let report = self
                .transfer_domain(domain)
                .instrument(tracing::info_span!("transfer", %domain))
                .await;
            tracing::info!(
                %domain,
                total = report.ledger.total,
                created = report.ledger.created,
                skipped = report.ledger.skipped,
                failed = report.ledger.failed,
                not_attempted = report.ledger.not_attempted,
                quota_units = report.quota_units,
                "domain finished"
            );
            quota_exhausted = report.halt == Some(Halt::QuotaExceeded);
            reports.push(report);
        }

        TransferSummary {
            started_at,
            finished_at: Timestamp::now(),
            reports,
        }
    }

    /// Transfers a single domain.
    pub async fn transfer_domain(&self, domain: Domain) -> TransferReport {
        let before = self.units_spent();
        let mut ledger = Ledger::default();
        let halt = match domain {
            Domain::Subscriptions => self.subscriptions(&mut ledger).await,
            Domain::LikedVideos => self.liked_videos(&mut ledger).await,
            Domain::Playlists => self.playlists(&mut ledger).await,
        };
        if let Some(halt) = &halt {
            tracing::warn!(?halt, "domain halted");
        }
        TransferReport {
            domain,
            ledger,
            halt,
            quota_units: self.units_spent() - before,
        }
    }

    async fn pace(&self) {
        if self.policy.pacing_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.policy.pacing_ms)).await;
        }
    }

    async fn create(&self, step: CreateStep<'_>, key: &str) -> Result<(), GatewayError> {
        match step {
            CreateStep::Subscribe => self.dest.insert_subscription(key).await,
            CreateStep::Like => self.dest.rate_video(key).await,
            CreateStep::AddToPlaylist(playlist_id) => {
                self.dest.insert_playlist_item(playlist_id, key).await
            }
        }
    }

    /// The per-item loop shared by every domain.
    ///
    /// Items missing from `existing` are created on the destination with `step`; successful
    /// creates are added to `existing` so a source listing that repeats an item does not create
    /// it twice.
    async fn replicate<T: Item>(
        &self,
        items: &[T],
        existing: &mut ExistingIndex,
        ledger: &mut Ledger,
        step: CreateStep<'_>,
    ) -> Option<Halt> {
        let mut breaker = Breaker::new(self.policy.breaker_threshold);
        for item in items {
            if existing.contains(item) {
                tracing::trace!(id = item.key(), "already on destination");
                ledger.record(item, Outcome::AlreadyExists);
                continue;
            }

            match self.create(step, item.key()).await {
                Ok(()) => {
                    tracing::debug!(id = item.key(), title = item.title(), "created");
                    existing.insert(item);
                    ledger.record(item, Outcome::Created);
                    breaker.success();
                    self.pace().await;
                }
                Err(GatewayError::Duplicate(_)) => {
                    existing.insert(item);
                    ledger.record(item, Outcome::AlreadyExists);
                }
                Err(GatewayError::QuotaExceeded) => {
                    ledger.abandon_remaining();
                    return Some(Halt::QuotaExceeded);
                }
                Err(e) => {
                    tracing::warn!(
                        id = item.key(),
                        title = item.title(),
                        error = %e,
                        "create failed"
                    );
                    ledger.record(item, Outcome::failed(&e));
                    if let Some(halt) = breaker.failure(e.kind()) {
                        ledger.abandon_remaining();
                        return Some(halt);
                    }
                }
            }
        }
        None
    }

    async fn subscriptions(&self, ledger: &mut Ledger) -> Option<Halt> {
        let page_size = self.policy.page_size;
        let items = match enumerate::collect_all(enumerate::subscriptions(&self.source, page_size))
            .await
        {
            Ok(items) => items,
            Err(e) => return Some(Halt::listing(Side::Source, &e)),
        };
        tracing::info!(count = items.len(), "listed source subscriptions");
        *ledger = Ledger::with_total(items.len());

        let mut existing = match resolve::existing_subscriptions(&self.dest, page_size).await {
            Ok(existing) => existing,
            Err(e) => {
                ledger.abandon_remaining();
                return Some(Halt::listing(Side::Destination, &e));
            }
        };

        self.replicate(&items, &mut existing, ledger, CreateStep::Subscribe)
            .await
    }

    async fn liked_videos(&self, ledger: &mut Ledger) -> Option<Halt> {
        let page_size = self.policy.page_size;
        let items = match enumerate::collect_all(enumerate::liked_videos(&self.source, page_size))
            .await
        {
            Ok(items) => items,
            Err(e) => return Some(Halt::listing(Side::Source, &e)),
        };
        tracing::info!(count = items.len(), "listed source likes");
        *ledger = Ledger::with_total(items.len());

        let mut existing = match resolve::existing_likes(&self.dest, page_size).await {
            Ok(existing) => existing,
            Err(e) => {
                ledger.abandon_remaining();
                return Some(Halt::listing(Side::Destination, &e));
            }
        };

        self.replicate(&items, &mut existing, ledger, CreateStep::Like)
            .await
    }

    async fn playlists(&self, ledger: &mut Ledger) -> Option<Halt> {
        let page_size = self.policy.page_size;
        let playlists = match enumerate::collect_all(enumerate::playlists(&self.source, page_size))
            .await
        {
            Ok(playlists) => playlists,
            Err(e) => return Some(Halt::listing(Side::Source, &e)),
        };
        tracing::info!(count = playlists.len(), "listed source playlists");
        *ledger = Ledger::with_total(playlists.len());

        let mut directory =
            match PlaylistDirectory::load(&self.dest, page_size, self.policy.playlist_match).await
            {
                Ok(directory) => directory,
                Err(e) => {
                    ledger.abandon_remaining();
                    return Some(Halt::listing(Side::Destination, &e));
                }
            };

        let mut breaker = Breaker::new(self.policy.breaker_threshold);
        for playlist in &playlists {
            let step = self
                .playlist(playlist, &mut directory, ledger)
                .instrument(tracing::debug_span!("playlist", title = %playlist.title))
                .await;
            let halt = match step {
                Ok(None) => {
                    breaker.success();
                    None
                }
                Ok(Some(halt)) => Some(halt),
                Err(GatewayError::QuotaExceeded) => Some(Halt::QuotaExceeded),
                Err(e) => {
                    tracing::warn!(title = %playlist.title, error = %e, "playlist failed");
                    ledger.record(playlist, Outcome::failed(&e));
                    breaker.failure(e.kind())
                }
            };
            if halt.is_some() {
                ledger.abandon_remaining();
                return halt;
            }
        }
        None
    }

    /// Replicates one playlist: its shell first, then its videos in source order.
    ///
    /// Returns `Err` if the playlist could not be set up at all, in which case nothing has been
    /// recorded for it yet. Otherwise the playlist has been recorded with its video ledger, and
    /// the result says whether the video loop halted.
    async fn playlist(
        &self,
        playlist: &Playlist,
        directory: &mut PlaylistDirectory,
        ledger: &mut Ledger,
    ) -> Result<Option<Halt>, GatewayError> {
        let page_size = self.policy.page_size;
        // Listed before the shell is created so that an unreadable playlist leaves no empty
        // copy behind on the destination.
        let videos = enumerate::collect_all(enumerate::playlist_videos(
            &self.source,
            &playlist.playlist_id,
            page_size,
        ))
        .await?;

        let (dest_id, outcome, mut existing) = match directory.find(&playlist.title) {
            Some(dest_id) => {
                let dest_id = dest_id.to_string();
                let existing = resolve::playlist_contents(&self.dest, &dest_id, page_size).await?;
                tracing::debug!(dest_id, "playlist already on destination");
                (dest_id, Outcome::AlreadyExists, existing)
            }
            None => {
                let dest_id = self
                    .dest
                    .insert_playlist(&NewPlaylist {
                        title: playlist.title.clone(),
                        description: playlist.description.clone(),
                        privacy_status: self.policy.playlist_privacy,
                    })
                    .await?;
                tracing::debug!(dest_id, "created playlist");
                directory.insert(&playlist.title, &dest_id);
                self.pace().await;
                (dest_id, Outcome::Created, ExistingIndex::default())
            }
        };

        let mut contents = Ledger::with_total(videos.len());
        let halt = self
            .replicate(
                &videos,
                &mut existing,
                &mut contents,
                CreateStep::AddToPlaylist(&dest_id),
            )
            .await;
        ledger.record(playlist, outcome).contents = Some(contents);
        Ok(halt)
    }
}

/// Copies the requested domains from `source` to `dest`.
pub async fn transfer<S: YouTubeApi, D: YouTubeApi>(
    source: &S,
    dest: &D,
    domains: &[Domain],
    policy: TransferPolicy,
) -> TransferSummary {
    Transfer::new(source, dest, policy).run(domains).await
}

/// Another transfer into the same destination account is still running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a transfer into {0} is already running")]
pub struct AlreadyRunning(pub String);

/// Keeps at most one transfer per destination account in flight.
///
/// Two concurrent runs would both see the same "missing" items and create them twice.
#[derive(Debug, Clone, Default)]
pub struct TransferLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of a run. Dropping it lets the next run in.
#[derive(Debug)]
pub struct RunPermit {
    destination: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl TransferLocks {
    pub fn try_acquire(&self, destination: &str) -> Result<RunPermit, AlreadyRunning> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(destination.to_string()) {
            return Err(AlreadyRunning(destination.to_string()));
        }
        Ok(RunPermit {
            destination: destination.to_string(),
            active: Arc::clone(&self.active),
        })
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAccount;
    use pretty_assertions::assert_eq;

    fn policy() -> TransferPolicy {
        TransferPolicy {
            retry_base_delay_ms: 0,
            pacing_ms: 0,
            ..TransferPolicy::default()
        }
    }

    fn outcomes(report: &TransferReport) -> Vec<(&str, &Outcome)> {
        report
            .ledger
            .entries
            .iter()
            .map(|e| (e.id.as_str(), &e.outcome))
            .collect()
    }

    fn numbered(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let source = MockAccount::new()
            .with_subscriptions(&["a", "b", "c"])
            .with_liked(&["v1", "v2"])
            .with_playlist("Mix", &["x", "y"]);
        let dest = MockAccount::new().with_subscriptions(&["b"]);

        let first = transfer(&source, &dest, &Domain::ALL, policy()).await;
        assert_eq!(first.report(Domain::Subscriptions).unwrap().ledger.created, 2);
        assert_eq!(first.report(Domain::LikedVideos).unwrap().ledger.created, 2);
        assert_eq!(first.report(Domain::Playlists).unwrap().ledger.created, 1);

        let attempts = dest.create_attempts();
        let second = transfer(&source, &dest, &Domain::ALL, policy()).await;

        assert_eq!(dest.create_attempts(), attempts);
        for report in &second.reports {
            assert_eq!(report.ledger.created, 0, "{}", report.domain);
            assert_eq!(report.ledger.skipped, report.ledger.total, "{}", report.domain);
            assert!(report.halt.is_none());
        }
        let playlists = second.report(Domain::Playlists).unwrap();
        let contents = playlists.ledger.entries[0].contents.as_ref().unwrap();
        assert_eq!((contents.created, contents.skipped), (0, 2));
    }

    #[tokio::test]
    async fn counts_add_up_without_truncation() {
        let source = MockAccount::new().with_subscriptions(&["a", "b", "c", "d"]);
        let dest = MockAccount::new().with_subscriptions(&["b"]);
        dest.fail_item("d", GatewayError::Forbidden("suspended channel".into()));

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        let l = &report.ledger;
        assert_eq!((l.created, l.skipped, l.failed), (2, 1, 1));
        assert_eq!(l.created + l.skipped + l.failed, l.total);
        assert!(l.is_balanced());
        assert!(!report.is_truncated());
    }

    #[tokio::test]
    async fn playlist_videos_keep_relative_order() {
        let source = MockAccount::new().with_playlist("Mix", &["v1", "v2", "v3"]);
        let dest = MockAccount::new().with_playlist("Mix", &["p0"]);

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Playlists)
            .await;

        assert_eq!(outcomes(&report), [("PL1", &Outcome::AlreadyExists)]);
        let (_, videos) = dest.playlist("Mix").unwrap();
        assert_eq!(videos, ["p0", "v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn quota_exhaustion_stops_the_run() {
        let ids = numbered("UC", 20);
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = MockAccount::new()
            .with_subscriptions(&ids)
            .with_liked(&["v1"]);
        let dest = MockAccount::new();
        dest.quota_after(4);

        let summary = transfer(
            &source,
            &dest,
            &[Domain::LikedVideos, Domain::Subscriptions],
            policy(),
        )
        .await;

        let subs = summary.report(Domain::Subscriptions).unwrap();
        assert_eq!(subs.ledger.created, 4);
        assert_eq!(subs.ledger.not_attempted, 16);
        assert_eq!(subs.halt, Some(Halt::QuotaExceeded));
        assert!(subs.ledger.is_balanced());
        assert_eq!(dest.create_attempts(), 5);

        let likes = summary.report(Domain::LikedVideos).unwrap();
        assert_eq!(likes.halt, Some(Halt::QuotaExceeded));
        assert_eq!(likes.ledger.total, 0);
        assert!(summary.quota_exhausted());
        assert_eq!(dest.liked_ids(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn one_bad_item_does_not_stop_the_domain() {
        let source = MockAccount::new().with_liked(&["v1", "v2", "v3", "v4", "v5"]);
        let dest = MockAccount::new();
        dest.fail_item("v3", GatewayError::Forbidden("rating disabled".into()));

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::LikedVideos)
            .await;

        assert_eq!(
            outcomes(&report),
            [
                ("v1", &Outcome::Created),
                ("v2", &Outcome::Created),
                (
                    "v3",
                    &Outcome::Failed {
                        kind: ErrorKind::Forbidden,
                        reason: "forbidden: rating disabled".into()
                    }
                ),
                ("v4", &Outcome::Created),
                ("v5", &Outcome::Created),
            ]
        );
        assert_eq!(dest.liked_ids(), ["v1", "v2", "v4", "v5"]);
    }

    #[tokio::test]
    async fn existing_subscription_is_never_inserted() {
        let source = MockAccount::new().with_subscriptions(&["a", "b"]);
        let dest = MockAccount::new().with_subscriptions(&["b"]);

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        assert_eq!(dest.subscription_inserts(), 1);
        assert_eq!(
            outcomes(&report),
            [("a", &Outcome::Created), ("b", &Outcome::AlreadyExists)]
        );
        assert_eq!(dest.subscribed_ids(), ["b", "a"]);
    }

    #[tokio::test]
    async fn destination_is_indexed_once_per_domain() {
        let source = MockAccount::new().with_subscriptions(&["a", "b", "c", "d"]);
        let dest = MockAccount::new().with_subscriptions(&["x"]);

        Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        assert_eq!(dest.list_calls(), 1);
    }

    #[tokio::test]
    async fn repeated_failures_open_the_circuit() {
        let ids = numbered("v", 10);
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = MockAccount::new().with_liked(&ids);
        let dest = MockAccount::new();
        for id in &ids {
            dest.fail_item(id, GatewayError::AuthExpired("token revoked".into()));
        }

        let report = Transfer::new(
            &source,
            &dest,
            TransferPolicy {
                breaker_threshold: 3,
                ..policy()
            },
        )
        .transfer_domain(Domain::LikedVideos)
        .await;

        assert_eq!(
            report.halt,
            Some(Halt::CircuitOpen {
                kind: ErrorKind::AuthExpired,
                consecutive: 3
            })
        );
        assert_eq!((report.ledger.failed, report.ledger.not_attempted), (3, 7));
        assert_eq!(dest.create_attempts(), 3);
    }

    #[tokio::test]
    async fn success_resets_the_circuit() {
        let source = MockAccount::new().with_liked(&["v1", "v2", "v3", "v4", "v5"]);
        let dest = MockAccount::new();
        for id in ["v1", "v2", "v4", "v5"] {
            dest.fail_item(id, GatewayError::Forbidden("nope".into()));
        }

        let report = Transfer::new(
            &source,
            &dest,
            TransferPolicy {
                breaker_threshold: 3,
                ..policy()
            },
        )
        .transfer_domain(Domain::LikedVideos)
        .await;

        assert_eq!(report.halt, None);
        assert_eq!((report.ledger.created, report.ledger.failed), (1, 4));
    }

    #[tokio::test]
    async fn not_found_never_opens_the_circuit() {
        let ids = numbered("v", 10);
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = MockAccount::new().with_liked(&ids);
        let dest = MockAccount::new();
        for id in &ids {
            dest.fail_item(id, GatewayError::NotFound("video deleted".into()));
        }

        let report = Transfer::new(
            &source,
            &dest,
            TransferPolicy {
                breaker_threshold: 3,
                ..policy()
            },
        )
        .transfer_domain(Domain::LikedVideos)
        .await;

        assert_eq!(report.halt, None);
        assert_eq!((report.ledger.failed, report.ledger.not_attempted), (10, 0));
        assert_eq!(dest.create_attempts(), 10);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_only_that_item() {
        let source = MockAccount::new().with_liked(&["v1", "v2", "v3"]);
        let dest = MockAccount::new();
        dest.fail_item("v2", GatewayError::RateLimited("slow down".into()));

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::LikedVideos)
            .await;

        assert_eq!(
            outcomes(&report),
            [
                ("v1", &Outcome::Created),
                (
                    "v2",
                    &Outcome::Failed {
                        kind: ErrorKind::RateLimited,
                        reason: "rate limited: slow down".into()
                    }
                ),
                ("v3", &Outcome::Created),
            ]
        );
        assert_eq!(report.halt, None);
        // one attempt each for v1 and v3, three for v2
        assert_eq!(dest.create_attempts(), 5);
        assert_eq!(dest.liked_ids(), ["v1", "v3"]);
    }

    #[tokio::test]
    async fn provider_duplicate_counts_as_present() {
        let source = MockAccount::new().with_subscriptions(&["a"]);
        let dest = MockAccount::new();
        dest.fail_item("a", GatewayError::Duplicate("subscriptionDuplicate".into()));

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        assert_eq!(outcomes(&report), [("a", &Outcome::AlreadyExists)]);
    }

    #[tokio::test]
    async fn unreadable_source_halts_the_domain() {
        let source = MockAccount::new().with_subscriptions(&["a"]);
        source.fail_next_lists([GatewayError::Forbidden("scope missing".into())]);
        let dest = MockAccount::new();

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        assert_eq!(
            report.halt,
            Some(Halt::ListingFailed {
                side: Side::Source,
                error: "forbidden: scope missing".into()
            })
        );
        assert_eq!(dest.create_attempts(), 0);
    }

    #[tokio::test]
    async fn unreadable_destination_leaves_items_unattempted() {
        let source = MockAccount::new().with_liked(&["v1", "v2"]);
        let dest = MockAccount::new();
        dest.fail_next_lists([GatewayError::Forbidden("nope".into())]);

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::LikedVideos)
            .await;

        assert_eq!(report.ledger.not_attempted, 2);
        assert!(report.ledger.is_balanced());
        assert_eq!(dest.create_attempts(), 0);
    }

    #[tokio::test]
    async fn new_playlists_follow_the_privacy_policy() {
        let source = MockAccount::new().with_playlist("Road Trip", &["v1"]);
        let dest = MockAccount::new();

        Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Playlists)
            .await;

        let (created, videos) = dest.playlist("Road Trip").unwrap();
        assert_eq!(created.privacy_status, PrivacyStatus::Private);
        assert_eq!(created.description, "Road Trip description");
        assert_eq!(videos, ["v1"]);
    }

    #[tokio::test]
    async fn case_insensitive_matching_reuses_playlist() {
        let source = MockAccount::new().with_playlist("road trip", &["v1"]);
        let dest = MockAccount::new().with_playlist("Road Trip", &[]);

        let report = Transfer::new(
            &source,
            &dest,
            TransferPolicy {
                playlist_match: PlaylistMatch::CaseInsensitive,
                ..policy()
            },
        )
        .transfer_domain(Domain::Playlists)
        .await;

        assert_eq!(report.ledger.skipped, 1);
        assert_eq!(dest.playlist_titles(), ["Road Trip"]);
        assert_eq!(dest.playlist("Road Trip").unwrap().1, ["v1"]);
    }

    #[tokio::test]
    async fn repeated_source_video_is_added_once() {
        let source = MockAccount::new().with_playlist("Loop", &["v1", "v1", "v2"]);
        let dest = MockAccount::new();

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Playlists)
            .await;

        let contents = report.ledger.entries[0].contents.as_ref().unwrap();
        assert_eq!((contents.created, contents.skipped), (2, 1));
        assert_eq!(dest.playlist("Loop").unwrap().1, ["v1", "v2"]);
    }

    #[tokio::test]
    async fn quota_inside_a_playlist_stops_remaining_playlists() {
        let source = MockAccount::new()
            .with_playlist("One", &["a", "b", "c"])
            .with_playlist("Two", &["d"]);
        let dest = MockAccount::new();
        // The shell and one video fit in the budget.
        dest.quota_after(2);

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Playlists)
            .await;

        assert_eq!(report.halt, Some(Halt::QuotaExceeded));
        assert_eq!(report.ledger.entries.len(), 1);
        assert_eq!(report.ledger.not_attempted, 1);
        let contents = report.ledger.entries[0].contents.as_ref().unwrap();
        assert_eq!((contents.created, contents.not_attempted), (1, 2));
        assert!(contents.is_balanced());
        assert_eq!(dest.playlist_titles(), ["One"]);
    }

    #[tokio::test]
    async fn failed_playlist_shell_skips_its_videos() {
        let source = MockAccount::new()
            .with_playlist("Broken", &["a"])
            .with_playlist("Fine", &["b"]);
        let dest = MockAccount::new();
        dest.fail_item("Broken", GatewayError::Forbidden("too many playlists".into()));

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Playlists)
            .await;

        assert_eq!((report.ledger.failed, report.ledger.created), (1, 1));
        assert!(report.ledger.entries[0].contents.is_none());
        assert_eq!(dest.playlist_titles(), ["Fine"]);
    }

    #[tokio::test]
    async fn quota_units_are_reported_per_domain() {
        let source = MockAccount::new().with_subscriptions(&["a", "b"]);
        let dest = MockAccount::new();

        let report = Transfer::new(&source, &dest, policy())
            .transfer_domain(Domain::Subscriptions)
            .await;

        // one list on each side, two inserts
        assert_eq!(report.quota_units, 1 + 1 + 2 * 50);
    }

    #[tokio::test]
    async fn transfer_runs_on_a_spawned_task() {
        let source = Arc::new(
            MockAccount::new()
                .with_subscriptions(&["a"])
                .with_liked(&["v1"])
                .with_playlist("Mix", &["x"]),
        );
        let dest = Arc::new(MockAccount::new());

        let worker = {
            let source = Arc::clone(&source);
            let dest = Arc::clone(&dest);
            tokio::spawn(async move { transfer(&*source, &*dest, &Domain::ALL, policy()).await })
        };
        let summary = worker.await.unwrap();

        assert_eq!(summary.reports.len(), 3);
        assert!(summary.reports.iter().all(|report| report.halt.is_none()));
        assert_eq!(dest.subscribed_ids(), ["a"]);
        assert_eq!(dest.liked_ids(), ["v1"]);
        assert_eq!(dest.playlist_titles(), ["Mix"]);
    }

    #[test]
    fn one_run_per_destination() {
        let locks = TransferLocks::default();
        let permit = locks.try_acquire("UCdest").unwrap();

        assert_eq!(
            locks.try_acquire("UCdest").unwrap_err(),
            AlreadyRunning("UCdest".into())
        );
        assert!(locks.try_acquire("UCother").is_ok());

        drop(permit);
        assert!(locks.try_acquire("UCdest").is_ok());
    }

    #[test]
    fn policy_fields_default_individually() {
        let policy: TransferPolicy =
            serde_json::from_str(r#"{ "playlist_privacy": "unlisted", "pacing_ms": 0 }"#)
                .unwrap();

        assert_eq!(policy.playlist_privacy, PrivacyStatus::Unlisted);
        assert_eq!(policy.pacing_ms, 0);
        assert_eq!(policy.page_size, 50);
        assert_eq!(policy.playlist_match, PlaylistMatch::Exact);
    }
}

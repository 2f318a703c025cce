//! What happened during a transfer.
//!
//! The orchestrator fills in one [`TransferReport`] per domain. Every source item ends up
//! either as an [`ItemRecord`] or in the `not_attempted` count, so the counters always add up
//! to the number of items found on the source.

use crate::gateway::{ErrorKind, GatewayError};
use crate::model::{Domain, Item};
use jiff::Timestamp;
use serde::Serialize;
use std::fmt;

/// The result of replicating one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    /// The destination already had it; nothing was written.
    AlreadyExists,
    Failed { kind: ErrorKind, reason: String },
}

impl Outcome {
    pub fn failed(error: &GatewayError) -> Self {
        Outcome::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    pub id: String,
    pub title: String,
    pub outcome: Outcome,
    /// For playlists: what happened to each of its videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Ledger>,
}

/// Per-item outcomes of one loop over source items, with running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ledger {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub entries: Vec<ItemRecord>,
}

impl Ledger {
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, item: &impl Item, outcome: Outcome) -> &mut ItemRecord {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::AlreadyExists => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        let index = self.entries.len();
        self.entries.push(ItemRecord {
            id: item.key().to_string(),
            title: item.title().to_string(),
            outcome,
            contents: None,
        });
        &mut self.entries[index]
    }

    /// Counts every item without a record as not attempted.
    pub fn abandon_remaining(&mut self) {
        self.not_attempted = self.total.saturating_sub(self.entries.len());
    }

    /// Whether every item is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.created + self.skipped + self.failed + self.not_attempted == self.total
            && self.entries.len() + self.not_attempted == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ItemRecord, &str)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            Outcome::Failed { reason, .. } => Some((e, reason.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Why a domain stopped before every item was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Halt {
    /// The daily unit budget ran out. Ends the whole run.
    QuotaExceeded,
    /// Too many consecutive failures of the same kind.
    CircuitOpen { kind: ErrorKind, consecutive: u32 },
    /// One of the accounts could not be listed.
    ListingFailed { side: Side, error: String },
}

impl Halt {
    pub fn listing(side: Side, error: &GatewayError) -> Self {
        match error {
            GatewayError::QuotaExceeded => Halt::QuotaExceeded,
            e => Halt::ListingFailed {
                side,
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub domain: Domain,
    #[serde(flatten)]
    pub ledger: Ledger,
    pub halt: Option<Halt>,
    /// Units charged to the destination and source accounts while handling this domain.
    pub quota_units: u64,
}

impl TransferReport {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            ledger: Ledger::default(),
            halt: None,
            quota_units: 0,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.halt.is_some()
    }

    /// Totals over the videos of every playlist in this report.
    pub fn video_totals(&self) -> Option<Ledger> {
        let mut totals: Option<Ledger> = None;
        for contents in self.ledger.entries.iter().filter_map(|e| e.contents.as_ref()) {
            let t = totals.get_or_insert_with(Ledger::default);
            t.total += contents.total;
            t.created += contents.created;
            t.skipped += contents.skipped;
            t.failed += contents.failed;
            t.not_attempted += contents.not_attempted;
        }
        totals
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = &self.ledger;
        writeln!(f, "== {} ==", self.domain)?;
        writeln!(f, "found on source:  {}", l.total)?;
        writeln!(f, "transferred:      {}", l.created)?;
        writeln!(f, "already present:  {}", l.skipped)?;
        writeln!(f, "failed:           {}", l.failed)?;
        if l.not_attempted > 0 {
            writeln!(f, "not attempted:    {}", l.not_attempted)?;
        }
        if let Some(videos) = self.video_totals() {
            writeln!(
                f,
                "videos added:     {} ({} already present, {} failed)",
                videos.created, videos.skipped, videos.failed
            )?;
        }
        writeln!(f, "quota units used: {}", self.quota_units)?;

        for (entry, reason) in l.failures() {
            writeln!(f, "  - {} ({}): {}", entry.title, entry.id, reason)?;
        }
        for entry in &l.entries {
            let Some(contents) = &entry.contents else {
                continue;
            };
            for (video, reason) in contents.failures() {
                writeln!(
                    f,
                    "  - {} / {} ({}): {}",
                    entry.title, video.title, video.id, reason
                )?;
            }
        }

        match &self.halt {
            None => Ok(()),
            Some(Halt::QuotaExceeded) => writeln!(
                f,
                "stopped: the daily YouTube API quota is used up. \
                 Run again after it resets (midnight Pacific time) to continue."
            ),
            Some(Halt::CircuitOpen { kind, consecutive }) => writeln!(
                f,
                "stopped: {consecutive} consecutive \"{kind}\" failures, \
                 the account itself is probably the problem."
            ),
            Some(Halt::ListingFailed { side, error }) => {
                writeln!(f, "stopped: could not list the {side} account: {error}")
            }
        }
    }
}

/// The reports of one transfer run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub reports: Vec<TransferReport>,
}

impl TransferSummary {
    pub fn quota_exhausted(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.halt == Some(Halt::QuotaExceeded))
    }

    pub fn report(&self, domain: Domain) -> Option<&TransferReport> {
        self.reports.iter().find(|r| r.domain == domain)
    }

    pub fn quota_units(&self) -> u64 {
        self.reports.iter().map(|r| r.quota_units).sum()
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, report) in self.reports.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{report}")?;
        }
        Ok(())
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::validate::validate_url;
use crate::error::ErrorKind;
use crate::feed::{Entry, Feed, FeedParser, Fetcher, ParsedFeed};
use crate::state::{FormState, Store};

/// A feed accepted by [`UpdateEngine::register_feed`] with its initial entries
#[derive(Debug, Clone)]
pub struct Registration {
    pub feed: Feed,
    pub entries: Vec<Entry>,
}

/// Result of polling a single feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing newer than the watermark
    NoChange,
    /// This many entries were appended
    EntriesAdded(usize),
    /// Fetch or parse failed; nothing was written
    Failed(ErrorKind),
    /// Another poll for the same URL is still running
    Busy,
    /// The URL is not a registered feed
    Unknown,
}

/// Totals for one [`UpdateEngine::poll_all_feeds`] fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: u32,
    pub new_entries: u32,
    pub failed: u32,
}

impl PollSummary {
    /// Count a finished poll. Skipped polls (busy or unknown URL) are not counted.
    fn record(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::NoChange => self.polled += 1,
            PollOutcome::EntriesAdded(count) => {
                self.polled += 1;
                self.new_entries += count as u32;
            }
            PollOutcome::Failed(_) => {
                self.polled += 1;
                self.failed += 1;
            }
            PollOutcome::Busy | PollOutcome::Unknown => {}
        }
    }
}

/// Feed ingestion pipeline: registration, polling and user intents
pub struct UpdateEngine {
    store: Arc<Store>,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn FeedParser>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<HashSet<String>>,
}

/// Marks a URL as being polled until dropped
struct InFlight<'a> {
    urls: &'a Mutex<HashSet<String>>,
    url: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
    }
}

impl UpdateEngine {
    pub fn new(store: Arc<Store>, fetcher: Arc<dyn Fetcher>, parser: Arc<dyn FeedParser>) -> Self {
        Self {
            store,
            fetcher,
            parser,
            clock: Arc::new(SystemClock),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the clock used for watermarks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Validate, fetch and parse `url`, then store the feed and its entries.
    ///
    /// Writes "feeds" then "posts". Nothing is written on failure.
    pub async fn register_feed(&self, url: &str) -> Result<Registration, ErrorKind> {
        let url = url.trim();
        let parsed = self.prepare(url).await?;
        self.commit(url, parsed)
    }

    /// Form submission: like [`register_feed`](Self::register_feed), but the
    /// outcome also replaces the form state. On success the form is written
    /// before the feed and its entries.
    pub async fn submit_form(&self, input: &str) -> Result<Registration, ErrorKind> {
        let url = input.trim();

        let parsed = match self.prepare(url).await {
            Ok(parsed) => parsed,
            Err(kind) => {
                self.store.set_form(FormState::rejected(url, kind));
                return Err(kind);
            }
        };

        self.store.set_form(FormState::accepted(url));
        self.commit(url, parsed).inspect_err(|kind| {
            self.store.set_form(FormState::rejected(url, *kind));
        })
    }

    /// Poll one registered feed and append entries newer than its watermark.
    ///
    /// Failures are logged and swallowed. The watermark only moves when at
    /// least one entry was added.
    pub async fn poll_feed(&self, url: &str) -> PollOutcome {
        let Some(_guard) = self.claim(url) else {
            tracing::debug!("Poll already running for {}", url);
            return PollOutcome::Busy;
        };

        let Some(feed_id) = self.store.read(|state| state.feed_by_url(url).map(|feed| feed.id)) else {
            tracing::warn!("Refusing to poll unregistered feed {}", url);
            return PollOutcome::Unknown;
        };

        let watermark = self
            .store
            .last_checked(url)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let parsed = match self.load(url).await {
            Ok(parsed) => parsed,
            Err(kind) => return PollOutcome::Failed(kind),
        };

        let fresh: Vec<Entry> = parsed
            .entries
            .into_iter()
            .filter(|entry| entry.is_newer_than(watermark))
            .map(|entry| Entry::from_parsed(feed_id, entry))
            .collect();

        if fresh.is_empty() {
            tracing::debug!("No new entries for {}", url);
            return PollOutcome::NoChange;
        }

        let count = fresh.len();
        let checked_at = self.watermark_after(&fresh);
        self.store.append_entries(fresh);
        self.store.record_checked(url, checked_at);

        tracing::info!("Feed {}: {} new entries", url, count);
        PollOutcome::EntriesAdded(count)
    }

    /// Poll every registered feed concurrently and wait for all of them
    pub async fn poll_all_feeds(self: &Arc<Self>) -> PollSummary {
        let urls: Vec<String> = self
            .store
            .read(|state| state.feeds.iter().map(|feed| feed.url.clone()).collect());

        let mut join_set = JoinSet::new();
        for url in urls {
            let engine = Arc::clone(self);
            join_set.spawn(async move { engine.poll_feed(&url).await });
        }

        let mut summary = PollSummary::default();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!("Poll task join error: {}", e);
                    summary.polled += 1;
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Show an entry in the detail view and mark it visited.
    ///
    /// Returns false for unknown ids.
    pub fn open_entry(&self, id: Uuid) -> bool {
        let Some(summary) = self.store.read(|state| state.entry(id).map(Entry::summary)) else {
            return false;
        };

        self.store.set_modal(Some(summary));
        self.store.mark_visited(id);
        true
    }

    /// Mark an entry visited. Returns false if unknown or already visited.
    pub fn mark_visited(&self, id: Uuid) -> bool {
        if !self.store.read(|state| state.entry(id).is_some()) {
            return false;
        }
        self.store.mark_visited(id)
    }

    pub fn close_entry(&self) {
        self.store.set_modal(None);
    }

    async fn prepare(&self, url: &str) -> Result<ParsedFeed, ErrorKind> {
        validate_url(url, |url| self.store.has_feed_url(url))?;
        self.load(url).await
    }

    async fn load(&self, url: &str) -> Result<ParsedFeed, ErrorKind> {
        let content = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!("Failed to fetch {}: {}", url, e);
            ErrorKind::Network
        })?;

        self.parser.parse(&content).map_err(|e| {
            tracing::warn!("Failed to parse {}: {}", url, e);
            ErrorKind::Parse
        })
    }

    fn commit(&self, url: &str, parsed: ParsedFeed) -> Result<Registration, ErrorKind> {
        let feed = Feed::new(url, &parsed);

        // A concurrent registration of the same URL may have finished first
        if !self.store.add_feed(feed.clone()) {
            return Err(ErrorKind::Duplicate);
        }

        let entries: Vec<Entry> = parsed
            .entries
            .into_iter()
            .map(|entry| Entry::from_parsed(feed.id, entry))
            .collect();
        self.store.init_checked(url, self.watermark_after(&entries));
        self.store.append_entries(entries.clone());

        tracing::info!("Registered feed '{}' ({}) with {} entries", feed.title, url, entries.len());

        Ok(Registration { feed, entries })
    }

    /// Watermark covering `entries`: now, or the newest publish time if that is later
    fn watermark_after(&self, entries: &[Entry]) -> DateTime<Utc> {
        entries
            .iter()
            .filter_map(|entry| entry.published_at)
            .fold(self.clock.now(), |latest, at| latest.max(at))
    }

    fn claim(&self, url: &str) -> Option<InFlight<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());

        inserted.then(|| InFlight {
            urls: &self.in_flight,
            url: url.to_string(),
        })
    }
}

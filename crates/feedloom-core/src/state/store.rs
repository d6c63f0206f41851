//! Observable application state.
//!
//! Every tracked write goes through a typed mutation method on [`Store`],
//! which releases its lock and then calls each subscriber synchronously, in
//! subscription order, with the top-level [`StatePath`] it changed. A
//! subscriber may write to the store from inside its callback; that write
//! notifies again before the outer write returns.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::StatePath;
use crate::error::ErrorKind;
use crate::feed::{Entry, EntrySummary, Feed};

/// Outcome of the last URL submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub url: String,
    pub valid: bool,
    pub error: Option<ErrorKind>,
    pub success: Option<bool>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            url: String::new(),
            valid: true,
            error: None,
            success: None,
        }
    }
}

impl FormState {
    pub fn accepted(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            valid: true,
            error: None,
            success: Some(true),
        }
    }

    pub fn rejected(url: impl Into<String>, error: ErrorKind) -> Self {
        Self {
            url: url.into(),
            valid: false,
            error: Some(error),
            success: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub visited: HashSet<Uuid>,
    pub modal: Option<EntrySummary>,
}

/// The whole state tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    pub feeds: Vec<Feed>,
    pub entries: Vec<Entry>,
    pub form: FormState,
    pub ui: UiState,
    /// Poll watermark per feed URL; not observed by subscribers
    pub last_checked: HashMap<String, DateTime<Utc>>,
}

impl AppState {
    pub fn has_feed_url(&self, url: &str) -> bool {
        self.feeds.iter().any(|feed| feed.url == url)
    }

    pub fn feed_by_url(&self, url: &str) -> Option<&Feed> {
        self.feeds.iter().find(|feed| feed.url == url)
    }

    pub fn entry(&self, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries_for(&self, feed_id: Uuid) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |entry| entry.feed_id == feed_id)
    }

    pub fn is_visited(&self, id: Uuid) -> bool {
        self.ui.visited.contains(&id)
    }
}

/// Receives a callback for every tracked write
pub trait Subscriber: Send + Sync {
    fn on_change(&self, path: StatePath, store: &Store);
}

impl<F> Subscriber for F
where
    F: Fn(StatePath, &Store) + Send + Sync,
{
    fn on_change(&self, path: StatePath, store: &Store) {
        self(path, store)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Store {
    state: RwLock<AppState>,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn Subscriber>)>>,
    next_subscription: AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AppState::default()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Register a subscriber; it is called after every subscriber registered before it
    pub fn subscribe(&self, subscriber: impl Subscriber + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Run `f` against the current state
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.read_state())
    }

    /// Clone of the whole state tree
    pub fn snapshot(&self) -> AppState {
        self.read_state().clone()
    }

    pub fn feeds(&self) -> Vec<Feed> {
        self.read_state().feeds.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.read_state().entries.clone()
    }

    pub fn form(&self) -> FormState {
        self.read_state().form.clone()
    }

    pub fn ui(&self) -> UiState {
        self.read_state().ui.clone()
    }

    pub fn has_feed_url(&self, url: &str) -> bool {
        self.read_state().has_feed_url(url)
    }

    pub fn last_checked(&self, url: &str) -> Option<DateTime<Utc>> {
        self.read_state().last_checked.get(url).copied()
    }

    /// Replace the form state wholesale
    pub fn set_form(&self, form: FormState) {
        self.write_state().form = form;
        self.notify(StatePath::Form);
    }

    /// Add a feed unless its URL is already registered.
    ///
    /// Returns false, without notifying, when the URL is taken.
    pub fn add_feed(&self, feed: Feed) -> bool {
        {
            let mut state = self.write_state();
            if state.has_feed_url(&feed.url) {
                return false;
            }
            state.feeds.push(feed);
        }
        self.notify(StatePath::Feeds);
        true
    }

    /// Append entries in the given order. An empty batch is not a write.
    pub fn append_entries(&self, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        self.write_state().entries.extend(entries);
        self.notify(StatePath::Posts);
    }

    pub fn set_modal(&self, modal: Option<EntrySummary>) {
        self.write_state().ui.modal = modal;
        self.notify(StatePath::UiModal);
    }

    /// Mark an entry visited. Returns false, without notifying, if it already was.
    pub fn mark_visited(&self, id: Uuid) -> bool {
        let inserted = self.write_state().ui.visited.insert(id);
        if inserted {
            self.notify(StatePath::UiVisitedPosts);
        }
        inserted
    }

    /// Set the poll watermark for a registered `url`.
    ///
    /// Returns false, writing nothing, if no feed has that URL.
    pub fn record_checked(&self, url: &str, at: DateTime<Utc>) -> bool {
        let mut state = self.write_state();
        if !state.has_feed_url(url) {
            return false;
        }
        state.last_checked.insert(url.to_string(), at);
        true
    }

    /// Set the poll watermark for a registered `url` only if it has none yet
    pub fn init_checked(&self, url: &str, at: DateTime<Utc>) {
        let mut state = self.write_state();
        if state.has_feed_url(url) {
            state.last_checked.entry(url.to_string()).or_insert(at);
        }
    }

    fn notify(&self, path: StatePath) {
        // Snapshot the list so callbacks may (un)subscribe without deadlocking
        let subscribers: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        tracing::trace!(path = %path, subscribers = subscribers.len(), "State change");

        for subscriber in subscribers {
            subscriber.on_change(path, self);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::feed::ParsedFeed;

    fn recorder(store: &Store) -> Arc<Mutex<Vec<StatePath>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |path: StatePath, _: &Store| sink.lock().unwrap().push(path));
        seen
    }

    fn feed(url: &str) -> Feed {
        Feed::new(url, &ParsedFeed::default())
    }

    #[test]
    fn test_each_write_notifies_once() {
        let store = Store::new();
        let seen = recorder(&store);

        store.set_form(FormState::accepted("https://a.example"));
        assert!(store.add_feed(feed("https://a.example")));
        store.set_modal(None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatePath::Form, StatePath::Feeds, StatePath::UiModal]
        );
    }

    #[test]
    fn test_subscribers_called_in_subscription_order() {
        let store = Store::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            store.subscribe(move |_: StatePath, _: &Store| order.lock().unwrap().push(name));
        }

        store.set_form(FormState::default());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_feed_is_not_a_write() {
        let store = Store::new();
        let seen = recorder(&store);

        assert!(store.add_feed(feed("https://a.example")));
        assert!(!store.add_feed(feed("https://a.example")));

        assert_eq!(store.feeds().len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![StatePath::Feeds]);
    }

    #[test]
    fn test_empty_append_and_repeat_visit_are_silent() {
        let store = Store::new();
        let seen = recorder(&store);
        let id = Uuid::new_v4();

        store.append_entries(Vec::new());
        assert!(store.mark_visited(id));
        assert!(!store.mark_visited(id));

        assert_eq!(*seen.lock().unwrap(), vec![StatePath::UiVisitedPosts]);
        assert!(store.ui().visited.contains(&id));
    }

    #[test]
    fn test_watermark_writes_are_untracked() {
        let store = Store::new();
        store.add_feed(feed("https://a.example"));
        let seen = recorder(&store);
        let early = DateTime::<Utc>::UNIX_EPOCH;
        let late = Utc::now();

        store.init_checked("https://a.example", late);
        store.init_checked("https://a.example", early);
        assert_eq!(store.last_checked("https://a.example"), Some(late));

        assert!(store.record_checked("https://a.example", early));
        assert_eq!(store.last_checked("https://a.example"), Some(early));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_watermark_requires_registered_feed() {
        let store = Store::new();

        assert!(!store.record_checked("https://unknown.example", Utc::now()));
        store.init_checked("https://unknown.example", Utc::now());

        assert!(store.last_checked("https://unknown.example").is_none());
        assert!(store.snapshot().last_checked.is_empty());
    }

    #[test]
    fn test_reentrant_write_notifies_before_outer_returns() {
        let store = Store::new();
        let seen = recorder(&store);

        // Opening the modal marks the entry visited from inside the callback
        let id = Uuid::new_v4();
        store.subscribe(move |path: StatePath, store: &Store| {
            if path == StatePath::UiModal {
                store.mark_visited(id);
            }
        });

        store.set_modal(None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatePath::UiModal, StatePath::UiVisitedPosts]
        );
        assert!(store.ui().visited.contains(&id));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Store::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = store.subscribe(move |_: StatePath, _: &Store| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set_form(FormState::default());
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_form(FormState::default());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_reads_new_value() {
        let store = Store::new();
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        store.subscribe(move |_: StatePath, store: &Store| {
            *sink.lock().unwrap() = Some(store.form());
        });

        store.set_form(FormState::rejected("nope", ErrorKind::InvalidUrl));

        let form = observed.lock().unwrap().clone().unwrap();
        assert!(!form.valid);
        assert_eq!(form.error, Some(ErrorKind::InvalidUrl));
        assert_eq!(form.url, "nope");
    }
}

//! In-memory collaborators for engine and scheduler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use crate::engine::Clock;
use crate::feed::Fetcher;
use crate::state::{StatePath, Store};
use crate::{Error, Result};

/// Fetcher serving canned bodies per URL
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, std::result::Result<String, String>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch consumes one permit from `gate` before answering
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(body.into()));
    }

    pub fn fail(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err("connection refused".to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| Error::Network(e.to_string()))?
                .forget();
        }

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(Ok(body)) => Ok(Bytes::from(body)),
            Some(Err(message)) => Err(Error::Network(message)),
            None => Err(Error::Network(format!("no route to {}", url))),
        }
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Minimal RSS 2.0 document with the given items in order
pub fn rss_document(title: &str, items: &[(&str, Option<DateTime<Utc>>)]) -> String {
    let items: String = items
        .iter()
        .map(|(item_title, published)| {
            let pub_date = published
                .map(|date| format!("<pubDate>{}</pubDate>", date.to_rfc2822()))
                .unwrap_or_default();
            format!(
                "<item><title>{0}</title><link>https://example.com/{0}</link>\
                 <description>About {0}</description>{1}</item>",
                item_title, pub_date
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>{}</title>\
         <link>https://example.com</link><description>Test feed</description>{}</channel></rss>",
        title, items
    )
}

/// Subscribe a recorder that collects every notified path
pub fn record_paths(store: &Store) -> Arc<Mutex<Vec<StatePath>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |path: StatePath, _: &Store| sink.lock().unwrap().push(path));
    seen
}

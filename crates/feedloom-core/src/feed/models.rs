use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered feed. Never mutated after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub description: String,
}

impl Feed {
    /// Build a feed with a fresh id from parsed metadata
    pub fn new(url: impl Into<String>, parsed: &ParsedFeed) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: parsed.title.clone(),
            description: parsed.description.clone(),
        }
    }
}

/// One item of a feed, owned by the feed referenced by `feed_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Tag a parsed entry with a fresh id and its owning feed
    pub fn from_parsed(feed_id: Uuid, parsed: ParsedEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id,
            title: parsed.title,
            link: parsed.link,
            description: parsed.description,
            published_at: parsed.published_at,
        }
    }

    /// Summary shown in the detail view
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            entry_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            link: self.link.clone(),
        }
    }
}

/// Content of the entry detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub entry_id: Uuid,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Feed document as produced by a [`FeedParser`](super::FeedParser)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    /// Entries in feed-declared order
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl ParsedEntry {
    /// Whether this entry was published strictly after `watermark`.
    ///
    /// Entries without a publish timestamp are never newer than anything.
    pub fn is_newer_than(&self, watermark: DateTime<Utc>) -> bool {
        self.published_at.is_some_and(|published| published > watermark)
    }
}

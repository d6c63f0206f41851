use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::models::{ParsedEntry, ParsedFeed};
use crate::{Error, Result};

const UNTITLED_FEED: &str = "Untitled feed";
const UNTITLED_ENTRY: &str = "Untitled";
const TEXT_WIDTH: usize = 80;

/// Turns raw feed content into a [`ParsedFeed`]
pub trait FeedParser: Send + Sync {
    fn parse(&self, content: &[u8]) -> Result<ParsedFeed>;
}

/// RSS 0.9x/1.0/2.0, Atom and JSON Feed parser backed by feed-rs
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedRsParser;

impl FeedParser for FeedRsParser {
    fn parse(&self, content: &[u8]) -> Result<ParsedFeed> {
        parse_feed(content)
    }
}

/// Parse RSS/Atom feed content into structured data
pub fn parse_feed(content: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(content)
        .map_err(|e| Error::FeedParse(e.to_string()))?;

    let title = feed.title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_FEED.to_string());

    let description = feed.description
        .map(|d| html_to_text(&d.content))
        .unwrap_or_default();

    let entries = feed.entries.into_iter().map(|entry| {
        let title = entry.title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_ENTRY.to_string());

        let link = entry.links.first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let description = entry.summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|html| html_to_text(&html))
            .unwrap_or_default();

        let published_at = entry.published
            .or(entry.updated)
            .map(|dt| DateTime::<Utc>::from(dt));

        ParsedEntry {
            title,
            link,
            description,
            published_at,
        }
    }).collect();

    Ok(ParsedFeed {
        title,
        description,
        entries,
    })
}

/// Convert HTML content to plain text
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .unwrap_or_else(|_| html.to_string())
        .trim()
        .to_string()
}

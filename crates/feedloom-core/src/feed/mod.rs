mod fetcher;
mod models;
mod parser;

pub use fetcher::{Fetcher, HttpFetcher};
pub use models::{Entry, EntrySummary, Feed, ParsedEntry, ParsedFeed};
pub use parser::{parse_feed, FeedParser, FeedRsParser};

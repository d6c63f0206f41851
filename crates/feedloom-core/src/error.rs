use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reason a feed registration was rejected.
///
/// This is the discriminated failure surfaced to whoever submitted the URL,
/// and the value stored in the form state so renderers can show feedback.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("URL must not be empty")]
    Empty,

    #[error("Link must be a valid URL")]
    InvalidUrl,

    #[error("Feed is already registered")]
    Duplicate,

    #[error("Network error while fetching the feed")]
    Network,

    #[error("Resource does not contain a valid feed")]
    Parse,
}

impl ErrorKind {
    /// Translation key for this failure, for renderers that localize feedback
    pub fn message_key(&self) -> &'static str {
        match self {
            ErrorKind::Empty => "feedback.notEmpty",
            ErrorKind::InvalidUrl => "feedback.invalidUrl",
            ErrorKind::Duplicate => "feedback.alreadyExists",
            ErrorKind::Network => "feedback.networkError",
            ErrorKind::Parse => "feedback.rssParsingError",
        }
    }

    /// Whether the failure happened before any network activity
    pub fn is_validation(&self) -> bool {
        matches!(self, ErrorKind::Empty | ErrorKind::InvalidUrl | ErrorKind::Duplicate)
    }
}

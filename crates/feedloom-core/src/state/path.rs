use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level state path reported to subscribers after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatePath {
    Form,
    Feeds,
    Posts,
    UiModal,
    UiVisitedPosts,
}

impl StatePath {
    pub const ALL: [StatePath; 5] = [
        StatePath::Form,
        StatePath::Feeds,
        StatePath::Posts,
        StatePath::UiModal,
        StatePath::UiVisitedPosts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatePath::Form => "form",
            StatePath::Feeds => "feeds",
            StatePath::Posts => "posts",
            StatePath::UiModal => "uiState.modal",
            StatePath::UiVisitedPosts => "uiState.visitedPosts",
        }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

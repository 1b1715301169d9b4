use serde::{Deserialize, Serialize};

/// Which list a spawned feed machine loads for its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedKind {
    Followers,
    Activities,
}

impl FeedKind {
    pub fn label(self) -> &'static str {
        match self {
            FeedKind::Followers => "followers",
            FeedKind::Activities => "activities",
        }
    }
}

/// One row of a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One collected post. Flat on purpose: this is the record shape handed to exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub account: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub share_count: u64,
    /// Remote identifier when the service supplies one. Not used for dedup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
}

impl Post {
    pub fn engagement(&self) -> u64 {
        self.like_count.saturating_add(self.share_count)
    }
}

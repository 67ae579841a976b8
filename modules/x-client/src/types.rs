use chrono::{DateTime, Utc};
use serde::Deserialize;

// --- Request shapes ---

/// Timeline items the API can be asked to leave out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeKind {
    Retweets,
    Replies,
}

impl ExcludeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeKind::Retweets => "retweets",
            ExcludeKind::Replies => "replies",
        }
    }
}

/// Parameters for `GET /2/users/{id}/tweets`.
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    pub max_results: u32,
    pub tweet_fields: Vec<String>,
    pub exclude: Vec<ExcludeKind>,
}

impl TimelineQuery {
    /// The API rejects `max_results` outside 5..=100.
    pub const MIN_RESULTS: u32 = 5;
    pub const MAX_RESULTS: u32 = 100;

    /// Most recent original posts with creation time and engagement metrics.
    pub fn recent_originals(limit: u32) -> Self {
        Self {
            max_results: limit,
            tweet_fields: vec!["created_at".to_string(), "public_metrics".to_string()],
            exclude: vec![ExcludeKind::Retweets, ExcludeKind::Replies],
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let clamped = self
            .max_results
            .clamp(Self::MIN_RESULTS, Self::MAX_RESULTS);
        let mut params = vec![("max_results", clamped.to_string())];
        if !self.tweet_fields.is_empty() {
            params.push(("tweet.fields", self.tweet_fields.join(",")));
        }
        if !self.exclude.is_empty() {
            let kinds: Vec<&str> = self.exclude.iter().map(|k| k.as_str()).collect();
            params.push(("exclude", kinds.join(",")));
        }
        params
    }
}

// --- Response shapes ---

/// An error object from the `errors` array of a v2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
}

/// Response of `GET /2/users/by/username/{username}`.
/// A missing user comes back as 200 with only `errors` populated.
#[derive(Debug, Clone, Deserialize)]
pub struct UserLookupResponse {
    pub data: Option<XUser>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XUser {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

/// Response of `GET /2/users/{id}/tweets`. `data` is absent when the timeline is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    pub data: Option<Vec<Tweet>>,
    pub meta: Option<TimelineMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineMeta {
    pub result_count: Option<u32>,
}

/// A single post from a user timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

impl Tweet {
    pub fn like_count(&self) -> u64 {
        self.public_metrics.as_ref().map(|m| m.like_count).unwrap_or(0)
    }

    pub fn retweet_count(&self) -> u64 {
        self.public_metrics.as_ref().map(|m| m.retweet_count).unwrap_or(0)
    }
}

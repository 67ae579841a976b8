pub mod error;
pub mod types;

pub use error::{Result, XError};
pub use types::{
    ApiProblem, ExcludeKind, PublicMetrics, TimelineMeta, TimelineQuery, TimelineResponse,
    Tweet, UserLookupResponse, XUser,
};

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

const BASE_URL: &str = "https://api.twitter.com/2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct XClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl XClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Look up a user by handle. Returns `Ok(None)` when the account does not exist.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<XUser>> {
        tracing::debug!(username, "Looking up X user");

        let url = format!("{}/users/by/username/{}", self.base_url, username);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        // Suspended/unknown handles sometimes surface as a bare 404 instead of an errors array.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;

        let lookup: UserLookupResponse = serde_json::from_str(&resp.text().await?)?;
        if lookup.data.is_none() {
            if let Some(problem) = lookup.errors.first() {
                tracing::debug!(
                    username,
                    title = problem.title.as_deref().unwrap_or(""),
                    detail = problem.detail.as_deref().unwrap_or(""),
                    "X user lookup returned no data"
                );
            }
        }
        Ok(lookup.data)
    }

    /// Fetch the most recent posts of a user. The result is truncated to
    /// `query.max_results` because the API enforces a floor of 5.
    pub async fn get_user_tweets(&self, user_id: &str, query: &TimelineQuery) -> Result<Vec<Tweet>> {
        tracing::debug!(user_id, max_results = query.max_results, "Fetching X user timeline");

        let url = format!("{}/users/{}/tweets", self.base_url, user_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query.to_params())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let timeline: TimelineResponse = serde_json::from_str(&resp.text().await?)?;
        let result_count = timeline.meta.and_then(|meta| meta.result_count);
        let mut tweets = timeline.data.unwrap_or_default();
        tweets.truncate(query.max_results as usize);
        tracing::debug!(user_id, count = tweets.len(), ?result_count, "Fetched X timeline");

        Ok(tweets)
    }
}

/// Map non-success responses to `XError`, pulling a retry hint out of 429 headers.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after_from_headers(resp.headers(), Utc::now());
        return Err(XError::RateLimited { retry_after });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(XError::Api {
        status: status.as_u16(),
        message: body,
    })
}

/// Prefer `retry-after` (seconds); fall back to `x-rate-limit-reset` (epoch seconds).
pub fn retry_after_from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header_u64("retry-after") {
        return Some(Duration::from_secs(secs));
    }
    header_u64("x-rate-limit-reset").map(|reset| {
        let now_secs = now.timestamp().max(0) as u64;
        Duration::from_secs(reset.saturating_sub(now_secs))
    })
}

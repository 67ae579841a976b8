use std::time::Duration;

use tracing::{debug, info, warn};

use roundup_common::Post;

use crate::error::ServiceError;
use crate::traits::{AccountService, PostQuery};

/// Result of one lookup + fetch attempt for a single account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(Vec<Post>),
    NotFound,
    RateLimited(Option<Duration>),
    HardError(String),
}

impl FetchOutcome {
    fn from_error(err: ServiceError) -> Self {
        match err {
            ServiceError::RateLimited { retry_after } => FetchOutcome::RateLimited(retry_after),
            ServiceError::Remote(cause) => FetchOutcome::HardError(cause),
        }
    }
}

/// Resolves one handle and pulls its most recent original posts.
///
/// Every call re-issues the full lookup; nothing is carried over from an
/// earlier rate-limited attempt.
pub struct AccountFetcher<'a> {
    service: &'a dyn AccountService,
    query: PostQuery,
}

impl<'a> AccountFetcher<'a> {
    pub fn new(service: &'a dyn AccountService, posts_per_account: u32) -> Self {
        Self {
            service,
            query: PostQuery::recent_originals(posts_per_account),
        }
    }

    pub async fn fetch(&self, handle: &str) -> FetchOutcome {
        debug!(handle, "Looking up account");
        let account_id = match self.service.resolve_handle(handle).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(handle, "Account not found");
                return FetchOutcome::NotFound;
            }
            Err(e) => return self.classify(handle, "lookup", e),
        };

        debug!(handle, account_id = account_id.as_str(), "Fetching recent posts");
        match self
            .service
            .recent_posts(&account_id, handle, &self.query)
            .await
        {
            Ok(mut posts) => {
                posts.truncate(self.query.limit as usize);
                if posts.is_empty() {
                    info!(handle, "No posts returned");
                }
                FetchOutcome::Success(posts)
            }
            Err(e) => self.classify(handle, "posts", e),
        }
    }

    fn classify(&self, handle: &str, stage: &str, err: ServiceError) -> FetchOutcome {
        let outcome = FetchOutcome::from_error(err);
        if let FetchOutcome::HardError(cause) = &outcome {
            warn!(handle, stage, error = cause.as_str(), "Fetch failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post_at, MockService, Scripted};
    use chrono::{TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn success_returns_posts() {
        let service = MockService::new().script(
            "karpathy",
            vec![Scripted::Posts(vec![post_at("karpathy", t0())])],
        );
        let outcome = AccountFetcher::new(&service, 10).fetch("karpathy").await;
        assert_eq!(outcome, FetchOutcome::Success(vec![post_at("karpathy", t0())]));
    }

    #[tokio::test]
    async fn unknown_handle_is_not_found() {
        let service = MockService::new().script("ghost", vec![Scripted::NotFound]);
        let outcome = AccountFetcher::new(&service, 10).fetch("ghost").await;
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(service.post_calls("ghost"), 0);
    }

    #[tokio::test]
    async fn lookup_rate_limit_is_reported() {
        let service = MockService::new().script(
            "sama",
            vec![Scripted::LookupRateLimited(Some(Duration::from_secs(60)))],
        );
        let outcome = AccountFetcher::new(&service, 10).fetch("sama").await;
        assert_eq!(outcome, FetchOutcome::RateLimited(Some(Duration::from_secs(60))));
    }

    #[tokio::test]
    async fn posts_rate_limit_is_reported_like_lookup() {
        let service = MockService::new().script("sama", vec![Scripted::PostsRateLimited]);
        let outcome = AccountFetcher::new(&service, 10).fetch("sama").await;
        assert_eq!(outcome, FetchOutcome::RateLimited(None));
        assert_eq!(service.lookup_calls("sama"), 1);
        assert_eq!(service.post_calls("sama"), 1);
    }

    #[tokio::test]
    async fn other_errors_are_hard() {
        let service = MockService::new().script("gdb", vec![Scripted::Error("401 Unauthorized".into())]);
        let outcome = AccountFetcher::new(&service, 10).fetch("gdb").await;
        assert_eq!(outcome, FetchOutcome::HardError("401 Unauthorized".into()));
    }

    #[tokio::test]
    async fn posts_listing_error_is_hard() {
        let service = MockService::new()
            .script("ylecun", vec![Scripted::PostsError("503 Service Unavailable".into())]);
        let outcome = AccountFetcher::new(&service, 10).fetch("ylecun").await;
        assert_eq!(outcome, FetchOutcome::HardError("503 Service Unavailable".into()));
        assert_eq!(service.lookup_calls("ylecun"), 1);
        assert_eq!(service.post_calls("ylecun"), 1);
    }

    #[tokio::test]
    async fn empty_timeline_is_success() {
        let service = MockService::new().script("quiet", vec![Scripted::Posts(vec![])]);
        let outcome = AccountFetcher::new(&service, 10).fetch("quiet").await;
        assert_eq!(outcome, FetchOutcome::Success(vec![]));
    }

    #[tokio::test]
    async fn result_is_bounded_by_limit() {
        let posts = (0..8).map(|i| post_at("busy", t0() - chrono::Duration::minutes(i))).collect();
        let service = MockService::new().script("busy", vec![Scripted::Posts(posts)]);
        match AccountFetcher::new(&service, 3).fetch("busy").await {
            FetchOutcome::Success(posts) => assert_eq!(posts.len(), 3),
            other => panic!("expected Success, got {other:?}"),
        }
    }
}

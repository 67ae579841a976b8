// Trait seams for the collection engine.
//
// AccountService — the remote account-data service (X API in production).
// Sleeper — the only place the engine suspends; tests swap in a recorder.

use std::time::Duration;

use async_trait::async_trait;

use roundup_common::Post;
use x_client::{TimelineQuery, XClient};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// AccountService
// ---------------------------------------------------------------------------

/// What to ask for when listing an account's recent posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub limit: u32,
    pub exclude_reposts: bool,
    pub exclude_replies: bool,
}

impl PostQuery {
    pub fn recent_originals(limit: u32) -> Self {
        Self {
            limit,
            exclude_reposts: true,
            exclude_replies: true,
        }
    }
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Resolve a handle to the service's account id. `Ok(None)` means the account does not exist.
    async fn resolve_handle(&self, handle: &str) -> Result<Option<String>, ServiceError>;

    /// Most recent posts for a resolved account, newest first.
    async fn recent_posts(
        &self,
        account_id: &str,
        handle: &str,
        query: &PostQuery,
    ) -> Result<Vec<Post>, ServiceError>;
}

#[async_trait]
impl AccountService for XClient {
    async fn resolve_handle(&self, handle: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.get_user_by_username(handle).await?.map(|user| user.id))
    }

    async fn recent_posts(
        &self,
        account_id: &str,
        handle: &str,
        query: &PostQuery,
    ) -> Result<Vec<Post>, ServiceError> {
        let mut timeline = TimelineQuery::recent_originals(query.limit);
        timeline.exclude.retain(|kind| match kind {
            x_client::ExcludeKind::Retweets => query.exclude_reposts,
            x_client::ExcludeKind::Replies => query.exclude_replies,
        });

        let tweets = self.get_user_tweets(account_id, &timeline).await?;
        Ok(tweets
            .into_iter()
            .filter_map(|t| {
                // Without a timestamp the post can never be placed in a window.
                let created_at = t.created_at?;
                Some(Post {
                    account: handle.to_string(),
                    like_count: t.like_count(),
                    share_count: t.retweet_count(),
                    text: t.text,
                    created_at,
                    platform_id: Some(t.id),
                })
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping on the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

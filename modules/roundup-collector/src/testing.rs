// Test doubles for the collection engine.
//
// - MockService (AccountService): per-handle scripted outcome queues
// - RecordingSleeper (Sleeper): returns at once, remembers every requested wait
//
// Plus small builders for posts.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roundup_common::Post;

use crate::cancel::CancelFlag;
use crate::error::ServiceError;
use crate::traits::{AccountService, PostQuery, Sleeper};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn post_at(account: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        account: account.to_string(),
        text: format!("{account} at {}", created_at.to_rfc3339()),
        created_at,
        like_count: 0,
        share_count: 0,
        platform_id: None,
    }
}

pub fn post_with_engagement(
    account: &str,
    created_at: DateTime<Utc>,
    like_count: u64,
    share_count: u64,
) -> Post {
    Post {
        like_count,
        share_count,
        ..post_at(account, created_at)
    }
}

// ---------------------------------------------------------------------------
// MockService
// ---------------------------------------------------------------------------

/// One scripted response to a full lookup + fetch attempt.
#[derive(Debug, Clone)]
pub enum Scripted {
    Posts(Vec<Post>),
    NotFound,
    LookupRateLimited(Option<Duration>),
    PostsRateLimited,
    /// Lookup fails with a remote error.
    Error(String),
    /// Lookup succeeds, the post listing fails with a remote error.
    PostsError(String),
}

/// Scripted account service. Each attempt for a handle pops the next entry;
/// the last entry repeats forever. Unscripted handles fail with a remote error.
pub struct MockService {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    current: Mutex<HashMap<String, Scripted>>,
    lookups: Mutex<Vec<String>>,
    post_calls: Mutex<HashMap<String, u32>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            current: Mutex::new(HashMap::new()),
            lookups: Mutex::new(Vec::new()),
            post_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, handle: &str, outcomes: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(handle.to_string(), outcomes.into());
        self
    }

    /// Every handle in `handles` returns `posts_for(handle)` on first try.
    pub fn all_succeed<F>(mut self, handles: &[&str], posts_for: F) -> Self
    where
        F: Fn(&str) -> Vec<Post>,
    {
        for handle in handles {
            self = self.script(handle, vec![Scripted::Posts(posts_for(handle))]);
        }
        self
    }

    /// Handles in the order their lookups were issued, one entry per attempt.
    pub fn lookup_order(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self, handle: &str) -> u32 {
        self.lookups
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.as_str() == handle)
            .count() as u32
    }

    pub fn post_calls(&self, handle: &str) -> u32 {
        self.post_calls
            .lock()
            .unwrap()
            .get(handle)
            .copied()
            .unwrap_or(0)
    }

    fn next(&self, handle: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(handle)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountService for MockService {
    async fn resolve_handle(&self, handle: &str) -> Result<Option<String>, ServiceError> {
        self.lookups.lock().unwrap().push(handle.to_string());

        let step = self.next(handle).ok_or_else(|| {
            ServiceError::Remote(format!("MockService: no script for {handle}"))
        })?;
        let result = match &step {
            Scripted::NotFound => Ok(None),
            Scripted::LookupRateLimited(retry_after) => Err(ServiceError::RateLimited {
                retry_after: *retry_after,
            }),
            Scripted::Error(msg) => Err(ServiceError::Remote(msg.clone())),
            Scripted::Posts(_) | Scripted::PostsRateLimited | Scripted::PostsError(_) => {
                Ok(Some(format!("id-{handle}")))
            }
        };
        self.current.lock().unwrap().insert(handle.to_string(), step);
        result
    }

    async fn recent_posts(
        &self,
        _account_id: &str,
        handle: &str,
        query: &PostQuery,
    ) -> Result<Vec<Post>, ServiceError> {
        *self
            .post_calls
            .lock()
            .unwrap()
            .entry(handle.to_string())
            .or_insert(0) += 1;

        match self.current.lock().unwrap().get(handle) {
            Some(Scripted::Posts(posts)) => {
                Ok(posts.iter().take(query.limit as usize).cloned().collect())
            }
            Some(Scripted::PostsRateLimited) => Err(ServiceError::RateLimited { retry_after: None }),
            Some(Scripted::PostsError(msg)) => Err(ServiceError::Remote(msg.clone())),
            _ => Err(ServiceError::Remote(format!(
                "MockService: posts requested for unresolved {handle}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Never actually sleeps. Optionally raises a cancel flag when the n-th wait
/// (1-based) is requested, to simulate an operator interrupt mid-run.
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
    cancel_at: Option<(usize, CancelFlag)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            cancel_at: None,
        }
    }

    pub fn cancel_on_wait(mut self, nth: usize, flag: CancelFlag) -> Self {
        self.cancel_at = Some((nth, flag));
        self
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Default for RecordingSleeper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut waits = self.waits.lock().unwrap();
            waits.push(duration);
            waits.len()
        };
        if let Some((nth, flag)) = &self.cancel_at {
            if count == *nth {
                flag.cancel();
            }
        }
    }
}

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use roundup_common::{CollectorSettings, Post};

use crate::backoff::BackoffPolicy;
use crate::cancel::CancelFlag;
use crate::fetcher::{AccountFetcher, FetchOutcome};
use crate::run_log::{EventKind, RunLog};
use crate::traits::{AccountService, Sleeper};

/// Why an account produced no posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    HardError(String),
    RetriesExhausted,
    Cancelled,
}

/// Terminal value of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Posts(Vec<Post>),
    Skipped(SkipReason),
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Posts(_) => "posts",
            Resolution::Skipped(SkipReason::NotFound) => "not_found",
            Resolution::Skipped(SkipReason::HardError(_)) => "hard_error",
            Resolution::Skipped(SkipReason::RetriesExhausted) => "retries_exhausted",
            Resolution::Skipped(SkipReason::Cancelled) => "cancelled",
        }
    }

    pub fn posts(&self) -> &[Post] {
        match self {
            Resolution::Posts(posts) => posts,
            Resolution::Skipped(_) => &[],
        }
    }
}

/// Per-account state while the scheduler walks the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    Pending,
    Attempting { attempt: u32 },
    Resolved(Resolution),
}

/// What to do after one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Resolve(Resolution),
    Retry { retry_after: Option<Duration> },
}

/// Map a fetch outcome to the next step. Only rate limiting is retried, and
/// only while `attempt < max_attempts`.
pub fn transition(attempt: u32, outcome: FetchOutcome, max_attempts: u32) -> Transition {
    match outcome {
        FetchOutcome::Success(posts) => Transition::Resolve(Resolution::Posts(posts)),
        FetchOutcome::NotFound => Transition::Resolve(Resolution::Skipped(SkipReason::NotFound)),
        FetchOutcome::HardError(cause) => {
            Transition::Resolve(Resolution::Skipped(SkipReason::HardError(cause)))
        }
        FetchOutcome::RateLimited(_) if attempt >= max_attempts => {
            Transition::Resolve(Resolution::Skipped(SkipReason::RetriesExhausted))
        }
        FetchOutcome::RateLimited(retry_after) => Transition::Retry { retry_after },
    }
}

/// A resolved account with what it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub handle: String,
    /// Fetch attempts actually issued. Zero when cancelled before the first one.
    pub attempts: u32,
    /// Backoff waits taken between attempts, in order.
    pub waits: Vec<Duration>,
    pub resolution: Resolution,
}

/// Split the roster into consecutive batches of `batch_size`, keeping order.
pub fn partition<T: Clone>(roster: &[T], batch_size: usize) -> Vec<Vec<T>> {
    roster
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub posts_per_account: u32,
    pub account_delay: Duration,
    pub batch_delay: Duration,
    pub backoff: BackoffPolicy,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            max_attempts: settings.max_attempts,
            posts_per_account: settings.posts_per_account,
            account_delay: settings.account_delay,
            batch_delay: settings.batch_delay,
            backoff: BackoffPolicy::from_settings(settings),
        }
    }
}

/// Walks the roster batch by batch, one account at a time, retrying rate-limited
/// accounts with backoff and pacing between accounts and batches.
pub struct BatchScheduler<'a> {
    service: &'a dyn AccountService,
    sleeper: &'a dyn Sleeper,
    cancel: CancelFlag,
    config: SchedulerConfig,
    rng: StdRng,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(
        service: &'a dyn AccountService,
        sleeper: &'a dyn Sleeper,
        cancel: CancelFlag,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            service,
            sleeper,
            cancel,
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed jitter seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Resolve every account in the roster. Always returns one entry per
    /// roster handle, in roster order.
    pub async fn run(&mut self, roster: &[String], log: &mut RunLog) -> Vec<ResolvedAccount> {
        let batches = partition(roster, self.config.batch_size);
        let total_batches = batches.len();
        let mut resolved = Vec::with_capacity(roster.len());

        for (batch_idx, batch) in batches.iter().enumerate() {
            if !self.cancel.is_cancelled() {
                info!(
                    batch = batch_idx + 1,
                    total_batches,
                    accounts = batch.len(),
                    "Processing batch"
                );
                log.log(EventKind::BatchStarted {
                    batch: batch_idx as u32 + 1,
                    total_batches: total_batches as u32,
                    accounts: batch.len() as u32,
                });
            }

            for (account_idx, handle) in batch.iter().enumerate() {
                let account = self.resolve_account(handle, log).await;
                log.log(EventKind::AccountResolved {
                    handle: account.handle.clone(),
                    attempts: account.attempts,
                    outcome: account.resolution.label().to_string(),
                    posts: account.resolution.posts().len() as u32,
                });
                resolved.push(account);

                if account_idx + 1 < batch.len() {
                    self.pace("account", self.config.account_delay, log).await;
                }
            }

            if batch_idx + 1 < total_batches {
                if !self.cancel.is_cancelled() {
                    info!(
                        wait_secs = self.config.batch_delay.as_secs(),
                        "Batch complete, pausing before next batch"
                    );
                }
                self.pace("batch", self.config.batch_delay, log).await;
            }
        }

        resolved
    }

    async fn resolve_account(&mut self, handle: &str, log: &mut RunLog) -> ResolvedAccount {
        let fetcher = AccountFetcher::new(self.service, self.config.posts_per_account);
        let mut attempts = 0;
        let mut waits = Vec::new();
        let mut state = AccountState::Pending;

        loop {
            state = match state {
                AccountState::Pending => AccountState::Attempting { attempt: 1 },
                AccountState::Attempting { .. } if self.cancel.is_cancelled() => {
                    debug!(handle, "Run cancelled, skipping account");
                    AccountState::Resolved(Resolution::Skipped(SkipReason::Cancelled))
                }
                AccountState::Attempting { attempt } => {
                    attempts = attempt;
                    info!(handle, attempt, max_attempts = self.config.max_attempts, "Fetching account");
                    log.log(EventKind::AccountAttempt {
                        handle: handle.to_string(),
                        attempt,
                    });

                    let outcome = fetcher.fetch(handle).await;
                    match transition(attempt, outcome, self.config.max_attempts) {
                        Transition::Resolve(resolution) => AccountState::Resolved(resolution),
                        Transition::Retry { retry_after } => {
                            let wait = self.backoff_wait(attempt, retry_after);
                            warn!(
                                handle,
                                attempt,
                                max_attempts = self.config.max_attempts,
                                wait_secs = wait.as_secs_f64(),
                                "Rate limited, backing off before retry"
                            );
                            log.log(EventKind::RateLimited {
                                handle: handle.to_string(),
                                attempt,
                                wait_ms: wait.as_millis() as u64,
                                retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
                            });
                            waits.push(wait);

                            if self.suspend(wait).await {
                                AccountState::Attempting {
                                    attempt: attempt + 1,
                                }
                            } else {
                                AccountState::Resolved(Resolution::Skipped(SkipReason::Cancelled))
                            }
                        }
                    }
                }
                AccountState::Resolved(resolution) => {
                    match &resolution {
                        Resolution::Posts(posts) => {
                            info!(handle, attempts, posts = posts.len(), "Account resolved")
                        }
                        Resolution::Skipped(SkipReason::RetriesExhausted) => {
                            warn!(handle, attempts, "Retries exhausted, skipping account")
                        }
                        Resolution::Skipped(reason) => {
                            info!(handle, attempts, ?reason, "Account skipped")
                        }
                    }
                    return ResolvedAccount {
                        handle: handle.to_string(),
                        attempts,
                        waits,
                        resolution,
                    };
                }
            };
        }
    }

    /// Backoff for the retry following `attempt`, stretched to the service's
    /// retry hint when that is longer, never beyond the cap.
    fn backoff_wait(&mut self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let policy = self.config.backoff;
        let delay = policy.delay(attempt, &mut self.rng);
        match retry_after {
            Some(hint) => delay.max(hint.min(policy.cap)),
            None => delay,
        }
    }

    async fn pace(&self, scope: &str, wait: Duration, log: &mut RunLog) {
        if wait.is_zero() || self.cancel.is_cancelled() {
            return;
        }
        debug!(scope, wait_secs = wait.as_secs_f64(), "Pacing delay");
        log.log(EventKind::PacingDelay {
            scope: scope.to_string(),
            wait_ms: wait.as_millis() as u64,
        });
        self.suspend(wait).await;
    }

    /// Sleep unless cancelled first. Returns false if the run was cancelled.
    async fn suspend(&self, wait: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = self.sleeper.sleep(wait) => {}
            _ = self.cancel.cancelled() => {}
        }
        !self.cancel.is_cancelled()
    }
}

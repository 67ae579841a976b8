use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use roundup_common::CollectorSettings;

use crate::aggregator::{aggregate, CollectionResult};
use crate::cancel::CancelFlag;
use crate::run_log::{EventKind, RunLog};
use crate::scheduler::{BatchScheduler, Resolution, ResolvedAccount, SchedulerConfig, SkipReason};
use crate::traits::{AccountService, Sleeper};
use crate::window::TimeWindow;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub accounts_total: u32,
    pub accounts_attempted: u32,
    pub succeeded: u32,
    pub not_found: u32,
    pub hard_errors: u32,
    pub retries_exhausted: u32,
    pub cancelled: u32,
    pub rate_limit_waits: u32,
    pub posts_fetched: u32,
    pub posts_collected: u32,
}

impl RunStats {
    fn tally(resolved: &[ResolvedAccount], result: &CollectionResult) -> Self {
        let mut stats = RunStats {
            accounts_total: resolved.len() as u32,
            accounts_attempted: result.accounts_attempted as u32,
            posts_collected: result.total_collected() as u32,
            ..RunStats::default()
        };
        for account in resolved {
            stats.rate_limit_waits += account.waits.len() as u32;
            match &account.resolution {
                Resolution::Posts(posts) => {
                    stats.succeeded += 1;
                    stats.posts_fetched += posts.len() as u32;
                }
                Resolution::Skipped(SkipReason::NotFound) => stats.not_found += 1,
                Resolution::Skipped(SkipReason::HardError(_)) => stats.hard_errors += 1,
                Resolution::Skipped(SkipReason::RetriesExhausted) => stats.retries_exhausted += 1,
                Resolution::Skipped(SkipReason::Cancelled) => stats.cancelled += 1,
            }
        }
        stats
    }

    pub fn skipped(&self) -> u32 {
        self.not_found + self.hard_errors + self.retries_exhausted + self.cancelled
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Collection Run Complete ===")?;
        writeln!(f, "Accounts:           {}", self.accounts_total)?;
        writeln!(f, "  attempted:        {}", self.accounts_attempted)?;
        writeln!(f, "  succeeded:        {}", self.succeeded)?;
        writeln!(f, "  not found:        {}", self.not_found)?;
        writeln!(f, "  hard errors:      {}", self.hard_errors)?;
        writeln!(f, "  retries exhausted: {}", self.retries_exhausted)?;
        writeln!(f, "  cancelled:        {}", self.cancelled)?;
        writeln!(f, "Rate-limit waits:   {}", self.rate_limit_waits)?;
        writeln!(f, "Posts fetched:      {}", self.posts_fetched)?;
        writeln!(f, "Posts in window:    {}", self.posts_collected)?;
        Ok(())
    }
}

/// Everything a finished pass hands back.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: CollectionResult,
    pub stats: RunStats,
    pub accounts: Vec<ResolvedAccount>,
    pub cancelled: bool,
}

/// Drives one collection pass over the roster.
pub struct Collector<'a> {
    service: &'a dyn AccountService,
    sleeper: &'a dyn Sleeper,
    settings: CollectorSettings,
    cancel: CancelFlag,
    seed: Option<u64>,
}

impl<'a> Collector<'a> {
    pub fn new(
        service: &'a dyn AccountService,
        sleeper: &'a dyn Sleeper,
        settings: CollectorSettings,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            service,
            sleeper,
            settings,
            cancel,
            seed: None,
        }
    }

    /// Fix the backoff jitter seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run the pass with `now` as the end of the window. Never fails: per-account
    /// problems end up in the stats, cancellation returns what was resolved so far.
    pub async fn run(&self, now: DateTime<Utc>, log: &mut RunLog) -> RunReport {
        let window = TimeWindow::ending_at(now, self.settings.window);
        info!(
            cutoff = %window.cutoff,
            accounts = self.settings.roster.len(),
            "Collecting posts published since cutoff"
        );

        let mut scheduler = BatchScheduler::new(
            self.service,
            self.sleeper,
            self.cancel.clone(),
            SchedulerConfig::from_settings(&self.settings),
        );
        if let Some(seed) = self.seed {
            scheduler = scheduler.with_seed(seed);
        }

        let accounts = scheduler.run(&self.settings.roster, log).await;
        let result = aggregate(&window, &accounts);
        let stats = RunStats::tally(&accounts, &result);

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(
                unresolved = stats.cancelled,
                posts = stats.posts_collected,
                "Run cancelled, returning partial result"
            );
            log.log(EventKind::Cancelled {
                unresolved: stats.cancelled,
            });
        }
        if result.is_empty() {
            info!(
                window_hours = self.settings.window.as_secs() / 3600,
                "No posts found inside the window"
            );
        }

        RunReport {
            result,
            stats,
            accounts,
            cancelled,
        }
    }
}

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RoundupError;

/// Accounts collected when `ROUNDUP_ROSTER` is not set.
pub const DEFAULT_ROSTER: &[&str] = &[
    "sama",
    "gdb",
    "AndrewYNg",
    "drfeifei",
    "ylecun",
    "geoffreyhinton",
    "GaryMarcus",
    "lexfridman",
    "karpathy",
    "demishassabis",
];

/// Fixed parameters of one collection pass. Read once at run start.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Ordered account handles.
    pub roster: Vec<String>,
    pub batch_size: usize,
    /// Upper bound on fetch attempts per account, including the first.
    pub max_attempts: u32,
    pub posts_per_account: u32,
    pub account_delay: Duration,
    pub batch_delay: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub backoff_jitter: Duration,
    pub window: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            batch_size: 5,
            max_attempts: 5,
            posts_per_account: 10,
            account_delay: Duration::from_secs(2),
            batch_delay: Duration::from_secs(10),
            backoff_base: Duration::from_secs(30),
            backoff_cap: Duration::from_secs(15 * 60),
            backoff_jitter: Duration::from_secs(5),
            window: Duration::from_secs(12 * 3600),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub x_bearer_token: String,
    /// Root for exports and run logs.
    pub data_dir: PathBuf,
    /// Order exported posts by likes + shares instead of collection order.
    pub sort_by_engagement: bool,
    pub collector: CollectorSettings,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, RoundupError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing optional keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RoundupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let x_bearer_token = lookup("X_BEARER_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                RoundupError::Config("X_BEARER_TOKEN environment variable is required".into())
            })?;

        let defaults = CollectorSettings::default();

        let roster = match lookup("ROUNDUP_ROSTER") {
            Some(raw) => parse_roster(&raw),
            None => defaults.roster,
        };

        let secs = |key: &str, default: Duration| -> Result<Duration, RoundupError> {
            Ok(parse_opt::<u64>(&lookup, key)?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };

        let collector = CollectorSettings {
            roster,
            batch_size: parse_opt(&lookup, "ROUNDUP_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            max_attempts: parse_opt(&lookup, "ROUNDUP_MAX_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts),
            posts_per_account: parse_opt(&lookup, "ROUNDUP_POSTS_PER_ACCOUNT")?
                .unwrap_or(defaults.posts_per_account),
            account_delay: secs("ROUNDUP_ACCOUNT_DELAY_SECS", defaults.account_delay)?,
            batch_delay: secs("ROUNDUP_BATCH_DELAY_SECS", defaults.batch_delay)?,
            backoff_base: secs("ROUNDUP_BACKOFF_BASE_SECS", defaults.backoff_base)?,
            backoff_cap: secs("ROUNDUP_BACKOFF_CAP_SECS", defaults.backoff_cap)?,
            backoff_jitter: secs("ROUNDUP_BACKOFF_JITTER_SECS", defaults.backoff_jitter)?,
            window: match parse_opt::<u64>(&lookup, "ROUNDUP_WINDOW_HOURS")? {
                Some(hours) => hours
                    .checked_mul(3600)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        RoundupError::Config("ROUNDUP_WINDOW_HOURS is too large".into())
                    })?,
                None => defaults.window,
            },
        };

        if collector.batch_size == 0 {
            return Err(RoundupError::Config("ROUNDUP_BATCH_SIZE must be at least 1".into()));
        }
        if collector.max_attempts == 0 {
            return Err(RoundupError::Config("ROUNDUP_MAX_ATTEMPTS must be at least 1".into()));
        }

        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));

        let sort_by_engagement = match lookup("ROUNDUP_SORT").as_deref().map(str::trim) {
            None | Some("") | Some("collected") => false,
            Some("engagement") => true,
            Some(other) => {
                return Err(RoundupError::Config(format!(
                    "ROUNDUP_SORT must be \"collected\" or \"engagement\", got {other:?}"
                )))
            }
        };

        Ok(Self {
            x_bearer_token,
            data_dir,
            sort_by_engagement,
            collector,
        })
    }

    /// Log configuration with secrets truncated.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.len())
        }

        let c = &self.collector;
        tracing::info!("Config loaded:");
        tracing::info!("  X_BEARER_TOKEN: {}", preview(&self.x_bearer_token));
        tracing::info!("  DATA_DIR: {}", self.data_dir.display());
        tracing::info!("  ROUNDUP_SORT: {}", if self.sort_by_engagement { "engagement" } else { "collected" });
        tracing::info!(
            accounts = c.roster.len(),
            batch_size = c.batch_size,
            max_attempts = c.max_attempts,
            posts_per_account = c.posts_per_account,
            window_hours = c.window.as_secs() / 3600,
            "  collector"
        );
    }
}

fn parse_roster(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('@'))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, RoundupError>
where
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RoundupError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}

//! Collection run log: a JSON timeline of every attempt, wait and resolution in a pass.
//!
//! Each run produces `{DATA_DIR}/roundup-runs/{run_id}.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::collector::RunStats;

pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Debug, Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    BatchStarted {
        batch: u32,
        total_batches: u32,
        accounts: u32,
    },
    AccountAttempt {
        handle: String,
        attempt: u32,
    },
    RateLimited {
        handle: String,
        attempt: u32,
        wait_ms: u64,
        retry_after_ms: Option<u64>,
    },
    AccountResolved {
        handle: String,
        attempts: u32,
        outcome: String,
        posts: u32,
    },
    PacingDelay {
        scope: String,
        wait_ms: u64,
    },
    Cancelled {
        unresolved: u32,
    },
}

impl RunLog {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    pub fn events(&self) -> impl Iterator<Item = &EventKind> {
        self.events.iter().map(|e| &e.kind)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize the run log to JSON under `data_dir` and write it to disk.
    /// Returns the file path on success.
    pub fn save(&self, data_dir: &Path, stats: &RunStats) -> Result<PathBuf> {
        let dir = data_dir.join("roundup-runs");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));

        let output = SerializedRunLog {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats,
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = self.events.len(), "Run log saved");

        Ok(path)
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: &'a RunStats,
    events: &'a [RunEvent],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_sequenced() {
        let mut log = RunLog::new("run-1".into());
        log.log(EventKind::AccountAttempt {
            handle: "sama".into(),
            attempt: 1,
        });
        log.log(EventKind::PacingDelay {
            scope: "account".into(),
            wait_ms: 2000,
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.events[0].seq, 0);
        assert_eq!(log.events[1].seq, 1);
    }

    #[test]
    fn save_writes_tagged_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::new("run-2".into());
        log.log(EventKind::RateLimited {
            handle: "ylecun".into(),
            attempt: 1,
            wait_ms: 60_000,
            retry_after_ms: None,
        });
        let stats = RunStats {
            accounts_attempted: 1,
            retries_exhausted: 1,
            ..RunStats::default()
        };

        let path = log.save(dir.path(), &stats).unwrap();
        assert!(path.ends_with("roundup-runs/run-2.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["run_id"], "run-2");
        assert_eq!(json["stats"]["retries_exhausted"], 1);
        assert_eq!(json["events"][0]["type"], "rate_limited");
        assert_eq!(json["events"][0]["handle"], "ylecun");
        assert_eq!(json["events"][0]["wait_ms"], 60_000);
    }
}

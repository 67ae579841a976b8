// Flat JSON export of a collection result, for the summarization step downstream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::aggregator::CollectionResult;
use crate::collector::RunReport;
use crate::run_log::RunLog;

/// Where a finished run's outputs landed. Each write is attempted on its own,
/// so a failed export still leaves the run log behind.
#[derive(Debug)]
pub struct SavedRun {
    pub posts: Result<Option<PathBuf>>,
    pub run_log: Result<PathBuf>,
}

/// Write the posts export and the run log for a finished run.
pub fn save_run(
    data_dir: &Path,
    report: &RunReport,
    log: &RunLog,
    run_started: DateTime<Utc>,
) -> SavedRun {
    SavedRun {
        posts: write_posts(data_dir, &report.result, run_started),
        run_log: log.save(data_dir, &report.stats),
    }
}

/// Write the result's posts to `{data_dir}/posts/posts_{timestamp}.json`.
/// Returns `None` without touching disk when there is nothing to write.
pub fn write_posts(
    data_dir: &Path,
    result: &CollectionResult,
    run_started: DateTime<Utc>,
) -> Result<Option<PathBuf>> {
    if result.is_empty() {
        return Ok(None);
    }

    let dir = data_dir.join("posts");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create export dir {}", dir.display()))?;

    let path = dir.join(format!("posts_{}.json", run_started.format("%Y%m%d_%H%M%S")));
    let body = serde_json::to_string_pretty(&result.posts)?;
    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), posts = result.posts.len(), "Saved collected posts");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RunStats;
    use crate::testing::post_at;
    use crate::window::TimeWindow;
    use chrono::TimeZone;
    use roundup_common::Post;
    use std::time::Duration;

    fn result_with(posts: Vec<Post>) -> CollectionResult {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        CollectionResult {
            window: TimeWindow::ending_at(now, Duration::from_secs(12 * 3600)),
            posts,
            accounts_attempted: 1,
            skipped: vec![],
        }
    }

    #[test]
    fn empty_result_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_posts(dir.path(), &result_with(vec![]), Utc::now()).unwrap();
        assert!(written.is_none());
        assert!(!dir.path().join("posts").exists());
    }

    #[test]
    fn failed_export_still_saves_run_log() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the export dir should be makes the export fail.
        std::fs::write(dir.path().join("posts"), "").unwrap();

        let post = post_at("drfeifei", Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap());
        let report = RunReport {
            result: result_with(vec![post]),
            stats: RunStats {
                posts_collected: 1,
                ..RunStats::default()
            },
            accounts: vec![],
            cancelled: false,
        };
        let log = RunLog::new("run-export-fails".to_string());

        let saved = save_run(dir.path(), &report, &log, Utc::now());
        assert!(saved.posts.is_err());

        let path = saved.run_log.unwrap();
        assert!(path.ends_with("roundup-runs/run-export-fails.json"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["stats"]["posts_collected"], 1);
    }

    #[test]
    fn writes_timestamped_flat_records() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 5).unwrap();
        let post = post_at("drfeifei", Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap());

        let path = write_posts(dir.path(), &result_with(vec![post.clone()]), started)
            .unwrap()
            .unwrap();
        assert!(path.ends_with("posts/posts_20240102_000005.json"));

        let read: Vec<Post> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, vec![post]);
    }
}

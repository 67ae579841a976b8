use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roundup_collector::export::save_run;
use roundup_collector::run_log::RunLog;
use roundup_collector::{CancelFlag, Collector, Resolution, TokioSleeper};
use roundup_common::Config;
use x_client::XClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("roundup=info".parse()?)
                .add_directive("x_client=info".parse()?),
        )
        .init();

    info!("Roundup collector starting...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.log_redacted();

    let client = XClient::new(config.x_bearer_token.clone());

    // First Ctrl-C stops the pass at the next account or delay and keeps what was
    // collected. A second one exits immediately.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if cancel.interrupt() {
                    warn!("Second interrupt received, exiting");
                    std::process::exit(130);
                }
                warn!("Interrupt received, finishing with partial results (Ctrl-C again to abort)");
            }
        });
    }

    let started = Utc::now();
    let mut log = RunLog::new(uuid::Uuid::new_v4().to_string());
    let collector = Collector::new(&client, &TokioSleeper, config.collector.clone(), cancel);
    let mut report = collector.run(started, &mut log).await;

    for account in &report.accounts {
        if let Resolution::Skipped(reason) = &account.resolution {
            info!(handle = account.handle.as_str(), ?reason, "Skipped account");
        }
    }

    if config.sort_by_engagement {
        report.result.sort_by_engagement();
    }

    let saved = save_run(&config.data_dir, &report, &log, started);
    match saved.posts {
        Ok(Some(path)) => info!(path = %path.display(), "Collection complete"),
        Ok(None) => info!("Collection complete but no posts were found"),
        Err(e) => warn!(error = %e, "Failed to export collected posts"),
    }
    if let Err(e) = saved.run_log {
        warn!(error = %e, "Failed to save run log");
    }

    info!("{}", report.stats);
    Ok(())
}

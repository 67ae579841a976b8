pub mod aggregator;
pub mod backoff;
pub mod cancel;
pub mod collector;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod run_log;
pub mod scheduler;
pub mod traits;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregator::CollectionResult;
pub use cancel::CancelFlag;
pub use collector::{Collector, RunReport, RunStats};
pub use error::ServiceError;
pub use fetcher::{AccountFetcher, FetchOutcome};
pub use scheduler::{Resolution, ResolvedAccount, SkipReason};
pub use traits::{AccountService, PostQuery, Sleeper, TokioSleeper};
pub use window::TimeWindow;

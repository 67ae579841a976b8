use std::time::Duration;

use thiserror::Error;
use x_client::XError;

/// Errors surfaced by an `AccountService`. "Not found" is not an error at this
/// seam; lookups return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("{0}")]
    Remote(String),
}

impl From<XError> for ServiceError {
    fn from(err: XError) -> Self {
        match err {
            XError::RateLimited { retry_after } => ServiceError::RateLimited { retry_after },
            other => ServiceError::Remote(other.to_string()),
        }
    }
}

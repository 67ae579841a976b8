pub mod config;
pub mod error;
pub mod types;

pub use config::{CollectorSettings, Config};
pub use error::RoundupError;
pub use types::*;

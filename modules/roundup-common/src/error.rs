use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoundupError {
    #[error("Configuration error: {0}")]
    Config(String),
}

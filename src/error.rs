use thiserror::Error;

use crate::reward::RewardKind;

/// Startup configuration problems. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be true or false, got {value:?}")]
    InvalidFlag { key: &'static str, value: String },

    #[error("good probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("asset list for {0:?} rewards is empty")]
    EmptyAssets(RewardKind),

    #[error("invalid share endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("share endpoint must be http or https, got {0}")]
    UnsupportedScheme(String),
}

/// Clipboard writes can fail on headless or sandboxed systems. Never fatal.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(#[from] arboard::Error),
}

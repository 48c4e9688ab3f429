use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single poll tick. All of them are transient: the widgets
/// keep their last-known-good state and the next tick is the retry.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid chart data: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user configuration directory")]
    NoConfigDir,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("saved configuration is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("'{0}' is not a valid slug (letters, digits, '-' and '_' only)")]
    InvalidSlug(String),
    #[error("quorum must be a percentage between 0 and 100, got {0}")]
    InvalidQuorum(f64),
    #[error("refresh interval must be between 1 and 300 seconds, got {0}")]
    InvalidInterval(u64),
    #[error("question number must be at least 1")]
    InvalidQuestion,
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

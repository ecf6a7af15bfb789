//! Error types of the calendar generator.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a generator run.
///
/// None of these are retried; the caller reports them and exits non-zero,
/// which leaves the previously published feed untouched.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid language, timezone, date window or occupation list.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network failure, unexpected HTTP status or malformed response body.
    #[error("upstream query failed: {0}")]
    UpstreamQuery(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("failed to write `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamQuery(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::UpstreamQuery(format!("malformed response: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

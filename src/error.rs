//! Errors that propagate out of an invocation.
//!
//! Only genuine upstream failures live here. Shape irregularities (empty CDX
//! listings, malformed rows, undecodable bodies, missing search containers)
//! are absorbed where they are parsed and never become an [`ArchiveError`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A JSON-producing upstream call answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {endpoint}")]
    UpstreamStatus { status: u16, endpoint: String },

    #[error("request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered 2xx but the body was not JSON.
    #[error("invalid JSON from {endpoint}: {source}")]
    InvalidJson {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ArchiveError {
    pub(crate) fn from_reqwest(endpoint: &str, secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ArchiveError::Timeout {
                endpoint: endpoint.to_string(),
                secs,
            }
        } else {
            ArchiveError::Transport {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }

    /// Whether the failure originated upstream rather than in the caller's input.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, ArchiveError::InvalidArgument(_))
    }
}

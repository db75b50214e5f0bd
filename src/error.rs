//! Error types for upstream fetches.

use thiserror::Error;

/// Why a request to one of the upstream data providers failed.
///
/// Every fetcher returns this instead of panicking; the orchestrator decides
/// whether the failure is fatal (primary series) or recoverable (everything
/// else).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },
    #[error("upstream reported an error: {0}")]
    Upstream(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("upstream returned no data")]
    Empty,
}

impl FetchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert!(FetchError::Status { status: 503 }.to_string().contains("503"));
        assert!(FetchError::Empty.to_string().contains("no data"));
        let err = FetchError::malformed("missing Data");
        assert!(err.to_string().contains("malformed"));
        assert!(err.to_string().contains("missing Data"));
        assert!(FetchError::Upstream("limit".into()).to_string().contains("limit"));
    }
}

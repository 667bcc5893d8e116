use std::time::Duration;

use thiserror::Error;

/// Failure modes of one image request.
///
/// Every variant is delivered through the request's ticket and recorded in
/// the owning node's request state; none of them tears down the pipeline or
/// the render loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("source not usable: {0}")]
    InvalidSource(String),
    #[error("fetch failed: {0}")]
    Network(String),
    #[error("fetch exceeded {:?}", .0)]
    Timeout(Duration),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("request cancelled before completion")]
    Cancelled,
}

impl PipelineError {
    /// True for the fetch-stage failures (network and timeout).
    #[must_use]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

//! Transport error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single round trip to the match authority.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TransportError {
    /// The authority couldn't be reached, timed out, or answered with a body
    /// that isn't the expected JSON.
    #[error("Network failure: {0}")]
    Network(String),

    /// The authority answered with an `error` field or a non-success status.
    /// Carries the server's message verbatim.
    #[error("{0}")]
    Protocol(String),
}

impl TransportError {
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

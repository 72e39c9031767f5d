//! Transport errors.

use thiserror::Error;
use veilpost_core::NetworkError;

/// Failure talking to a single gossip peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Peer could not be reached
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable {
        /// Peer address
        peer: String,
        /// What went wrong
        reason: String,
    },

    /// Peer did not answer within the probe timeout
    #[error("peer {peer} timed out")]
    Timeout {
        /// Peer address
        peer: String,
    },

    /// Peer answered with bytes that are not key records
    #[error("malformed records: {0}")]
    Malformed(String),

    /// Request was abandoned because the query was cancelled
    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Returns true if asking another peer (or asking again) may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}

impl From<TransportError> for NetworkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => Self::Cancelled,
            TransportError::Malformed(reason) => Self::Malformed(reason),
            other => Self::Unreachable(other.to_string()),
        }
    }
}

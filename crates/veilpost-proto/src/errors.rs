//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decode error: {0}")]
    CborDecode(String),

    /// Version tag outside the known generations
    #[error("unknown protocol version: {0}")]
    UnknownVersion(i8),

    /// Identifier text does not follow the expected form
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Social network name or domain not recognized
    #[error("unknown social network: {0}")]
    UnknownNetwork(String),
}

impl ProtocolError {
    /// Returns true if the input bytes themselves are malformed.
    ///
    /// Malformed input is never worth retrying; identifier and network errors
    /// come from caller-supplied text instead.
    pub fn is_malformed_payload(&self) -> bool {
        matches!(self, Self::CborDecode(_) | Self::UnknownVersion(_))
    }
}

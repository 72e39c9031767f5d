//! Error types for post decryption.
//!
//! [`DecryptError`] is what callers see: it travels inside the terminal
//! [`DecryptProgress::Error`](crate::DecryptProgress::Error) event. The other
//! types are returned by collaborators and classified into it at the engine
//! boundary.

use thiserror::Error;
use veilpost_crypto::CryptoError;
use veilpost_proto::{ProtocolError, ProtocolVersion, SocialNetwork};

/// Classified reason a decryption attempt ended without content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// Post is steganographic but nobody told us who wrote it
    #[error("cannot decode an image post without knowing its author")]
    UnrecognizedAuthor,

    /// Input carried no recognizable payload
    #[error("no encrypted payload found in the post")]
    NoPayloadFound,

    /// Payload found but unusable
    #[error("payload is broken: {0}")]
    PayloadBroken(String),

    /// Current profile has no persona, so no ECDH key to derive with
    #[error("current profile is not connected to a persona")]
    CurrentProfileDoesNotConnectedToPersona,

    /// Generation has no key exchange implementation
    #[error("protocol generation {version} is not supported")]
    UnsupportedProtocolGeneration {
        /// Offending generation
        version: ProtocolVersion,
    },

    /// No usable public key for the post author
    #[error("public key of the post author was not found")]
    AuthorPublicKeyNotFound,

    /// Every strategy ran and none yielded a working key
    #[error("no key for this post could be found")]
    KeyNotFound,

    /// Caller cancelled or the deadline passed
    #[error("decryption was cancelled")]
    Cancelled,

    /// A resolved key was rejected by the cipher
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Key exchange network failed as a whole
    #[error("key exchange network error: {0}")]
    Network(String),

    /// A collaborator failed on a path that is not best-effort
    #[error("internal error: {0}")]
    Internal(String),
}

impl DecryptError {
    /// Returns true if the same request may succeed later.
    ///
    /// Missing keys can show up once the author shares them; network failures
    /// and cancellations are circumstantial. Broken payloads and unsupported
    /// generations never change.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound
                | Self::AuthorPublicKeyNotFound
                | Self::Cancelled
                | Self::Network(_)
        )
    }
}

impl From<StoreError> for DecryptError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Crypto(err) => Self::DecryptionFailed(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CryptoError> for DecryptError {
    fn from(err: CryptoError) -> Self {
        Self::DecryptionFailed(err.to_string())
    }
}

/// Invocation cannot start: the deployment is missing configuration.
///
/// Returned from the entry point, never delivered as an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Network has no key exchange routing prefix
    #[error("social network {network} is not configured for key exchange")]
    UnconfiguredNetwork {
        /// Offending network
        network: SocialNetwork,
    },
}

/// Failure of a persona store, key cache or local key store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not be reached or refused the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored record exists but could not be used
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    /// Key operation on stored material failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Failure of the steganography decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    /// Image could not be fetched
    #[error("image fetch failed: {0}")]
    Fetch(String),

    /// Image is not a carrier, or the passphrase does not fit
    #[error("image decode failed: {0}")]
    Decode(String),
}

impl From<StegoError> for DecryptError {
    fn from(err: StegoError) -> Self {
        match err {
            StegoError::Fetch(reason) => Self::Network(reason),
            StegoError::Decode(reason) => Self::PayloadBroken(reason),
        }
    }
}

/// Payload bytes could not be turned into an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("payload could not be parsed: {0}")]
pub struct ParseError(pub String);

impl From<ProtocolError> for ParseError {
    fn from(err: ProtocolError) -> Self {
        Self(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn messages_are_distinct() {
        let errors = [
            DecryptError::UnrecognizedAuthor,
            DecryptError::NoPayloadFound,
            DecryptError::PayloadBroken("x".into()),
            DecryptError::CurrentProfileDoesNotConnectedToPersona,
            DecryptError::UnsupportedProtocolGeneration { version: ProtocolVersion::V37 },
            DecryptError::AuthorPublicKeyNotFound,
            DecryptError::KeyNotFound,
            DecryptError::Cancelled,
            DecryptError::DecryptionFailed("x".into()),
            DecryptError::Network("x".into()),
            DecryptError::Internal("x".into()),
        ];

        let messages: HashSet<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn unsupported_generation_names_the_tag() {
        let err = DecryptError::UnsupportedProtocolGeneration { version: ProtocolVersion::V37 };
        assert_eq!(err.to_string(), "protocol generation -37 is not supported");
    }

    #[test]
    fn transient_classification() {
        assert!(DecryptError::KeyNotFound.is_transient());
        assert!(DecryptError::Cancelled.is_transient());
        assert!(!DecryptError::PayloadBroken("bad".into()).is_transient());
        assert!(
            !DecryptError::UnsupportedProtocolGeneration { version: ProtocolVersion::V37 }
                .is_transient()
        );
    }

    #[test]
    fn store_errors_become_internal() {
        let err: DecryptError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err, DecryptError::Internal("store unavailable: down".into()));
    }

    #[test]
    fn rejected_stored_keys_are_decryption_failures() {
        let rejected = CryptoError::DecryptionFailed { reason: "tag mismatch".into() };
        let err: DecryptError = StoreError::Crypto(rejected).into();
        assert!(matches!(err, DecryptError::DecryptionFailed(_)));
    }
}

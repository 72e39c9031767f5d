//! Error types for post key operations

use thiserror::Error;

/// Errors from post key derivation and AEAD operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// IV does not have the size the post cipher requires
    #[error("invalid iv length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Expected IV length
        expected: usize,
        /// Actual IV length
        actual: usize,
    },

    /// Key agreement produced an all-zero secret (low-order public key)
    #[error("key agreement with a low-order public key")]
    NonContributory,

    /// Decryption failed (authentication tag mismatch)
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if the failure means "this key does not fit this
    /// ciphertext".
    ///
    /// Such failures are expected while trying candidate keys and should move
    /// on to the next candidate. Malformed input (bad lengths) is not.
    pub fn is_key_mismatch(&self) -> bool {
        matches!(self, Self::DecryptionFailed { .. } | Self::NonContributory)
    }
}

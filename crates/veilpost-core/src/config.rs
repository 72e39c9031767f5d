//! Engine configuration.

use std::time::Duration;

/// Decryption engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionConfig {
    /// Deadline installed when the caller passes no cancellation token
    pub default_timeout: Duration,
    /// Remember public keys carried by envelopes (subject to the author guard)
    pub store_author_public_keys: bool,
}

impl Default for DecryptionConfig {
    fn default() -> Self {
        Self { default_timeout: Duration::from_secs(60), store_author_public_keys: true }
    }
}

//! Key material wrappers.

use std::fmt;

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::error::CryptoError;

/// Size of a post key and of X25519 keys, in bytes.
pub const KEY_SIZE: usize = 32;

/// Symmetric AES-256 key protecting one post.
///
/// Owned by a single decrypt call. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct PostKey {
    key: [u8; KEY_SIZE],
}

impl PostKey {
    /// Wrap raw key bytes.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Wrap a byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() })?;
        Ok(Self { key })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for PostKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostKey(..)")
    }
}

/// X25519 public key of a persona.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EcdhPublicKey([u8; KEY_SIZE]);

impl EcdhPublicKey {
    /// Wrap raw public key bytes.
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Wrap a byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() })?;
        Ok(Self(key))
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for EcdhPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcdhPublicKey(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Long-lived X25519 secret of a persona owned by the current user.
///
/// Callers provide the secret bytes; this crate never generates randomness.
#[derive(Clone)]
pub struct PersonaSecret {
    secret: StaticSecret,
}

impl PersonaSecret {
    /// Build a persona secret from 32 secret bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { secret: StaticSecret::from(bytes) }
    }

    /// Public half of this persona key.
    pub fn public_key(&self) -> EcdhPublicKey {
        EcdhPublicKey(PublicKey::from(&self.secret).to_bytes())
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl fmt::Debug for PersonaSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonaSecret").field("public_key", &self.public_key()).finish()
    }
}

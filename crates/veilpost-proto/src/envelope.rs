//! Structured, versioned representation of an encrypted post.

use std::fmt;

use thiserror::Error;

use crate::{errors::ProtocolError, identifier::ProfileIdentifier};

/// Protocol generation of an envelope.
///
/// Tags are small negative integers on the wire. Each generation resolves post
/// keys differently:
///
/// | Tag | Key exchange |
/// |-----|--------------|
/// | -40 | single lookup by IV and reader id |
/// | -39 | gossip query, partitioned key slots, current ECDH |
/// | -38 | gossip query, full key slots, IV-salted legacy ECDH |
/// | -37 | none implemented |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Generation -37
    V37,
    /// Generation -38
    V38,
    /// Generation -39
    V39,
    /// Generation -40
    V40,
}

impl ProtocolVersion {
    /// Wire tag of this generation.
    pub const fn tag(self) -> i8 {
        match self {
            Self::V37 => -37,
            Self::V38 => -38,
            Self::V39 => -39,
            Self::V40 => -40,
        }
    }

    /// Look up a generation by its wire tag.
    pub fn from_tag(tag: i8) -> Result<Self, ProtocolError> {
        match tag {
            -37 => Ok(Self::V37),
            -38 => Ok(Self::V38),
            -39 => Ok(Self::V39),
            -40 => Ok(Self::V40),
            other => Err(ProtocolError::UnknownVersion(other)),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Curve of a public key embedded in an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlgorithm {
    /// Ed25519 signing key
    Ed25519,
    /// NIST P-256
    P256,
    /// secp256k1
    Secp256k1,
    /// X25519 agreement key
    X25519,
}

impl PublicKeyAlgorithm {
    /// Wire code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Ed25519 => 0,
            Self::P256 => 1,
            Self::Secp256k1 => 2,
            Self::X25519 => 3,
        }
    }

    /// Look up an algorithm by wire code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ed25519),
            1 => Some(Self::P256),
            2 => Some(Self::Secp256k1),
            3 => Some(Self::X25519),
            _ => None,
        }
    }
}

/// Public key the envelope claims belongs to its author.
///
/// Unauthenticated: anyone can put any key here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorPublicKey {
    /// Curve of `key`
    pub algorithm: PublicKeyAlgorithm,
    /// Raw public key bytes
    pub key: Vec<u8>,
}

/// How the post key reaches readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostKeyDistribution {
    /// Post key travels in the clear; anyone can read the post.
    Public {
        /// Raw post key
        post_key: Vec<u8>,
    },
    /// Post key is only available to the author (wrapped with their local
    /// key) and to recipients (through key-exchange records).
    EndToEnd {
        /// Post key wrapped with the author's local key
        owner_key_encrypted: Vec<u8>,
    },
}

/// Encryption section of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encryption {
    /// IV of the post content. Required for anything beyond parsing.
    pub iv: Option<Vec<u8>>,
    /// Post key distribution
    pub distribution: PostKeyDistribution,
}

/// A single envelope field that failed to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}` is broken: {reason}")]
pub struct FieldError {
    /// Field name
    pub field: &'static str,
    /// What was wrong with it
    pub reason: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

/// Decoded envelope of an encrypted post.
///
/// Produced once per decryption attempt, immutable afterwards. Fields that can
/// be damaged independently carry their own `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Protocol generation
    pub version: ProtocolVersion,
    /// Author the envelope claims to be from
    pub author: Result<Option<ProfileIdentifier>, FieldError>,
    /// Public key the envelope claims belongs to the author
    pub author_public_key: Result<Option<AuthorPublicKey>, FieldError>,
    /// Encryption parameters
    pub encryption: Result<Encryption, FieldError>,
    /// Encrypted post content
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// IV of the post, if the encryption section decoded and carries one.
    pub fn iv(&self) -> Option<&[u8]> {
        self.encryption.as_ref().ok().and_then(|encryption| encryption.iv.as_deref())
    }

    /// Claimed author, if present and well-formed.
    pub fn claimed_author(&self) -> Option<&ProfileIdentifier> {
        self.author.as_ref().ok().and_then(Option::as_ref)
    }

    /// Claimed author public key, if present and well-formed.
    pub fn claimed_author_public_key(&self) -> Option<&AuthorPublicKey> {
        self.author_public_key.as_ref().ok().and_then(Option::as_ref)
    }

    /// Whether the post key travels in the clear. `None` if the encryption
    /// section is broken.
    pub fn is_public(&self) -> Option<bool> {
        self.encryption
            .as_ref()
            .ok()
            .map(|encryption| matches!(encryption.distribution, PostKeyDistribution::Public { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(encryption: Result<Encryption, FieldError>) -> Envelope {
        Envelope {
            version: ProtocolVersion::V40,
            author: Err(FieldError::new("author", "bad text")),
            author_public_key: Ok(None),
            encryption,
            ciphertext: vec![1, 2, 3],
        }
    }

    #[test]
    fn version_tags_roundtrip() {
        for version in [
            ProtocolVersion::V37,
            ProtocolVersion::V38,
            ProtocolVersion::V39,
            ProtocolVersion::V40,
        ] {
            assert_eq!(ProtocolVersion::from_tag(version.tag()), Ok(version));
        }
        assert_eq!(ProtocolVersion::from_tag(-41), Err(ProtocolError::UnknownVersion(-41)));
    }

    #[test]
    fn algorithm_codes_roundtrip() {
        for code in 0..4 {
            let algorithm = PublicKeyAlgorithm::from_code(code).unwrap();
            assert_eq!(algorithm.code(), code);
        }
        assert_eq!(PublicKeyAlgorithm::from_code(9), None);
    }

    #[test]
    fn broken_author_does_not_hide_iv() {
        let env = envelope(Ok(Encryption {
            iv: Some(vec![9; 16]),
            distribution: PostKeyDistribution::EndToEnd { owner_key_encrypted: vec![] },
        }));

        assert_eq!(env.iv(), Some(&[9u8; 16][..]));
        assert_eq!(env.claimed_author(), None);
        assert_eq!(env.is_public(), Some(false));
    }

    #[test]
    fn broken_encryption_has_no_iv() {
        let env = envelope(Err(FieldError::new("encryption", "missing")));

        assert_eq!(env.iv(), None);
        assert_eq!(env.is_public(), None);
    }
}

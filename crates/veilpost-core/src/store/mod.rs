//! Collaborator traits for key material and persona storage.
//!
//! The engine never owns storage. Each concern sits behind an object-safe
//! async trait so deployments can plug in their own backends; [`memory`]
//! provides in-process implementations for tests and the CLI.

mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
pub use memory::{MemoryKeyring, MemoryLocalKeyStore, MemoryPersonaStore, MemoryPostKeyCache};
use veilpost_crypto::{EcdhPublicKey, PostKey};
use veilpost_proto::{AuthorPublicKey, PostIvIdentifier, ProfileIdentifier};

use crate::error::StoreError;

/// A persona known to this installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaRecord {
    /// Stable persona identifier, `persona:<hex public key>`
    pub identifier: String,
    /// Persona public key
    pub public_key: AuthorPublicKey,
    /// Profiles this persona is known to speak for
    pub linked_profiles: BTreeSet<ProfileIdentifier>,
}

impl PersonaRecord {
    /// Record for `public_key`, linked to no profile yet.
    pub fn new(public_key: AuthorPublicKey) -> Self {
        let identifier = format!("persona:{}", hex::encode(&public_key.key));
        Self { identifier, public_key, linked_profiles: BTreeSet::new() }
    }

    /// Link a profile to this persona.
    #[must_use]
    pub fn linked_to(mut self, profile: ProfileIdentifier) -> Self {
        self.linked_profiles.insert(profile);
        self
    }
}

/// Where a cached post key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostKeyProvenance {
    /// Author of the post; [`ProfileIdentifier::unknown`] if nobody knows
    pub post_by: ProfileIdentifier,
    /// Page the post was seen on
    pub url: Option<String>,
    /// Who the key was shared with. Keys cached by the decrypt path record no
    /// recipients.
    pub recipients: BTreeSet<ProfileIdentifier>,
}

/// Which ECDH construction to derive wrapping keys with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcdhDerivation {
    /// Label-only HKDF, used by generations -39 and -40
    Current,
    /// IV-salted HKDF, used by generation -38
    Legacy {
        /// IV of the post
        iv: Vec<u8>,
    },
}

/// Persona and profile lookups.
#[async_trait]
pub trait PersonaStore: Send + Sync {
    /// Persona linked to `profile`, if any.
    async fn find_persona_by_profile(
        &self,
        profile: &ProfileIdentifier,
    ) -> Result<Option<PersonaRecord>, StoreError>;

    /// Remember `public_key` as the key of `profile`.
    async fn store_profile_public_key(
        &self,
        profile: &ProfileIdentifier,
        public_key: &AuthorPublicKey,
    ) -> Result<(), StoreError>;
}

/// Resolved post keys, by post identifier.
///
/// Last writer wins per identifier.
#[async_trait]
pub trait PostKeyCache: Send + Sync {
    /// Previously resolved key for `post`.
    async fn get(&self, post: &PostIvIdentifier) -> Result<Option<PostKey>, StoreError>;

    /// Remember the key of `post`.
    async fn set(
        &self,
        post: &PostIvIdentifier,
        key: &PostKey,
        provenance: PostKeyProvenance,
    ) -> Result<(), StoreError>;
}

/// Symmetric keys the current user encrypted their own posts with.
#[async_trait]
pub trait LocalKeyStore: Send + Sync {
    /// Whether a local key exists for the persona with `author_key`.
    async fn has(&self, author_key: &EcdhPublicKey) -> Result<bool, StoreError>;

    /// Decrypt `data` with the local key of `author_key`.
    async fn decrypt(
        &self,
        author_key: &EcdhPublicKey,
        iv: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, StoreError>;
}

/// ECDH with the current user's persona secrets.
#[async_trait]
pub trait PersonaKeyring: Send + Sync {
    /// One wrapping key per persona secret held, agreed with `their_public`.
    ///
    /// Personas whose agreement fails are skipped; an empty list means no
    /// secret could be used.
    async fn derive_post_keys(
        &self,
        their_public: &EcdhPublicKey,
        derivation: EcdhDerivation,
    ) -> Result<Vec<PostKey>, StoreError>;
}

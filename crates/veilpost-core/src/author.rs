//! Author public key resolution.
//!
//! The envelope names an author and may carry their public key, but both are
//! unauthenticated. Only the author hint (who the surrounding page says wrote
//! the post) is trusted for lookups. An embedded key is remembered only when
//! the envelope's claimed author matches the hint; otherwise anyone could
//! plant their key under someone else's name.

use std::sync::Arc;

use tokio::task::JoinHandle;
use veilpost_crypto::EcdhPublicKey;
use veilpost_proto::{AuthorPublicKey, Envelope, ProfileIdentifier, PublicKeyAlgorithm};

use crate::{error::StoreError, store::PersonaStore};

/// What [`AuthorResolver::store_author_public_key`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKeyStorage {
    /// Key written to the persona store
    Stored,
    /// Claimed author differs from the hint, or there is no hint
    AuthorMismatch,
    /// Envelope carries no usable author or key
    NothingToStore,
    /// Key is not an X25519 key
    UnsupportedAlgorithm,
    /// Storage turned off by configuration
    Disabled,
}

/// Resolves and remembers author public keys.
#[derive(Clone)]
pub struct AuthorResolver {
    personas: Arc<dyn PersonaStore>,
    store_enabled: bool,
}

impl AuthorResolver {
    /// Create a resolver over `personas`. With `store_enabled` false, embedded
    /// keys are never written.
    pub fn new(personas: Arc<dyn PersonaStore>, store_enabled: bool) -> Self {
        Self { personas, store_enabled }
    }

    /// Public key of the hinted author.
    ///
    /// Returns `None` without a hint, when the hinted profile has no persona,
    /// when the persona key cannot be used for ECDH, or when the lookup fails.
    pub async fn resolve(&self, author_hint: Option<&ProfileIdentifier>) -> Option<EcdhPublicKey> {
        let hint = author_hint?;
        match self.personas.find_persona_by_profile(hint).await {
            Ok(Some(persona)) => importable(&persona.public_key),
            Ok(None) => {
                tracing::debug!(author = %hint, "no persona for author hint");
                None
            },
            Err(err) => {
                tracing::warn!(author = %hint, error = %err, "author lookup failed");
                None
            },
        }
    }

    /// Remember the public key embedded in `envelope`, if the guard allows.
    ///
    /// # Errors
    ///
    /// Whatever the persona store reports for the write.
    pub async fn store_author_public_key(
        &self,
        envelope: &Envelope,
        author_hint: Option<&ProfileIdentifier>,
    ) -> Result<AuthorKeyStorage, StoreError> {
        match self.plan(envelope, author_hint) {
            Ok((author, key)) => write(self.personas.as_ref(), &author, &key).await,
            Err(skipped) => Ok(skipped),
        }
    }

    /// Fire-and-forget variant of [`store_author_public_key`].
    ///
    /// The guard is evaluated before anything is spawned; the returned handle
    /// is `None` when there is nothing to write. Write failures are logged.
    ///
    /// [`store_author_public_key`]: Self::store_author_public_key
    pub fn store_author_public_key_detached(
        &self,
        envelope: &Envelope,
        author_hint: Option<&ProfileIdentifier>,
    ) -> Option<JoinHandle<()>> {
        let (author, key) = match self.plan(envelope, author_hint) {
            Ok(planned) => planned,
            Err(skipped) => {
                tracing::debug!(?skipped, "not storing embedded author key");
                return None;
            },
        };

        let personas = Arc::clone(&self.personas);
        Some(tokio::spawn(async move {
            if let Err(err) = write(personas.as_ref(), &author, &key).await {
                tracing::warn!(author = %author, error = %err, "failed to store author public key");
            }
        }))
    }

    fn plan(
        &self,
        envelope: &Envelope,
        author_hint: Option<&ProfileIdentifier>,
    ) -> Result<(ProfileIdentifier, AuthorPublicKey), AuthorKeyStorage> {
        if !self.store_enabled {
            return Err(AuthorKeyStorage::Disabled);
        }
        let (Some(claimed), Some(key)) =
            (envelope.claimed_author(), envelope.claimed_author_public_key())
        else {
            return Err(AuthorKeyStorage::NothingToStore);
        };
        if author_hint != Some(claimed) {
            tracing::debug!(claimed = %claimed, "claimed author does not match hint");
            return Err(AuthorKeyStorage::AuthorMismatch);
        }
        if importable(key).is_none() {
            return Err(AuthorKeyStorage::UnsupportedAlgorithm);
        }
        Ok((claimed.clone(), key.clone()))
    }
}

async fn write(
    personas: &dyn PersonaStore,
    author: &ProfileIdentifier,
    key: &AuthorPublicKey,
) -> Result<AuthorKeyStorage, StoreError> {
    personas.store_profile_public_key(author, key).await?;
    tracing::debug!(author = %author, "stored author public key");
    Ok(AuthorKeyStorage::Stored)
}

/// X25519 key material usable for ECDH.
pub(crate) fn importable(key: &AuthorPublicKey) -> Option<EcdhPublicKey> {
    if key.algorithm != PublicKeyAlgorithm::X25519 {
        return None;
    }
    EcdhPublicKey::from_slice(&key.key).ok()
}

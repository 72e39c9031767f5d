#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

//! In-memory collaborators for tests and the CLI.
//!
//! State is shared through `Arc<Mutex<..>>`, so clones see the same data.
//! Locks are never held across an await point. Poisoned locks are recovered;
//! every update is a single map operation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use veilpost_crypto::{
    EcdhPublicKey, PersonaSecret, PostKey, derive_post_key, derive_post_key_legacy, open,
};
use veilpost_proto::{AuthorPublicKey, PostIvIdentifier, ProfileIdentifier};

use super::{
    EcdhDerivation, LocalKeyStore, PersonaKeyring, PersonaRecord, PersonaStore, PostKeyCache,
    PostKeyProvenance,
};
use crate::error::StoreError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Personas keyed by identifier, with a profile index.
#[derive(Clone, Default)]
pub struct MemoryPersonaStore {
    inner: Arc<Mutex<PersonaInner>>,
}

#[derive(Default)]
struct PersonaInner {
    personas: HashMap<String, PersonaRecord>,
    by_profile: HashMap<ProfileIdentifier, String>,
}

impl MemoryPersonaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a persona and index its linked profiles. Replaces any persona with
    /// the same identifier.
    pub fn insert(&self, record: PersonaRecord) {
        let mut inner = lock(&self.inner);
        for profile in &record.linked_profiles {
            inner.by_profile.insert(profile.clone(), record.identifier.clone());
        }
        inner.personas.insert(record.identifier.clone(), record);
    }

    /// Number of personas held.
    pub fn len(&self) -> usize {
        lock(&self.inner).personas.len()
    }

    /// Returns true if no persona is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersonaStore for MemoryPersonaStore {
    async fn find_persona_by_profile(
        &self,
        profile: &ProfileIdentifier,
    ) -> Result<Option<PersonaRecord>, StoreError> {
        let inner = lock(&self.inner);
        Ok(inner.by_profile.get(profile).and_then(|id| inner.personas.get(id)).cloned())
    }

    async fn store_profile_public_key(
        &self,
        profile: &ProfileIdentifier,
        public_key: &AuthorPublicKey,
    ) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        let identifier = PersonaRecord::new(public_key.clone()).identifier;

        if let Some(previous) = inner.by_profile.insert(profile.clone(), identifier.clone())
            && previous != identifier
            && let Some(record) = inner.personas.get_mut(&previous)
        {
            record.linked_profiles.remove(profile);
        }

        inner
            .personas
            .entry(identifier)
            .or_insert_with(|| PersonaRecord::new(public_key.clone()))
            .linked_profiles
            .insert(profile.clone());

        tracing::debug!(profile = %profile, "stored profile public key");
        Ok(())
    }
}

/// Post keys with their provenance.
#[derive(Clone, Default)]
pub struct MemoryPostKeyCache {
    inner: Arc<Mutex<HashMap<PostIvIdentifier, (PostKey, PostKeyProvenance)>>>,
}

impl MemoryPostKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provenance recorded for `post`.
    pub fn provenance(&self, post: &PostIvIdentifier) -> Option<PostKeyProvenance> {
        lock(&self.inner).get(post).map(|(_, provenance)| provenance.clone())
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostKeyCache for MemoryPostKeyCache {
    async fn get(&self, post: &PostIvIdentifier) -> Result<Option<PostKey>, StoreError> {
        Ok(lock(&self.inner).get(post).map(|(key, _)| key.clone()))
    }

    async fn set(
        &self,
        post: &PostIvIdentifier,
        key: &PostKey,
        provenance: PostKeyProvenance,
    ) -> Result<(), StoreError> {
        lock(&self.inner).insert(post.clone(), (key.clone(), provenance));
        Ok(())
    }
}

/// Local AES keys, by the public key of the persona that owns them.
#[derive(Clone, Default)]
pub struct MemoryLocalKeyStore {
    inner: Arc<Mutex<HashMap<EcdhPublicKey, PostKey>>>,
}

impl MemoryLocalKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local key of the persona with `owner`.
    pub fn insert(&self, owner: EcdhPublicKey, key: PostKey) {
        lock(&self.inner).insert(owner, key);
    }
}

#[async_trait]
impl LocalKeyStore for MemoryLocalKeyStore {
    async fn has(&self, author_key: &EcdhPublicKey) -> Result<bool, StoreError> {
        Ok(lock(&self.inner).contains_key(author_key))
    }

    async fn decrypt(
        &self,
        author_key: &EcdhPublicKey,
        iv: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, StoreError> {
        let key = lock(&self.inner)
            .get(author_key)
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("no local key for {author_key:?}")))?;
        Ok(open(&key, iv, data)?)
    }
}

/// Persona secrets of the current user.
#[derive(Clone, Default)]
pub struct MemoryKeyring {
    secrets: Arc<Mutex<Vec<PersonaSecret>>>,
}

impl MemoryKeyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold another persona secret.
    pub fn add(&self, secret: PersonaSecret) {
        lock(&self.secrets).push(secret);
    }
}

#[async_trait]
impl PersonaKeyring for MemoryKeyring {
    async fn derive_post_keys(
        &self,
        their_public: &EcdhPublicKey,
        derivation: EcdhDerivation,
    ) -> Result<Vec<PostKey>, StoreError> {
        let secrets = lock(&self.secrets).clone();
        let keys = secrets
            .iter()
            .filter_map(|secret| {
                let derived = match &derivation {
                    EcdhDerivation::Current => derive_post_key(secret, their_public),
                    EcdhDerivation::Legacy { iv } => derive_post_key_legacy(secret, their_public, iv),
                };
                derived
                    .inspect_err(|err| tracing::debug!(error = %err, "skipping persona for derivation"))
                    .ok()
            })
            .collect();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use veilpost_crypto::seal;
    use veilpost_proto::PublicKeyAlgorithm;

    use super::*;

    fn x25519(byte: u8) -> AuthorPublicKey {
        AuthorPublicKey { algorithm: PublicKeyAlgorithm::X25519, key: vec![byte; 32] }
    }

    #[tokio::test]
    async fn persona_found_through_linked_profile() {
        let store = MemoryPersonaStore::new();
        let alice = ProfileIdentifier::new("twitter.com", "alice");
        store.insert(PersonaRecord::new(x25519(1)).linked_to(alice.clone()));

        let found = store.find_persona_by_profile(&alice).await.unwrap().unwrap();

        assert_eq!(found.public_key, x25519(1));
        assert!(
            store
                .find_persona_by_profile(&ProfileIdentifier::new("twitter.com", "bob"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn storing_a_new_key_relinks_the_profile() {
        let store = MemoryPersonaStore::new();
        let alice = ProfileIdentifier::new("twitter.com", "alice");

        store.store_profile_public_key(&alice, &x25519(1)).await.unwrap();
        store.store_profile_public_key(&alice, &x25519(2)).await.unwrap();

        let found = store.find_persona_by_profile(&alice).await.unwrap().unwrap();
        assert_eq!(found.public_key, x25519(2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn cache_last_writer_wins() {
        let cache = MemoryPostKeyCache::new();
        let post = PostIvIdentifier::new("facebook.com", &[1; 16]);
        let provenance = PostKeyProvenance {
            post_by: ProfileIdentifier::unknown(),
            url: None,
            recipients: std::collections::BTreeSet::new(),
        };

        cache.set(&post, &PostKey::new([1; 32]), provenance.clone()).await.unwrap();
        cache.set(&post, &PostKey::new([2; 32]), provenance).await.unwrap();

        assert_eq!(cache.get(&post).await.unwrap(), Some(PostKey::new([2; 32])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn local_key_opens_owner_encrypted_data() {
        let store = MemoryLocalKeyStore::new();
        let owner = EcdhPublicKey::new([3; 32]);
        let local = PostKey::new([4; 32]);
        let iv = [5u8; 16];
        let sealed = seal(&local, &iv, b"post key bytes").unwrap();
        store.insert(owner, local);

        assert!(store.has(&owner).await.unwrap());
        assert_eq!(store.decrypt(&owner, &iv, &sealed).await.unwrap(), b"post key bytes");
        assert!(!store.has(&EcdhPublicKey::new([9; 32])).await.unwrap());
    }

    #[tokio::test]
    async fn keyring_derives_one_key_per_persona() {
        let keyring = MemoryKeyring::new();
        keyring.add(PersonaSecret::from_bytes([1; 32]));
        keyring.add(PersonaSecret::from_bytes([2; 32]));
        let author = PersonaSecret::from_bytes([3; 32]).public_key();

        let current = keyring.derive_post_keys(&author, EcdhDerivation::Current).await.unwrap();
        let legacy = keyring
            .derive_post_keys(&author, EcdhDerivation::Legacy { iv: vec![7; 16] })
            .await
            .unwrap();

        assert_eq!(current.len(), 2);
        assert_eq!(legacy.len(), 2);
        assert_ne!(current[0], legacy[0]);
    }

    #[tokio::test]
    async fn keyring_skips_low_order_points() {
        let keyring = MemoryKeyring::new();
        keyring.add(PersonaSecret::from_bytes([1; 32]));

        let keys = keyring
            .derive_post_keys(&EcdhPublicKey::new([0; 32]), EcdhDerivation::Current)
            .await
            .unwrap();

        assert!(keys.is_empty());
    }
}

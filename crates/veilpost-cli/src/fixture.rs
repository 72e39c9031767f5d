//! JSON fixture describing an installation.
//!
//! All key material is hex. Profiles use their text form
//! (`person:<network>/<user id>`), post identifiers theirs
//! (`post_iv:<network>/<hex iv>`). Every section is optional.

use std::{path::Path, sync::Arc, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use veilpost_core::{
    Collaborators, ConfigurationError, Decryption, DecryptionConfig, LegacyGeneration,
    SharedPostKey, StoreError, network_hint,
    store::{
        MemoryKeyring, MemoryLocalKeyStore, MemoryPersonaStore, MemoryPostKeyCache, PersonaRecord,
        PostKeyCache, PostKeyProvenance,
    },
};
use veilpost_crypto::{CryptoError, EcdhPublicKey, KEY_SIZE, PersonaSecret, PostKey};
use veilpost_net::{GossipConfig, GossipKeyExchange, MemoryGossip, TransportError};
use veilpost_proto::{
    AuthorPublicKey, PostIvIdentifier, ProfileIdentifier, ProtocolError, PublicKeyAlgorithm,
    SocialNetwork,
};

use crate::stego::FixtureStego;

/// Errors loading or installing a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Fixture file could not be read
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture is not valid JSON for the schema
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex field does not decode
    #[error("{field} is not valid hex: {source}")]
    Hex {
        /// Field name
        field: &'static str,
        /// Decoder error
        source: hex::FromHexError,
    },

    /// A fixed-size field has the wrong length
    #[error("{field} must be {expected} bytes, got {actual}")]
    Length {
        /// Field name
        field: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Key material rejected
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Identifier text rejected
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Gossip data could not be published
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Store rejected a write
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Network has no routing prefix
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Contents of a fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    /// Known personas
    #[serde(default)]
    pub personas: Vec<PersonaEntry>,
    /// The user's persona secrets, hex
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Keys of the user's own posts
    #[serde(default)]
    pub local_keys: Vec<LocalKeyEntry>,
    /// Post keys already resolved
    #[serde(default)]
    pub cached_keys: Vec<CachedKeyEntry>,
    /// Gossip peers and their data
    #[serde(default)]
    pub gossip: GossipEntry,
    /// Images with hidden payloads
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

/// A persona and the profiles it speaks for.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaEntry {
    /// X25519 public key, hex
    pub public_key: String,
    /// Linked profiles
    #[serde(default)]
    pub profiles: Vec<ProfileIdentifier>,
}

/// Local key of one of the user's personas.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalKeyEntry {
    /// Persona public key, hex
    pub owner: String,
    /// AES-256 key, hex
    pub key: String,
}

/// A post key cache entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachedKeyEntry {
    /// Post identifier text
    pub post: String,
    /// AES-256 key, hex
    pub key: String,
    /// Author of the post
    #[serde(default)]
    pub post_by: Option<ProfileIdentifier>,
}

/// Gossip peers and what they hold.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GossipEntry {
    /// Peers to probe, in order
    #[serde(default)]
    pub peers: Vec<String>,
    /// Peers that refuse connections
    #[serde(default)]
    pub unreachable: Vec<String>,
    /// Per-request timeout
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
    /// Records of -38/-39 posts
    #[serde(default)]
    pub records: Vec<GossipRecordEntry>,
    /// Records of -40 posts
    #[serde(default)]
    pub lookups: Vec<LookupRecordEntry>,
}

/// Gossip generation of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationEntry {
    /// Generation -38
    V38,
    /// Generation -39
    V39,
}

impl From<GenerationEntry> for LegacyGeneration {
    fn from(generation: GenerationEntry) -> Self {
        match generation {
            GenerationEntry::V38 => Self::V38,
            GenerationEntry::V39 => Self::V39,
        }
    }
}

/// A -38/-39 key record held by a peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GossipRecordEntry {
    /// Peer holding the record
    pub peer: String,
    /// Generation of the post
    pub generation: GenerationEntry,
    /// Post IV, hex
    pub iv: String,
    /// Recipient persona public key, hex
    pub recipient: String,
    /// Wrapped post key, hex
    pub encrypted_post_key: String,
    /// IV the post key was wrapped with, hex
    pub post_key_iv: String,
}

/// A -40 key record held by a peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupRecordEntry {
    /// Peer holding the record
    pub peer: String,
    /// Post IV, hex
    pub iv: String,
    /// Recipient user id
    pub user_id: String,
    /// Wrapped post key, hex
    pub encrypted_post_key: String,
    /// IV the post key was wrapped with, hex
    pub post_key_iv: String,
}

/// An image with a hidden payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageEntry {
    /// Image URL, or hex SHA-256 of the image bytes
    pub source: String,
    /// Passphrase the payload was hidden with
    pub passphrase: String,
    /// Hidden text
    pub text: String,
}

/// Engine built from a fixture, with handles on its in-memory state.
pub struct Installation {
    /// Decryption engine
    pub engine: Decryption,
    /// Post key cache the engine writes to
    pub post_keys: MemoryPostKeyCache,
    /// Transport the engine's gossip client reads from
    pub gossip: MemoryGossip,
}

impl Fixture {
    /// Parse a fixture from JSON text.
    pub fn from_json(text: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a fixture file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    /// Build an engine for posts found on `network`.
    ///
    /// Gossip records are published under the routing prefix of `network`.
    pub async fn install(
        &self,
        network: SocialNetwork,
        config: DecryptionConfig,
    ) -> Result<Installation, FixtureError> {
        let hint = network_hint(network)?;

        let personas = MemoryPersonaStore::new();
        for entry in &self.personas {
            let key = ecdh_key("personas.public_key", &entry.public_key)?;
            let record = entry.profiles.iter().cloned().fold(
                PersonaRecord::new(AuthorPublicKey {
                    algorithm: PublicKeyAlgorithm::X25519,
                    key: key.as_bytes().to_vec(),
                }),
                PersonaRecord::linked_to,
            );
            personas.insert(record);
        }

        let keyring = MemoryKeyring::new();
        for secret in &self.secrets {
            keyring.add(PersonaSecret::from_bytes(key_bytes("secrets", secret)?));
        }

        let local_keys = MemoryLocalKeyStore::new();
        for entry in &self.local_keys {
            let owner = ecdh_key("local_keys.owner", &entry.owner)?;
            local_keys.insert(owner, post_key("local_keys.key", &entry.key)?);
        }

        let post_keys = MemoryPostKeyCache::new();
        for entry in &self.cached_keys {
            let post: PostIvIdentifier = entry.post.parse()?;
            let provenance = PostKeyProvenance {
                post_by: entry.post_by.clone().unwrap_or_else(ProfileIdentifier::unknown),
                url: None,
                recipients: Default::default(),
            };
            post_keys.set(&post, &post_key("cached_keys.key", &entry.key)?, provenance).await?;
        }

        let gossip = MemoryGossip::new();
        self.gossip.publish(&gossip, hint)?;
        let mut gossip_config = GossipConfig::with_peers(self.gossip.peers.iter().cloned());
        if let Some(secs) = self.gossip.probe_timeout_secs {
            gossip_config.probe_timeout = Duration::from_secs(secs);
        }

        let collaborators = Collaborators {
            personas: Arc::new(personas),
            post_keys: Arc::new(post_keys.clone()),
            local_keys: Arc::new(local_keys),
            keyring: Arc::new(keyring),
            network: Arc::new(GossipKeyExchange::new(gossip.clone(), gossip_config)),
        };
        let engine = Decryption::new(config, collaborators)
            .with_stego_decoder(Arc::new(FixtureStego::new(&self.images)));

        tracing::debug!(
            personas = self.personas.len(),
            secrets = self.secrets.len(),
            peers = self.gossip.peers.len(),
            "fixture installed"
        );
        Ok(Installation { engine, post_keys, gossip })
    }
}

impl GossipEntry {
    fn publish(&self, gossip: &MemoryGossip, hint: &str) -> Result<(), FixtureError> {
        for peer in &self.unreachable {
            gossip.set_unreachable(peer);
        }
        for entry in &self.records {
            let record = shared_post_key(&entry.encrypted_post_key, &entry.post_key_iv)?;
            gossip.publish_gossip(
                &entry.peer,
                entry.generation.into(),
                hint,
                &bytes("records.iv", &entry.iv)?,
                &ecdh_key("records.recipient", &entry.recipient)?,
                record,
            )?;
        }
        for entry in &self.lookups {
            let record = shared_post_key(&entry.encrypted_post_key, &entry.post_key_iv)?;
            let iv = bytes("lookups.iv", &entry.iv)?;
            gossip.publish_lookup(&entry.peer, &iv, &entry.user_id, record)?;
        }
        Ok(())
    }
}

fn bytes(field: &'static str, text: &str) -> Result<Vec<u8>, FixtureError> {
    hex::decode(text).map_err(|source| FixtureError::Hex { field, source })
}

fn key_bytes(field: &'static str, text: &str) -> Result<[u8; KEY_SIZE], FixtureError> {
    let raw = bytes(field, text)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| FixtureError::Length { field, expected: KEY_SIZE, actual: raw.len() })
}

fn ecdh_key(field: &'static str, text: &str) -> Result<EcdhPublicKey, FixtureError> {
    Ok(EcdhPublicKey::new(key_bytes(field, text)?))
}

fn post_key(field: &'static str, text: &str) -> Result<PostKey, FixtureError> {
    Ok(PostKey::new(key_bytes(field, text)?))
}

fn shared_post_key(encrypted: &str, iv: &str) -> Result<SharedPostKey, FixtureError> {
    Ok(SharedPostKey {
        encrypted_post_key: bytes("encrypted_post_key", encrypted)?,
        post_key_iv: bytes("post_key_iv", iv)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fixture_parses() {
        let fixture = Fixture::from_json("{}").unwrap();
        assert!(fixture.personas.is_empty());
        assert!(fixture.gossip.peers.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(Fixture::from_json(r#"{"persona": []}"#), Err(FixtureError::Json(_))));
    }

    #[test]
    fn profiles_parse_from_text() {
        let fixture = Fixture::from_json(
            r#"{"personas": [{"public_key": "00", "profiles": ["person:twitter.com/alice"]}]}"#,
        )
        .unwrap();
        let alice = ProfileIdentifier::new("twitter.com", "alice");
        assert_eq!(fixture.personas[0].profiles, vec![alice]);
    }

    #[test]
    fn key_length_is_checked() {
        let err = key_bytes("secrets", "abcd").unwrap_err();
        assert!(matches!(err, FixtureError::Length { field: "secrets", expected: 32, actual: 2 }));
    }

    #[test]
    fn bad_hex_names_the_field() {
        let err = bytes("records.iv", "zz").unwrap_err();
        assert!(err.to_string().starts_with("records.iv is not valid hex"));
    }

    #[tokio::test]
    async fn unknown_network_cannot_be_installed() {
        let result =
            Fixture::default().install(SocialNetwork::Unknown, DecryptionConfig::default()).await;
        assert!(matches!(result, Err(FixtureError::Configuration(_))));
    }

    #[tokio::test]
    async fn cached_keys_are_preloaded() {
        let fixture = Fixture::from_json(&format!(
            r#"{{"cached_keys": [{{"post": "post_iv:twitter.com/{}", "key": "{}"}}]}}"#,
            "ab".repeat(16),
            "42".repeat(32)
        ))
        .unwrap();

        let installation =
            fixture.install(SocialNetwork::Twitter, DecryptionConfig::default()).await.unwrap();

        let post = PostIvIdentifier::new("twitter.com", &[0xab; 16]);
        let cached = installation.post_keys.get(&post).await.unwrap();
        assert_eq!(cached, Some(PostKey::new([0x42; 32])));
    }
}

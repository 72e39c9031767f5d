//! Decryption orchestrator.
//!
//! One call to [`Decryption::decrypt`] is one invocation:
//!
//! ```text
//! payload ─▶ parse ─▶ iv? ─no──▶ (end, no events)
//!                      │ yes
//!                      ▼
//!               Info ─▶ store author key (detached)
//!                      │
//!                      ▼
//!          cascade over InvocationIo ─▶ Success | Error
//! ```
//!
//! The orchestrator owns no state between invocations. Everything an
//! invocation needs (post identifier, provenance, cancellation signal) is
//! bound into an [`InvocationIo`] built for it and dropped with it.

use std::{collections::BTreeSet, sync::Arc};

use futures_util::{StreamExt, TryStreamExt, future, stream};
use tokio_util::sync::CancellationToken;
use veilpost_crypto::{EcdhPublicKey, PostKey};
use veilpost_proto::{Envelope, PostIvIdentifier, ProfileIdentifier, ProtocolVersion, SocialNetwork};

use crate::{
    author::{AuthorKeyStorage, AuthorResolver, importable},
    cancel::CancelSignal,
    cascade::key_resolution_cascade,
    config::DecryptionConfig,
    decoder::{
        CborPayloadParser, EncodedPayload, ImageSource, PayloadParser, SteganographyDecoder,
        first_payload,
    },
    error::{ConfigurationError, DecryptError, StoreError},
    io::{DecryptIo, KeyRecordStream},
    network::{KeyExchangeNetwork, LegacyGeneration, SharedPostKey, network_hint},
    progress::{DecryptProgress, DecryptionInfo, ProgressStream},
    store::{
        EcdhDerivation, LocalKeyStore, PersonaKeyring, PersonaStore, PostKeyCache,
        PostKeyProvenance,
    },
};

/// Where and for whom a post is being decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionContext {
    /// Network the post was found on
    pub current_social_network: SocialNetwork,
    /// Profile the user is signed in as
    pub current_profile: Option<ProfileIdentifier>,
    /// Who the page says wrote the post
    pub author_hint: Option<ProfileIdentifier>,
    /// Page the post was found on; recorded as provenance only
    pub post_url: Option<String>,
}

impl DecryptionContext {
    /// Context with nothing known but the network.
    pub fn new(network: SocialNetwork) -> Self {
        Self {
            current_social_network: network,
            current_profile: None,
            author_hint: None,
            post_url: None,
        }
    }

    /// Set the signed-in profile.
    #[must_use]
    pub fn with_current_profile(mut self, profile: ProfileIdentifier) -> Self {
        self.current_profile = Some(profile);
        self
    }

    /// Set the author hint.
    #[must_use]
    pub fn with_author_hint(mut self, author: ProfileIdentifier) -> Self {
        self.author_hint = Some(author);
        self
    }

    /// Set the post URL.
    #[must_use]
    pub fn with_post_url(mut self, url: impl Into<String>) -> Self {
        self.post_url = Some(url.into());
        self
    }

    /// Drop identifiers that are the unknown sentinel.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.current_profile = self.current_profile.filter(|profile| !profile.is_unknown());
        self.author_hint = self.author_hint.filter(|author| !author.is_unknown());
        self
    }
}

/// Collaborators the engine delegates storage, keys and network to.
#[derive(Clone)]
pub struct Collaborators {
    /// Persona and profile lookups
    pub personas: Arc<dyn PersonaStore>,
    /// Resolved post keys
    pub post_keys: Arc<dyn PostKeyCache>,
    /// Keys of the user's own posts
    pub local_keys: Arc<dyn LocalKeyStore>,
    /// The user's persona secrets
    pub keyring: Arc<dyn PersonaKeyring>,
    /// Key exchange network
    pub network: Arc<dyn KeyExchangeNetwork>,
}

/// Decryption engine.
///
/// Cheap to clone; clones share collaborators. Each call starts an
/// independent invocation.
#[derive(Clone)]
pub struct Decryption {
    config: DecryptionConfig,
    collaborators: Collaborators,
    parser: Arc<dyn PayloadParser>,
    stego: Option<Arc<dyn SteganographyDecoder>>,
    authors: AuthorResolver,
}

impl Decryption {
    /// Engine reading the CBOR wire form, without image support.
    pub fn new(config: DecryptionConfig, collaborators: Collaborators) -> Self {
        let authors =
            AuthorResolver::new(Arc::clone(&collaborators.personas), config.store_author_public_keys);
        Self { config, collaborators, parser: Arc::new(CborPayloadParser), stego: None, authors }
    }

    /// Replace the payload parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn PayloadParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Enable image posts.
    #[must_use]
    pub fn with_stego_decoder(mut self, decoder: Arc<dyn SteganographyDecoder>) -> Self {
        self.stego = Some(decoder);
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &DecryptionConfig {
        &self.config
    }

    /// Decrypt a raw payload.
    ///
    /// Without `cancel`, the invocation is cancelled
    /// [`DecryptionConfig::default_timeout`] after the stream is first polled.
    ///
    /// A payload that does not parse, or an envelope without IV, yields an
    /// empty stream.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnconfiguredNetwork`] if the context's network has
    /// no key exchange routing prefix. Checked before anything else happens.
    pub fn decrypt(
        &self,
        payload: &[u8],
        context: DecryptionContext,
        cancel: Option<CancellationToken>,
    ) -> Result<ProgressStream, ConfigurationError> {
        let hint = network_hint(context.current_social_network)?;

        match self.parser.parse(payload) {
            Ok(envelope) => {
                let this = self.clone();
                let progress = stream::once(async move {
                    let signal = this.signal(cancel);
                    this.drive(envelope, context.normalized(), hint, signal)
                });
                Ok(progress.flatten().boxed())
            },
            Err(err) => {
                tracing::debug!(error = %err, "payload did not parse");
                Ok(stream::empty().boxed())
            },
        }
    }

    /// Decrypt post text or an image post.
    ///
    /// Text goes through the network's text decoder and the first payload
    /// found is decrypted. Images need an author hint: its text form is the
    /// steganography passphrase.
    ///
    /// # Errors
    ///
    /// Same as [`decrypt`](Self::decrypt).
    pub fn decrypt_with_social_network_decoding(
        &self,
        encoded: EncodedPayload,
        context: DecryptionContext,
        cancel: Option<CancellationToken>,
    ) -> Result<ProgressStream, ConfigurationError> {
        let hint = network_hint(context.current_social_network)?;
        let context = context.normalized();
        let this = self.clone();

        let progress = stream::once(async move {
            let signal = this.signal(cancel);
            let payload = match this.extract_payload(&encoded, &context, &signal).await {
                Ok(payload) => payload,
                Err(err) => return stream::iter([DecryptProgress::Error(err)]).boxed(),
            };
            match this.parser.parse(&payload) {
                Ok(envelope) => this.drive(envelope, context, hint, signal),
                Err(err) => {
                    tracing::debug!(error = %err, "payload did not parse");
                    stream::empty().boxed()
                },
            }
        })
        .flatten();

        Ok(progress.boxed())
    }

    /// Remember the public key embedded in `envelope`, subject to the author
    /// guard. Awaitable variant of what every invocation does in the
    /// background.
    ///
    /// # Errors
    ///
    /// Whatever the persona store reports for the write.
    pub async fn store_author_public_key(
        &self,
        envelope: &Envelope,
        author_hint: Option<&ProfileIdentifier>,
    ) -> Result<AuthorKeyStorage, StoreError> {
        self.authors.store_author_public_key(envelope, author_hint).await
    }

    fn signal(&self, cancel: Option<CancellationToken>) -> CancelSignal {
        cancel.map_or_else(
            || CancelSignal::with_timeout(self.config.default_timeout),
            CancelSignal::from_token,
        )
    }

    async fn extract_payload(
        &self,
        encoded: &EncodedPayload,
        context: &DecryptionContext,
        signal: &CancelSignal,
    ) -> Result<Vec<u8>, DecryptError> {
        let network = context.current_social_network;
        let text = if let EncodedPayload::Text(text) = encoded {
            text.clone()
        } else {
            let author = context.author_hint.as_ref().ok_or(DecryptError::UnrecognizedAuthor)?;
            let decoder = self.stego.as_ref().ok_or_else(|| {
                DecryptError::Internal("no steganography decoder configured".to_string())
            })?;
            let image = ImageSource::of(encoded).ok_or(DecryptError::NoPayloadFound)?;
            signal
                .run(decoder.decode(image, &author.to_text()))
                .await??
                .ok_or(DecryptError::NoPayloadFound)?
        };

        first_payload(network, &text).ok_or(DecryptError::NoPayloadFound)
    }

    fn drive(
        &self,
        envelope: Envelope,
        context: DecryptionContext,
        network_hint: &'static str,
        signal: CancelSignal,
    ) -> ProgressStream {
        let Some(iv) = envelope.iv().map(<[u8]>::to_vec) else {
            tracing::debug!(version = %envelope.version, "envelope has no iv");
            return stream::empty().boxed();
        };

        let post = PostIvIdentifier::new(context.current_social_network.profile_domain(), &iv);
        let info = DecryptionInfo {
            iv,
            claimed_author: envelope.claimed_author().cloned(),
            public_shared: envelope.is_public(),
        };
        let this = self.clone();

        stream::once(async move {
            tracing::debug!(post = %post, version = %envelope.version, "decrypting post");
            this.authors.store_author_public_key_detached(&envelope, context.author_hint.as_ref());

            let author_hint = context.author_hint.clone();
            let io = InvocationIo::new(&this, post, &envelope, context, network_hint);
            stream::iter([DecryptProgress::Info(info)])
                .chain(key_resolution_cascade(io, envelope, author_hint, signal))
        })
        .flatten()
        .boxed()
    }
}

/// Strategy bundle of one invocation, backed by the engine's collaborators.
pub struct InvocationIo {
    post: PostIvIdentifier,
    provenance: PostKeyProvenance,
    current_profile: Option<ProfileIdentifier>,
    author_hint: Option<ProfileIdentifier>,
    network_hint: &'static str,
    collaborators: Collaborators,
    authors: AuthorResolver,
}

impl InvocationIo {
    fn new(
        engine: &Decryption,
        post: PostIvIdentifier,
        envelope: &Envelope,
        context: DecryptionContext,
        network_hint: &'static str,
    ) -> Self {
        let post_by = context
            .author_hint
            .clone()
            .or_else(|| envelope.claimed_author().cloned())
            .unwrap_or_else(ProfileIdentifier::unknown);
        let provenance =
            PostKeyProvenance { post_by, url: context.post_url, recipients: BTreeSet::new() };

        Self {
            post,
            provenance,
            current_profile: context.current_profile,
            author_hint: context.author_hint,
            network_hint,
            collaborators: engine.collaborators.clone(),
            authors: engine.authors.clone(),
        }
    }

    fn query_gossip(
        &self,
        generation: LegacyGeneration,
        iv: &[u8],
        signal: &CancelSignal,
    ) -> KeyRecordStream {
        let personas = Arc::clone(&self.collaborators.personas);
        let network = Arc::clone(&self.collaborators.network);
        let current_profile = self.current_profile.clone();
        let network_hint = self.network_hint;
        let iv = iv.to_vec();
        let signal = signal.clone();

        stream::once(async move {
            let own_key = own_public_key(personas.as_ref(), current_profile.as_ref())
                .await?
                .ok_or(DecryptError::CurrentProfileDoesNotConnectedToPersona)?;
            tracing::debug!(?generation, network_hint, "querying key exchange network");
            let records = network
                .query_post_key_v38_or_v39(generation, &iv, &own_key, network_hint, signal)
                .map_err(DecryptError::from);
            Ok::<_, DecryptError>(records)
        })
        .try_flatten()
        .boxed()
    }
}

async fn own_public_key(
    personas: &dyn PersonaStore,
    current_profile: Option<&ProfileIdentifier>,
) -> Result<Option<EcdhPublicKey>, DecryptError> {
    let Some(profile) = current_profile else {
        return Ok(None);
    };
    let persona = personas.find_persona_by_profile(profile).await?;
    Ok(persona.and_then(|persona| importable(&persona.public_key)))
}

impl DecryptIo for InvocationIo {
    async fn get_post_key_cache(&self) -> Result<Option<PostKey>, DecryptError> {
        Ok(self.collaborators.post_keys.get(&self.post).await?)
    }

    async fn set_post_key_cache(&self, key: &PostKey) -> Result<(), DecryptError> {
        self.collaborators.post_keys.set(&self.post, key, self.provenance.clone()).await?;
        Ok(())
    }

    async fn has_local_key_of(&self, author_key: &EcdhPublicKey) -> Result<bool, DecryptError> {
        Ok(self.collaborators.local_keys.has(author_key).await?)
    }

    async fn decrypt_by_local_key(
        &self,
        author_key: &EcdhPublicKey,
        data: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, DecryptError> {
        Ok(self.collaborators.local_keys.decrypt(author_key, iv, data).await?)
    }

    async fn derive_aes_key(&self, their_public: &EcdhPublicKey) -> Result<Vec<PostKey>, DecryptError> {
        Ok(self.collaborators.keyring.derive_post_keys(their_public, EcdhDerivation::Current).await?)
    }

    async fn derive_aes_key_legacy(
        &self,
        their_public: &EcdhPublicKey,
        iv: &[u8],
    ) -> Result<Vec<PostKey>, DecryptError> {
        let derivation = EcdhDerivation::Legacy { iv: iv.to_vec() };
        Ok(self.collaborators.keyring.derive_post_keys(their_public, derivation).await?)
    }

    async fn query_author_public_key(
        &self,
        claimed_author: Option<&ProfileIdentifier>,
        _signal: &CancelSignal,
    ) -> Result<Option<EcdhPublicKey>, DecryptError> {
        if claimed_author.is_some() && claimed_author != self.author_hint.as_ref() {
            tracing::debug!("claimed author differs from hint, resolving the hint");
        }
        Ok(self.authors.resolve(self.author_hint.as_ref()).await)
    }

    fn query_post_key_v37(&self, _iv: &[u8], _signal: &CancelSignal) -> KeyRecordStream {
        let unsupported = DecryptError::UnsupportedProtocolGeneration { version: ProtocolVersion::V37 };
        stream::once(future::ready(Err(unsupported))).boxed()
    }

    fn query_post_key_v38(&self, iv: &[u8], signal: &CancelSignal) -> KeyRecordStream {
        self.query_gossip(LegacyGeneration::V38, iv, signal)
    }

    fn query_post_key_v39(&self, iv: &[u8], signal: &CancelSignal) -> KeyRecordStream {
        self.query_gossip(LegacyGeneration::V39, iv, signal)
    }

    async fn query_post_key_v40(&self, iv: &[u8]) -> Result<Option<SharedPostKey>, DecryptError> {
        let Some(profile) = &self.current_profile else {
            tracing::debug!("no current profile, skipping -40 lookup");
            return Ok(None);
        };
        Ok(self.collaborators.network.query_post_key_v40(iv, profile.user_id()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_identifiers_are_normalized_away() {
        let context = DecryptionContext::new(SocialNetwork::Twitter)
            .with_current_profile(ProfileIdentifier::unknown())
            .with_author_hint(ProfileIdentifier::new("twitter.com", "alice"))
            .normalized();

        assert_eq!(context.current_profile, None);
        assert_eq!(context.author_hint, Some(ProfileIdentifier::new("twitter.com", "alice")));
    }

    #[test]
    fn context_builder_sets_url() {
        let context = DecryptionContext::new(SocialNetwork::Minds).with_post_url("https://minds.com/p/1");
        assert_eq!(context.post_url.as_deref(), Some("https://minds.com/p/1"));
    }
}

//! Key resolution cascade.
//!
//! Resolves the post key through strategies tried in a fixed order and opens
//! the post with the first key that works:
//!
//! ```text
//! cache ──hit──▶ open
//!   │ miss
//!   ▼
//! public post key ──▶ open
//!   │ end-to-end
//!   ▼
//! local key of the author ──▶ open, cache
//!   │ none, or the key does not open the post
//!   ▼
//! by generation:
//!   -37  rejected
//!   -38  author key ▶ legacy ECDH ▶ gossip records ─┐
//!   -39  author key ▶ ECDH ▶ gossip records ────────┼─▶ unwrap ▶ open, cache
//!   -40  author key ▶ ECDH ▶ single lookup ─────────┘
//! ```
//!
//! # Invariants
//!
//! - At most one event is produced, and it is terminal
//! - No IV: no event, no hook is called
//! - Cache hit: no local key, ECDH or network hook is called
//! - A key is cached only after it opened the post
//! - The embedded author key selects a local key only when the claimed author
//!   is the author hint
//! - Every suspending hook runs under the invocation's [`CancelSignal`];
//!   cancellation ends the cascade with [`DecryptError::Cancelled`]

use futures_util::{Stream, StreamExt, future, stream};
use veilpost_crypto::{EcdhPublicKey, PostKey, open, unwrap_post_key};
use veilpost_proto::{
    Envelope, PostKeyDistribution, ProfileIdentifier, ProtocolVersion, PublicKeyAlgorithm,
};

use crate::{
    cancel::CancelSignal,
    error::DecryptError,
    io::{DecryptIo, KeyRecordStream},
    network::{LegacyGeneration, SharedPostKey},
    progress::{DecryptProgress, DecryptedContent},
};

/// How a generation obtains key records.
#[derive(Debug, Clone, Copy)]
enum Exchange {
    Gossip(LegacyGeneration),
    Lookup,
}

/// Run the cascade for `envelope` with the capabilities in `io`.
///
/// `author_hint` is who the surrounding page says wrote the post. Yields a
/// single terminal event, or nothing if the envelope has no IV.
pub fn key_resolution_cascade<I>(
    io: I,
    envelope: Envelope,
    author_hint: Option<ProfileIdentifier>,
    signal: CancelSignal,
) -> impl Stream<Item = DecryptProgress> + Send
where
    I: DecryptIo + 'static,
{
    stream::once(async move {
        let Some(iv) = envelope.iv().map(<[u8]>::to_vec) else {
            tracing::debug!("envelope has no iv, nothing to resolve");
            return None;
        };

        let event = match resolve(&io, &envelope, author_hint.as_ref(), &iv, &signal).await {
            Ok(content) => DecryptProgress::Success(content),
            Err(err) => {
                tracing::debug!(error = %err, version = %envelope.version, "cascade failed");
                DecryptProgress::Error(err)
            },
        };
        Some(event)
    })
    .filter_map(future::ready)
}

async fn resolve<I: DecryptIo>(
    io: &I,
    envelope: &Envelope,
    author_hint: Option<&ProfileIdentifier>,
    iv: &[u8],
    signal: &CancelSignal,
) -> Result<DecryptedContent, DecryptError> {
    let ciphertext = &envelope.ciphertext;

    match signal.run(io.get_post_key_cache()).await? {
        Ok(Some(key)) => {
            tracing::debug!("post key cache hit");
            return open_content(&key, iv, ciphertext);
        },
        Ok(None) => {},
        Err(err) => tracing::warn!(error = %err, "post key cache read failed, continuing"),
    }

    let encryption = envelope
        .encryption
        .as_ref()
        .map_err(|err| DecryptError::PayloadBroken(err.to_string()))?;
    let owner_key_encrypted = match &encryption.distribution {
        PostKeyDistribution::Public { post_key } => {
            tracing::debug!("opening public post");
            let key = PostKey::from_slice(post_key)
                .map_err(|err| DecryptError::PayloadBroken(err.to_string()))?;
            return open_content(&key, iv, ciphertext);
        },
        PostKeyDistribution::EndToEnd { owner_key_encrypted } => owner_key_encrypted,
    };

    if let Some(author_key) = trusted_author_key(envelope, author_hint)
        && let Some(content) =
            open_with_local_key(io, &author_key, owner_key_encrypted, iv, ciphertext, signal)
                .await?
    {
        return Ok(content);
    }

    let exchange = match envelope.version {
        ProtocolVersion::V37 => return reject_v37(io, iv, signal).await,
        ProtocolVersion::V38 => Exchange::Gossip(LegacyGeneration::V38),
        ProtocolVersion::V39 => Exchange::Gossip(LegacyGeneration::V39),
        ProtocolVersion::V40 => Exchange::Lookup,
    };

    let author_key = signal
        .run(io.query_author_public_key(envelope.claimed_author(), signal))
        .await??
        .ok_or(DecryptError::AuthorPublicKeyNotFound)?;

    let wrapping_keys = match exchange {
        Exchange::Gossip(LegacyGeneration::V38) => {
            signal.run(io.derive_aes_key_legacy(&author_key, iv)).await??
        },
        Exchange::Gossip(LegacyGeneration::V39) | Exchange::Lookup => {
            signal.run(io.derive_aes_key(&author_key)).await??
        },
    };
    tracing::debug!(keys = wrapping_keys.len(), ?exchange, "derived wrapping keys");

    let mut records: KeyRecordStream = match exchange {
        Exchange::Gossip(LegacyGeneration::V38) => io.query_post_key_v38(iv, signal),
        Exchange::Gossip(LegacyGeneration::V39) => io.query_post_key_v39(iv, signal),
        Exchange::Lookup => {
            let record = signal.run(io.query_post_key_v40(iv)).await??;
            stream::iter(record.map(Ok)).boxed()
        },
    };

    let mut rejected = None;
    while let Some(record) = next_record(&mut records, signal).await? {
        let Some(key) = unwrap_record(&record, &wrapping_keys) else {
            tracing::debug!("key record not addressed to us");
            continue;
        };
        match open_content(&key, iv, ciphertext) {
            Ok(content) => {
                remember(io, &key, signal).await;
                return Ok(content);
            },
            Err(err) => {
                tracing::warn!(error = %err, "unwrapped post key does not open the post");
                rejected = Some(err);
            },
        }
    }

    Err(rejected.unwrap_or(DecryptError::KeyNotFound))
}

/// Local key step. Only cancellation is terminal; a missing or unusable local
/// key hands over to the generation's key exchange.
async fn open_with_local_key<I: DecryptIo>(
    io: &I,
    author_key: &EcdhPublicKey,
    owner_key_encrypted: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    signal: &CancelSignal,
) -> Result<Option<DecryptedContent>, DecryptError> {
    match signal.run(io.has_local_key_of(author_key)).await? {
        Ok(true) => {},
        Ok(false) => return Ok(None),
        Err(err) => {
            tracing::warn!(error = %err, "local key lookup failed, continuing");
            return Ok(None);
        },
    }

    tracing::debug!("opening with local key");
    let attempt = async {
        let raw = io.decrypt_by_local_key(author_key, owner_key_encrypted, iv).await?;
        let key = PostKey::from_slice(&raw)?;
        let content = open_content(&key, iv, ciphertext)?;
        Ok::<_, DecryptError>((key, content))
    };
    match signal.run(attempt).await? {
        Ok((key, content)) => {
            remember(io, &key, signal).await;
            Ok(Some(content))
        },
        Err(err) => {
            tracing::warn!(error = %err, "local key does not open the post, continuing");
            Ok(None)
        },
    }
}

/// Generation -37 has no key exchange. The hook reports why; records it
/// might produce cannot be unwrapped.
async fn reject_v37<I: DecryptIo>(
    io: &I,
    iv: &[u8],
    signal: &CancelSignal,
) -> Result<DecryptedContent, DecryptError> {
    let mut records = io.query_post_key_v37(iv, signal);
    if next_record(&mut records, signal).await?.is_some() {
        tracing::warn!("ignoring -37 key record");
    }
    Err(DecryptError::UnsupportedProtocolGeneration { version: ProtocolVersion::V37 })
}

async fn next_record(
    records: &mut KeyRecordStream,
    signal: &CancelSignal,
) -> Result<Option<SharedPostKey>, DecryptError> {
    tokio::select! {
        biased;
        () = signal.cancelled() => Err(DecryptError::Cancelled),
        record = records.next() => record.transpose(),
    }
}

async fn remember<I: DecryptIo>(io: &I, key: &PostKey, signal: &CancelSignal) {
    match signal.run(io.set_post_key_cache(key)).await {
        Ok(Ok(())) => tracing::debug!("post key cached"),
        Ok(Err(err)) => tracing::warn!(error = %err, "failed to cache post key"),
        Err(_) => tracing::debug!("cancelled before post key was cached"),
    }
}

fn unwrap_record(record: &SharedPostKey, wrapping_keys: &[PostKey]) -> Option<PostKey> {
    wrapping_keys.iter().find_map(|wrapping_key| {
        unwrap_post_key(wrapping_key, &record.post_key_iv, &record.encrypted_post_key).ok()
    })
}

fn open_content(key: &PostKey, iv: &[u8], ciphertext: &[u8]) -> Result<DecryptedContent, DecryptError> {
    let content = open(key, iv, ciphertext)?;
    Ok(DecryptedContent { content })
}

/// X25519 key embedded in the envelope, if the envelope's claimed author is
/// the hinted author.
fn trusted_author_key(
    envelope: &Envelope,
    author_hint: Option<&ProfileIdentifier>,
) -> Option<EcdhPublicKey> {
    let claimed = envelope.claimed_author()?;
    if author_hint != Some(claimed) {
        tracing::debug!(claimed = %claimed, "claimed author is not the hint, ignoring embedded key");
        return None;
    }
    envelope
        .claimed_author_public_key()
        .filter(|key| key.algorithm == PublicKeyAlgorithm::X25519)
        .and_then(|key| EcdhPublicKey::from_slice(&key.key).ok())
}

//! Strategy bundle consumed by the key resolution cascade.
//!
//! [`DecryptIo`] gathers every capability the cascade needs for one
//! invocation: cache access, local keys, ECDH derivation, author lookup and
//! the per-generation network queries. The cascade never reaches storage or
//! the network any other way, so swapping the bundle swaps the whole
//! environment (the orchestrator installs
//! [`InvocationIo`](crate::InvocationIo), tests install counting
//! doubles).
//!
//! Hooks bound to "this post" (the cache hooks) take no post argument: the
//! bundle is built per invocation and already knows the post identifier.

use std::future::Future;

use futures_util::stream::BoxStream;
use veilpost_crypto::{EcdhPublicKey, PostKey};
use veilpost_proto::ProfileIdentifier;

use crate::{cancel::CancelSignal, error::DecryptError, network::SharedPostKey};

/// Candidate key records produced lazily by a network query.
pub type KeyRecordStream = BoxStream<'static, Result<SharedPostKey, DecryptError>>;

/// Capabilities of one decryption invocation.
pub trait DecryptIo: Send + Sync {
    /// Key cached for this post, if any.
    fn get_post_key_cache(&self) -> impl Future<Output = Result<Option<PostKey>, DecryptError>> + Send;

    /// Cache the key of this post. Only called after the key opened the post.
    fn set_post_key_cache(&self, key: &PostKey) -> impl Future<Output = Result<(), DecryptError>> + Send;

    /// Whether the current user holds a local key for `author_key`.
    fn has_local_key_of(
        &self,
        author_key: &EcdhPublicKey,
    ) -> impl Future<Output = Result<bool, DecryptError>> + Send;

    /// Decrypt owner-encrypted data with the local key of `author_key`.
    fn decrypt_by_local_key(
        &self,
        author_key: &EcdhPublicKey,
        data: &[u8],
        iv: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, DecryptError>> + Send;

    /// Wrapping keys agreed with `their_public`, current construction.
    fn derive_aes_key(
        &self,
        their_public: &EcdhPublicKey,
    ) -> impl Future<Output = Result<Vec<PostKey>, DecryptError>> + Send;

    /// Wrapping keys agreed with `their_public`, IV-salted legacy construction.
    fn derive_aes_key_legacy(
        &self,
        their_public: &EcdhPublicKey,
        iv: &[u8],
    ) -> impl Future<Output = Result<Vec<PostKey>, DecryptError>> + Send;

    /// Public key of the post author. `Ok(None)` when no key is known.
    fn query_author_public_key(
        &self,
        claimed_author: Option<&ProfileIdentifier>,
        signal: &CancelSignal,
    ) -> impl Future<Output = Result<Option<EcdhPublicKey>, DecryptError>> + Send;

    /// Candidate key records for a -37 post.
    fn query_post_key_v37(&self, iv: &[u8], signal: &CancelSignal) -> KeyRecordStream;

    /// Candidate key records for a -38 post.
    fn query_post_key_v38(&self, iv: &[u8], signal: &CancelSignal) -> KeyRecordStream;

    /// Candidate key records for a -39 post.
    fn query_post_key_v39(&self, iv: &[u8], signal: &CancelSignal) -> KeyRecordStream;

    /// The key record addressed to the current user for a -40 post.
    fn query_post_key_v40(
        &self,
        iv: &[u8],
    ) -> impl Future<Output = Result<Option<SharedPostKey>, DecryptError>> + Send;
}

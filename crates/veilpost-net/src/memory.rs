#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

//! In-memory gossip transport.
//!
//! Each peer is a map from slot to bytes. Peers can be marked unreachable or
//! silent to exercise the client's failure handling. Clones share state.

use std::{
    collections::{HashMap, HashSet},
    future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use veilpost_core::{LegacyGeneration, SharedPostKey};
use veilpost_crypto::EcdhPublicKey;

use crate::{
    error::TransportError,
    records::{decode_records, encode_records},
    slot::{gossip_slot, lookup_slot},
    transport::GossipTransport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process set of gossip peers.
#[derive(Clone, Default)]
pub struct MemoryGossip {
    inner: Arc<Mutex<GossipInner>>,
}

#[derive(Default)]
struct GossipInner {
    slots: HashMap<(String, String), Vec<u8>>,
    unreachable: HashSet<String>,
    silent: HashSet<String>,
    requests: Vec<(String, String)>,
}

enum Answer {
    Ready(Result<Option<Vec<u8>>, TransportError>),
    Never,
}

impl MemoryGossip {
    /// Create a transport with no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `slot` on `peer`.
    pub fn put(&self, peer: &str, slot: &str, bytes: Vec<u8>) {
        lock(&self.inner).slots.insert((peer.to_string(), slot.to_string()), bytes);
    }

    /// Append `record` to the -38/-39 slot of `recipient` on `peer`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Malformed`] if the slot already holds something that
    /// is not a record list.
    pub fn publish_gossip(
        &self,
        peer: &str,
        generation: LegacyGeneration,
        network_hint: &str,
        iv: &[u8],
        recipient: &EcdhPublicKey,
        record: SharedPostKey,
    ) -> Result<(), TransportError> {
        let slot = gossip_slot(generation, network_hint, iv, recipient);
        let mut inner = lock(&self.inner);
        let key = (peer.to_string(), slot);
        let mut records = match inner.slots.get(&key) {
            Some(bytes) => decode_records(bytes)?,
            None => Vec::new(),
        };
        records.push(record);
        inner.slots.insert(key, encode_records(&records)?);
        Ok(())
    }

    /// Store the -40 record addressed to `user_id` on `peer`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Malformed`] if encoding fails.
    pub fn publish_lookup(
        &self,
        peer: &str,
        iv: &[u8],
        user_id: &str,
        record: SharedPostKey,
    ) -> Result<(), TransportError> {
        let bytes = encode_records(&[record])?;
        self.put(peer, &lookup_slot(iv, user_id), bytes);
        Ok(())
    }

    /// Make every request to `peer` fail.
    pub fn set_unreachable(&self, peer: &str) {
        lock(&self.inner).unreachable.insert(peer.to_string());
    }

    /// Make every request to `peer` hang.
    pub fn set_silent(&self, peer: &str) {
        lock(&self.inner).silent.insert(peer.to_string());
    }

    /// Every request seen so far, as `(peer, slot)`.
    pub fn requests(&self) -> Vec<(String, String)> {
        lock(&self.inner).requests.clone()
    }

    /// Number of requests sent to `peer`.
    pub fn request_count(&self, peer: &str) -> usize {
        lock(&self.inner).requests.iter().filter(|(to, _)| to == peer).count()
    }

    fn answer(&self, peer: &str, slot: &str) -> Answer {
        let mut inner = lock(&self.inner);
        inner.requests.push((peer.to_string(), slot.to_string()));

        if inner.silent.contains(peer) {
            return Answer::Never;
        }
        if inner.unreachable.contains(peer) {
            return Answer::Ready(Err(TransportError::Unreachable {
                peer: peer.to_string(),
                reason: "connection refused".to_string(),
            }));
        }
        Answer::Ready(Ok(inner.slots.get(&(peer.to_string(), slot.to_string())).cloned()))
    }
}

impl GossipTransport for MemoryGossip {
    async fn get(&self, peer: &str, slot: &str) -> Result<Option<Vec<u8>>, TransportError> {
        match self.answer(peer, slot) {
            Answer::Ready(answer) => answer,
            Answer::Never => future::pending().await,
        }
    }
}

//! Gossip implementation of [`KeyExchangeNetwork`].

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream, stream::BoxStream};
use veilpost_core::{CancelSignal, KeyExchangeNetwork, LegacyGeneration, NetworkError, SharedPostKey};
use veilpost_crypto::EcdhPublicKey;

use crate::{
    config::GossipConfig,
    error::TransportError,
    records::decode_records,
    slot::{gossip_slot, lookup_slot},
    transport::GossipTransport,
};

/// Key exchange over gossip peers.
///
/// Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct GossipKeyExchange<T: GossipTransport> {
    transport: T,
    config: Arc<GossipConfig>,
}

impl<T: GossipTransport> GossipKeyExchange<T> {
    /// Client probing the peers of `config` through `transport`.
    pub fn new(transport: T, config: GossipConfig) -> Self {
        Self { transport, config: Arc::new(config) }
    }

    /// Client configuration.
    pub fn config(&self) -> &GossipConfig {
        &self.config
    }
}

#[async_trait]
impl<T: GossipTransport> KeyExchangeNetwork for GossipKeyExchange<T> {
    fn query_post_key_v38_or_v39(
        &self,
        generation: LegacyGeneration,
        iv: &[u8],
        own_public_key: &EcdhPublicKey,
        network_hint: &str,
        signal: CancelSignal,
    ) -> BoxStream<'static, Result<SharedPostKey, NetworkError>> {
        let slot = gossip_slot(generation, network_hint, iv, own_public_key);
        tracing::debug!(?generation, slot = %slot, peers = self.config.peers.len(), "gossip query");

        let probe = Probe {
            transport: self.transport.clone(),
            peers: self.config.peers.clone().into(),
            slot,
            config: Arc::clone(&self.config),
            signal,
            ready: VecDeque::new(),
            seen: HashSet::new(),
            answered: 0,
            last_failure: None,
            finished: false,
        };
        stream::unfold(probe, Probe::advance).boxed()
    }

    async fn query_post_key_v40(
        &self,
        iv: &[u8],
        own_user_id: &str,
    ) -> Result<Option<SharedPostKey>, NetworkError> {
        let Some(peer) = self.config.peers.first() else {
            return Err(NetworkError::Unreachable("no gossip peers configured".to_string()));
        };
        let slot = lookup_slot(iv, own_user_id);
        tracing::debug!(peer = %peer, slot = %slot, "lookup query");

        let request = self.transport.get(peer, &slot);
        let answer = tokio::time::timeout(self.config.probe_timeout, request)
            .await
            .map_err(|_| TransportError::Timeout { peer: peer.clone() })??;
        let Some(bytes) = answer else {
            return Ok(None);
        };
        let records = decode_records(&bytes)?;
        if records.len() > 1 {
            tracing::warn!(peer = %peer, count = records.len(), "lookup slot holds several records");
        }
        Ok(records.into_iter().next())
    }
}

/// State of one lazy -38/-39 query.
struct Probe<T> {
    transport: T,
    peers: VecDeque<String>,
    slot: String,
    config: Arc<GossipConfig>,
    signal: CancelSignal,
    ready: VecDeque<SharedPostKey>,
    seen: HashSet<SharedPostKey>,
    answered: usize,
    last_failure: Option<TransportError>,
    finished: bool,
}

impl<T: GossipTransport> Probe<T> {
    /// Next stream item. Peers are contacted only when no buffered record is
    /// left.
    async fn advance(mut self) -> Option<(Result<SharedPostKey, NetworkError>, Self)> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(record) = self.ready.pop_front() {
                return Some((Ok(record), self));
            }
            if self.signal.is_cancelled() {
                return self.fail(NetworkError::Cancelled);
            }
            let Some(peer) = self.peers.pop_front() else {
                return self.exhausted();
            };

            match self.probe(&peer).await {
                Ok(records) => {
                    self.answered += 1;
                    let before = self.ready.len();
                    for record in records {
                        if self.seen.insert(record.clone()) {
                            self.ready.push_back(record);
                        }
                    }
                    tracing::debug!(peer = %peer, new = self.ready.len() - before, "peer answered");
                },
                Err(TransportError::Cancelled) => return self.fail(NetworkError::Cancelled),
                Err(err) => {
                    tracing::warn!(peer = %peer, error = %err, "skipping gossip peer");
                    self.last_failure = Some(err);
                },
            }
        }
    }

    async fn probe(&self, peer: &str) -> Result<Vec<SharedPostKey>, TransportError> {
        let request =
            tokio::time::timeout(self.config.probe_timeout, self.transport.get(peer, &self.slot));
        let answer = tokio::select! {
            biased;
            () = self.signal.cancelled() => return Err(TransportError::Cancelled),
            answer = request => {
                answer.map_err(|_| TransportError::Timeout { peer: peer.to_string() })??
            },
        };
        match answer {
            Some(bytes) => decode_records(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn exhausted(mut self) -> Option<(Result<SharedPostKey, NetworkError>, Self)> {
        if self.answered > 0 {
            self.finished = true;
            return None;
        }
        let reason = self
            .last_failure
            .take()
            .map_or_else(|| "no gossip peers configured".to_string(), |err| err.to_string());
        self.fail(NetworkError::Unreachable(reason))
    }

    fn fail(mut self, err: NetworkError) -> Option<(Result<SharedPostKey, NetworkError>, Self)> {
        self.finished = true;
        Some((Err(err), self))
    }
}

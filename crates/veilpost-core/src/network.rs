//! Key exchange network collaborator.
//!
//! Authors publish one [`SharedPostKey`] per recipient. Generations -38 and
//! -39 gossip those records between peers and are read as a lazy stream;
//! generation -40 looks a record up with a single request.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veilpost_crypto::EcdhPublicKey;
use veilpost_proto::SocialNetwork;

use crate::{
    cancel::CancelSignal,
    error::{ConfigurationError, DecryptError},
};

/// A post key wrapped for one recipient, as published on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedPostKey {
    /// Post key sealed with the ECDH-derived wrapping key
    pub encrypted_post_key: Vec<u8>,
    /// IV the post key was sealed with
    pub post_key_iv: Vec<u8>,
}

/// Which gossip generation a streaming query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyGeneration {
    /// Generation -38: full key slots
    V38,
    /// Generation -39: partitioned key slots
    V39,
}

/// Key exchange network failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// No peer could be reached
    #[error("no key exchange peer reachable: {0}")]
    Unreachable(String),

    /// A peer answered with something that is not a key record
    #[error("malformed key record: {0}")]
    Malformed(String),

    /// Query was cancelled
    #[error("query cancelled")]
    Cancelled,
}

impl From<NetworkError> for DecryptError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Cancelled => Self::Cancelled,
            other => Self::Network(other.to_string()),
        }
    }
}

/// Source of published post keys.
#[async_trait]
pub trait KeyExchangeNetwork: Send + Sync {
    /// Lazily stream candidate key records for a -38/-39 post.
    ///
    /// Peers are contacted as the stream is polled; dropping the stream
    /// abandons outstanding requests. Implementations check `signal` between
    /// steps. An `Err` item ends the query.
    fn query_post_key_v38_or_v39(
        &self,
        generation: LegacyGeneration,
        iv: &[u8],
        own_public_key: &EcdhPublicKey,
        network_hint: &str,
        signal: CancelSignal,
    ) -> BoxStream<'static, Result<SharedPostKey, NetworkError>>;

    /// Look up the key record addressed to `own_user_id` for a -40 post.
    async fn query_post_key_v40(
        &self,
        iv: &[u8],
        own_user_id: &str,
    ) -> Result<Option<SharedPostKey>, NetworkError>;
}

/// Routing prefix that partitions the key exchange namespace per network.
///
/// # Errors
///
/// [`ConfigurationError::UnconfiguredNetwork`] for [`SocialNetwork::Unknown`].
pub fn network_hint(network: SocialNetwork) -> Result<&'static str, ConfigurationError> {
    match network {
        SocialNetwork::Facebook => Ok(""),
        SocialNetwork::Twitter => Ok("twitter-"),
        SocialNetwork::Minds => Ok("minds-"),
        SocialNetwork::Instagram => Ok("instagram-"),
        SocialNetwork::Unknown => Err(ConfigurationError::UnconfiguredNetwork { network }),
    }
}

//! Transport abstraction for gossip peers.

use std::future::Future;

use crate::error::TransportError;

/// Reads slots from gossip peers.
///
/// Must be Clone (every query stream owns a handle), Send + Sync and
/// `'static`. Implementations typically share their connection state through
/// `Arc`, so clones reach the same peers.
pub trait GossipTransport: Clone + Send + Sync + 'static {
    /// Read `slot` from `peer`.
    ///
    /// Returns `Ok(None)` if the peer holds nothing under `slot`. Dropping the
    /// returned future abandons the request.
    fn get(
        &self,
        peer: &str,
        slot: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}

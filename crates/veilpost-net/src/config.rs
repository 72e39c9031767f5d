//! Gossip client configuration.

use std::time::Duration;

/// Gossip client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipConfig {
    /// Peers to probe, in order
    pub peers: Vec<String>,
    /// Upper bound on a single peer request
    pub probe_timeout: Duration,
}

impl GossipConfig {
    /// Configuration probing `peers` with the default timeout.
    pub fn with_peers<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { peers: peers.into_iter().map(Into::into).collect(), ..Self::default() }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self { peers: Vec::new(), probe_timeout: Duration::from_secs(10) }
    }
}

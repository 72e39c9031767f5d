//! Gossip key exchange for veilpost.
//!
//! Authors publish wrapped post keys into slots replicated across a set of
//! gossip peers. [`GossipKeyExchange`] reads them back for the decryption
//! engine:
//!
//! - Generations -38 and -39 probe the configured peers one at a time, as the
//!   record stream is polled, and yield every distinct record found under the
//!   post's slot for the reader's key.
//! - Generation -40 asks the first peer for the single record addressed to
//!   the reader's user id.
//!
//! Peers are reached through a [`GossipTransport`]. [`MemoryGossip`] is an
//! in-process transport for tests and fixtures.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod memory;
mod records;
pub mod slot;
mod transport;

pub use client::GossipKeyExchange;
pub use config::GossipConfig;
pub use error::TransportError;
pub use memory::MemoryGossip;
pub use records::{decode_records, encode_records};
pub use transport::GossipTransport;

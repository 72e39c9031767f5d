//! Fuzz target for the social network text codec
//!
//! # Strategy
//!
//! - Arbitrary post text around an encoded payload, on every network
//!
//! # Invariants
//!
//! - Decoding arbitrary text NEVER panics
//! - A payload encoded for a network is found when surrounded by whitespace

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use veilpost_proto::{SocialNetwork, social};

#[derive(Debug, Clone, Arbitrary)]
struct Post {
    network: u8,
    prefix: String,
    payload: Vec<u8>,
    suffix: String,
}

fuzz_target!(|post: Post| {
    let network = SocialNetwork::KNOWN[post.network as usize % SocialNetwork::KNOWN.len()];

    let _ = social::decode(network, &post.prefix);
    let _ = social::decode(network, &post.suffix);

    if post.payload.is_empty() {
        return;
    }
    let text = format!("{} {} {}", post.prefix, social::encode(network, &post.payload), post.suffix);
    let found = social::decode(network, &text);
    assert!(found.contains(&post.payload), "payload lost in {text:?}");
});

//! Slot addressing.
//!
//! Gossip slots are paths in a namespace shared by every network, partitioned
//! by the network routing prefix:
//!
//! ```text
//! -38   <prefix><b64 sha256(iv)>/<b64 sha256(recipient key)>
//! -39   <prefix><b64 sha256(iv)>/<first 2 chars of the above>
//! -40   v40/<b64url iv>/<recipient user id>
//! ```
//!
//! A -39 slot is a bucket shared by many recipients; readers try every record
//! in it.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use sha2::{Digest, Sha256};
use veilpost_core::LegacyGeneration;
use veilpost_crypto::EcdhPublicKey;

/// Characters of the key hash kept in a -39 bucket name.
pub const BUCKET_LEN: usize = 2;

/// Slot holding every record published for the post with `iv`.
pub fn post_slot(network_hint: &str, iv: &[u8]) -> String {
    format!("{network_hint}{}", STANDARD.encode(Sha256::digest(iv)))
}

/// Sub-slot of a post slot holding records for `recipient`.
pub fn key_slot(generation: LegacyGeneration, recipient: &EcdhPublicKey) -> String {
    let full = STANDARD.encode(Sha256::digest(recipient.as_bytes()));
    match generation {
        LegacyGeneration::V38 => full,
        LegacyGeneration::V39 => full.chars().take(BUCKET_LEN).collect(),
    }
}

/// Full slot read by a -38/-39 query.
pub fn gossip_slot(
    generation: LegacyGeneration,
    network_hint: &str,
    iv: &[u8],
    recipient: &EcdhPublicKey,
) -> String {
    format!("{}/{}", post_slot(network_hint, iv), key_slot(generation, recipient))
}

/// Slot holding the -40 record addressed to `user_id`.
pub fn lookup_slot(iv: &[u8], user_id: &str) -> String {
    format!("v40/{}/{user_id}", URL_SAFE_NO_PAD.encode(iv))
}

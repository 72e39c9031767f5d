//! Fuzz target for gossip slot contents
//!
//! Peers are untrusted; whatever they return is decoded as a record list.
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes NEVER panics
//! - Decoded records re-encode to bytes that decode to the same records

#![no_main]

use libfuzzer_sys::fuzz_target;
use veilpost_net::{decode_records, encode_records};

fuzz_target!(|data: &[u8]| {
    if let Ok(records) = decode_records(data) {
        let encoded = encode_records(&records).expect("decoded records must encode");
        assert_eq!(decode_records(&encoded).expect("encoded records must decode"), records);
    }
});

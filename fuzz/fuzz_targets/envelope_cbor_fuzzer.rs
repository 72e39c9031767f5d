//! Fuzz target for envelope parsing
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary input
//! - Deeply nested: arrays/maps nested to arbitrary depth inside a section
//! - Huge lengths: byte strings claiming massive lengths as ciphertext
//! - Section confusion: a well-formed map whose sections hold arbitrary CBOR
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Huge claimed lengths rejected (not allocated)
//! - Whatever parses re-encodes, and the re-encoding parses to the same
//!   envelope

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use veilpost_proto::{encode_envelope, parse_envelope};

#[derive(Debug, Clone, Arbitrary)]
enum EnvelopeAttack {
    RandomBytes { bytes: Vec<u8> },
    DeeplyNested { depth: u8, section: Section },
    HugeCiphertext { claimed_len_exponent: u8 },
    SectionConfusion { version: i8, section: Section, body: Vec<u8> },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Section {
    Author,
    AuthorKey,
    Encryption,
}

impl Section {
    fn key(self) -> u8 {
        match self {
            Self::Author => b'a',
            Self::AuthorKey => b'k',
            Self::Encryption => b'e',
        }
    }
}

fuzz_target!(|attack: EnvelopeAttack| {
    let bytes = match attack {
        EnvelopeAttack::RandomBytes { bytes } => bytes,
        EnvelopeAttack::DeeplyNested { depth, section } => {
            let mut nested = vec![0x81; (depth % 64) as usize];
            nested.push(0x01);
            envelope_with(-40, section, &nested)
        },
        EnvelopeAttack::HugeCiphertext { claimed_len_exponent } => {
            let claimed = 1u32 << (claimed_len_exponent % 32);
            let mut bytes = vec![0xA2, 0x61, b'v', 0x38, 39, 0x61, b'c', 0x5A];
            bytes.extend_from_slice(&claimed.to_be_bytes());
            bytes.extend(vec![0xAA; (claimed as usize).min(16)]);
            bytes
        },
        EnvelopeAttack::SectionConfusion { version, section, body } => {
            envelope_with(version, section, &body)
        },
    };

    if let Ok(envelope) = parse_envelope(&bytes) {
        let encoded = encode_envelope(&envelope).expect("parsed envelope must encode");
        let reparsed = parse_envelope(&encoded).expect("encoded envelope must parse");
        assert_eq!(reparsed.version, envelope.version);
        assert_eq!(reparsed.ciphertext, envelope.ciphertext);
        assert_eq!(reparsed.iv(), envelope.iv());
    }
});

/// Map `{v: version, c: h'', <section>: <raw>}`.
fn envelope_with(version: i8, section: Section, raw: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xA3, 0x61, b'v'];
    bytes.extend(cbor_int(version));
    bytes.extend([0x61, b'c', 0x40, 0x61, section.key()]);
    if raw.is_empty() {
        bytes.push(0xF6);
    } else {
        bytes.extend_from_slice(raw);
    }
    bytes
}

fn cbor_int(value: i8) -> Vec<u8> {
    if value >= 0 {
        vec![0x18, value as u8]
    } else {
        vec![0x38, (-1 - i16::from(value)) as u8]
    }
}

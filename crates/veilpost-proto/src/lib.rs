//! Veilpost Protocol
//!
//! Data model and encodings for encrypted social-network posts.
//!
//! # Layers
//!
//! ```text
//! Post text / image ──▶ social::decode ──▶ raw payload bytes
//!                                                │
//!                                                ▼
//!                        codec::parse_envelope ──▶ Envelope
//! ```
//!
//! - [`social`]: finds payloads embedded in post text. Each network has its
//!   own text form (marker-delimited base64, or a link for networks that
//!   mangle long tokens).
//! - [`codec`]: CBOR wire form of an [`Envelope`].
//! - [`identifier`]: stable identifiers for profiles and posts.
//!
//! # Invariants
//!
//! Envelope fields that can be damaged independently (author, author key,
//! encryption section) are decoded independently: a broken author never hides
//! a valid IV, and vice versa.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod envelope;
pub mod errors;
pub mod identifier;
pub mod network;
pub mod social;

pub use codec::{encode_envelope, parse_envelope};
pub use envelope::{
    AuthorPublicKey, Encryption, Envelope, FieldError, PostKeyDistribution, ProtocolVersion,
    PublicKeyAlgorithm,
};
pub use errors::{ProtocolError, Result};
pub use identifier::{PostIvIdentifier, ProfileIdentifier};
pub use network::SocialNetwork;

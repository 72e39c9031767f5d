//! Veilpost Cryptographic Primitives
//!
//! Building blocks used to recover the symmetric key of an encrypted post and
//! to open its content. Pure functions with deterministic outputs; nothing in
//! this crate touches storage or the network.
//!
//! # Key Lifecycle
//!
//! A post is encrypted once with a random 256-bit post key. Recipients recover
//! that key in one of two ways: the author unwraps it with a local key, every
//! other reader unwraps a per-recipient record published on the key-exchange
//! network using a key agreed through X25519.
//!
//! ```text
//! Own persona secret ──┐
//!                      ├─ X25519 ─▶ HKDF ─▶ Wrapping key
//! Author public key ───┘                       │
//!                                              ▼
//!                      Shared record ─▶ AES-GCM open ─▶ Post key
//!                                                          │
//!                                                          ▼
//!                           Post ciphertext ─▶ AES-GCM open ─▶ Content
//! ```
//!
//! # Derivation Generations
//!
//! Two agreement variants coexist on the wire and are NOT interchangeable:
//!
//! - [`derive_post_key`]: current derivation, depends only on the key pair
//! - [`derive_post_key_legacy`]: older derivation that salts HKDF with the
//!   post IV
//!
//! Using the wrong one silently produces a wrong key. The mistake only shows up
//! later as an AEAD authentication failure.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod post_keys;

pub use post_keys::{
    CryptoError, EcdhPublicKey, IV_SIZE, KEY_SIZE, PersonaSecret, PostKey, derive_post_key,
    derive_post_key_legacy, open, seal, unwrap_post_key, wrap_post_key,
};

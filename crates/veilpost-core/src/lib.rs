//! Veilpost decryption engine
//!
//! Resolves the key of an encrypted social-network post and decrypts it,
//! reporting progress as an ordered, cancellable event stream.
//!
//! # Components
//!
//! - [`Decryption`]: entry point; parses the payload, derives the post
//!   identifier and drives one cascade per invocation
//! - [`key_resolution_cascade`]: cache, public key, local key, then the
//!   generation-specific ECDH and key exchange strategies
//! - [`DecryptIo`]: the strategy bundle a cascade runs against
//! - [`AuthorResolver`]: author public key lookup and the guard that keeps
//!   spoofed embedded keys out of the persona store
//! - [`CancelSignal`]: per-invocation cancellation (caller token or deadline)
//! - [`store`]: collaborator traits for personas and key material, with
//!   in-memory implementations
//!
//! # Events
//!
//! An invocation emits [`DecryptProgress::Info`] first, then exactly one of
//! [`DecryptProgress::Success`] or [`DecryptProgress::Error`]. Envelopes
//! without IV and payloads that do not parse produce no events at all.
//! Configuration problems are returned before a stream exists.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod author;
mod cancel;
mod cascade;
mod config;
mod decoder;
mod decryption;
mod error;
mod io;
mod network;
mod progress;
pub mod store;

pub use author::{AuthorKeyStorage, AuthorResolver};
pub use cancel::CancelSignal;
pub use cascade::key_resolution_cascade;
pub use config::DecryptionConfig;
pub use decoder::{
    CborPayloadParser, EncodedPayload, ImageSource, PayloadParser, SteganographyDecoder,
    first_payload,
};
pub use decryption::{Collaborators, Decryption, DecryptionContext, InvocationIo};
pub use error::{ConfigurationError, DecryptError, ParseError, StegoError, StoreError};
pub use io::{DecryptIo, KeyRecordStream};
pub use network::{KeyExchangeNetwork, LegacyGeneration, NetworkError, SharedPostKey, network_hint};
pub use progress::{DecryptProgress, DecryptedContent, DecryptionInfo, ProgressStream};

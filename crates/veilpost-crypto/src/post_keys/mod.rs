//! Post key recovery: key material types, ECDH derivation and AES-GCM.

mod derivation;
mod encryption;
mod error;
mod keys;

pub use derivation::{derive_post_key, derive_post_key_legacy};
pub use encryption::{IV_SIZE, open, seal, unwrap_post_key, wrap_post_key};
pub use error::CryptoError;
pub use keys::{EcdhPublicKey, KEY_SIZE, PersonaSecret, PostKey};

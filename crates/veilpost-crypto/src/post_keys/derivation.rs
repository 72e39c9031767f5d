//! Wrapping key derivation using X25519 and HKDF

use hkdf::Hkdf;
use sha2::Sha256;

use super::{
    error::CryptoError,
    keys::{EcdhPublicKey, KEY_SIZE, PersonaSecret, PostKey},
};

/// Label used by the current derivation
const CURRENT_LABEL: &[u8] = b"veilpostEcdhV40";

/// Label used by the IV-salted legacy derivation
const LEGACY_LABEL: &[u8] = b"veilpostEcdhV38";

/// Derive a wrapping key from our persona secret and a counterpart public key.
///
/// The result depends only on the key pair, so a counterpart relationship
/// yields the same key for every post.
///
/// # Errors
///
/// - `CryptoError::NonContributory` if `their_public` is a low-order point
pub fn derive_post_key(
    own: &PersonaSecret,
    their_public: &EcdhPublicKey,
) -> Result<PostKey, CryptoError> {
    let shared = agree(own, their_public)?;
    Ok(expand(None, &shared, CURRENT_LABEL))
}

/// Derive a wrapping key with the legacy, IV-salted construction.
///
/// Posts from older generations bind the wrapping key to the post IV. The
/// output never equals [`derive_post_key`] for the same key pair.
///
/// # Errors
///
/// - `CryptoError::NonContributory` if `their_public` is a low-order point
pub fn derive_post_key_legacy(
    own: &PersonaSecret,
    their_public: &EcdhPublicKey,
    iv: &[u8],
) -> Result<PostKey, CryptoError> {
    let shared = agree(own, their_public)?;
    Ok(expand(Some(iv), &shared, LEGACY_LABEL))
}

fn agree(own: &PersonaSecret, their_public: &EcdhPublicKey) -> Result<[u8; KEY_SIZE], CryptoError> {
    let shared = own.secret().diffie_hellman(&their_public.to_dalek());
    if !shared.was_contributory() {
        return Err(CryptoError::NonContributory);
    }
    Ok(shared.to_bytes())
}

fn expand(salt: Option<&[u8]>, shared: &[u8; KEY_SIZE], label: &[u8]) -> PostKey {
    let hkdf = Hkdf::<Sha256>::new(salt, shared);

    let mut key = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(label, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    PostKey::new(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PersonaSecret {
        PersonaSecret::from_bytes([0x11; KEY_SIZE])
    }

    fn bob() -> PersonaSecret {
        PersonaSecret::from_bytes([0x22; KEY_SIZE])
    }

    #[test]
    fn derive_is_symmetric() {
        let from_alice = derive_post_key(&alice(), &bob().public_key()).unwrap();
        let from_bob = derive_post_key(&bob(), &alice().public_key()).unwrap();

        assert_eq!(from_alice, from_bob, "both sides must agree on the wrapping key");
    }

    #[test]
    fn legacy_derive_is_symmetric() {
        let iv = [0x42u8; 16];
        let from_alice = derive_post_key_legacy(&alice(), &bob().public_key(), &iv).unwrap();
        let from_bob = derive_post_key_legacy(&bob(), &alice().public_key(), &iv).unwrap();

        assert_eq!(from_alice, from_bob);
    }

    #[test]
    fn derive_is_deterministic() {
        let first = derive_post_key(&alice(), &bob().public_key()).unwrap();
        let second = derive_post_key(&alice(), &bob().public_key()).unwrap();

        assert_eq!(first, second, "same inputs must produce same output");
    }

    #[test]
    fn legacy_depends_on_iv() {
        let a = derive_post_key_legacy(&alice(), &bob().public_key(), &[1u8; 16]).unwrap();
        let b = derive_post_key_legacy(&alice(), &bob().public_key(), &[2u8; 16]).unwrap();

        assert_ne!(a, b, "different IVs must produce different legacy keys");
    }

    #[test]
    fn legacy_differs_from_current() {
        let iv = [0x42u8; 16];
        let current = derive_post_key(&alice(), &bob().public_key()).unwrap();
        let legacy = derive_post_key_legacy(&alice(), &bob().public_key(), &iv).unwrap();

        assert_ne!(current, legacy, "derivation generations must not be interchangeable");
    }

    #[test]
    fn legacy_with_empty_iv_still_differs_by_label() {
        let current = derive_post_key(&alice(), &bob().public_key()).unwrap();
        let legacy = derive_post_key_legacy(&alice(), &bob().public_key(), &[]).unwrap();

        assert_ne!(current, legacy);
    }

    #[test]
    fn low_order_point_is_rejected() {
        // The identity point makes every shared secret zero
        let result = derive_post_key(&alice(), &EcdhPublicKey::new([0u8; KEY_SIZE]));
        assert_eq!(result, Err(CryptoError::NonContributory));
    }
}

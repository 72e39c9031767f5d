//! Property-based tests for post key derivation.
//!
//! The two derivation generations must never be confused: a regression that
//! made them agree would let a legacy post "decrypt" with a current key and
//! fail only at the AEAD check.

use proptest::prelude::*;
use veilpost_crypto::{
    IV_SIZE, PersonaSecret, PostKey, derive_post_key, derive_post_key_legacy, open, seal,
    unwrap_post_key, wrap_post_key,
};

/// Strategy for persona secrets
fn arbitrary_secret() -> impl Strategy<Value = PersonaSecret> {
    any::<[u8; 32]>().prop_map(PersonaSecret::from_bytes)
}

proptest! {
    #[test]
    fn prop_legacy_and_current_differ(
        own in arbitrary_secret(),
        theirs in arbitrary_secret(),
        iv in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let current = derive_post_key(&own, &theirs.public_key());
        let legacy = derive_post_key_legacy(&own, &theirs.public_key(), &iv);

        if let (Ok(current), Ok(legacy)) = (current, legacy) {
            prop_assert_ne!(current, legacy);
        }
    }

    #[test]
    fn prop_agreement_is_symmetric(
        a in arbitrary_secret(),
        b in arbitrary_secret(),
        iv in any::<[u8; IV_SIZE]>(),
    ) {
        let ab = derive_post_key_legacy(&a, &b.public_key(), &iv).unwrap();
        let ba = derive_post_key_legacy(&b, &a.public_key(), &iv).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn prop_recipient_recovers_post_key(
        author in arbitrary_secret(),
        reader in arbitrary_secret(),
        post_key in any::<[u8; 32]>(),
        iv in any::<[u8; IV_SIZE]>(),
        content in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let post_key = PostKey::new(post_key);
        let ciphertext = seal(&post_key, &iv, &content).unwrap();

        // Author publishes a record wrapped for the reader
        let wrapping = derive_post_key(&author, &reader.public_key()).unwrap();
        let record = wrap_post_key(&wrapping, &iv, &post_key).unwrap();

        // Reader derives the same wrapping key from the author's public key
        let derived = derive_post_key(&reader, &author.public_key()).unwrap();
        let recovered = unwrap_post_key(&derived, &iv, &record).unwrap();

        prop_assert_eq!(open(&recovered, &iv, &ciphertext).unwrap(), content);
    }

    #[test]
    fn prop_wrong_generation_never_unwraps(
        author in arbitrary_secret(),
        reader in arbitrary_secret(),
        iv in any::<[u8; IV_SIZE]>(),
    ) {
        let post_key = PostKey::new([0x5Au8; 32]);
        let wrapping = derive_post_key_legacy(&author, &reader.public_key(), &iv).unwrap();
        let record = wrap_post_key(&wrapping, &iv, &post_key).unwrap();

        let current = derive_post_key(&reader, &author.public_key()).unwrap();
        prop_assert!(unwrap_post_key(&current, &iv, &record).is_err());
    }
}

#[test]
fn known_keys_produce_distinct_generations() {
    let own = PersonaSecret::from_bytes([1u8; 32]);
    let theirs = PersonaSecret::from_bytes([2u8; 32]);
    let iv = hex::decode("1234567890abcdef1234567890abcdef").unwrap();

    let current = derive_post_key(&own, &theirs.public_key()).unwrap();
    let legacy = derive_post_key_legacy(&own, &theirs.public_key(), &iv).unwrap();

    assert_ne!(current.as_bytes(), legacy.as_bytes());
}

//! Property-based tests for envelope decoding and post identifiers
//!
//! Decoding runs on untrusted post text, so the properties here focus on
//! never panicking and on identifiers staying injective.

use proptest::prelude::*;
use veilpost_proto::{
    AuthorPublicKey, Encryption, Envelope, PostIvIdentifier, PostKeyDistribution,
    ProfileIdentifier, ProtocolVersion, PublicKeyAlgorithm, SocialNetwork, encode_envelope,
    parse_envelope, social,
};

fn arbitrary_version() -> impl Strategy<Value = ProtocolVersion> {
    prop_oneof![
        Just(ProtocolVersion::V37),
        Just(ProtocolVersion::V38),
        Just(ProtocolVersion::V39),
        Just(ProtocolVersion::V40),
    ]
}

fn arbitrary_network() -> impl Strategy<Value = SocialNetwork> {
    prop_oneof![
        Just(SocialNetwork::Facebook),
        Just(SocialNetwork::Twitter),
        Just(SocialNetwork::Minds),
        Just(SocialNetwork::Instagram),
    ]
}

fn arbitrary_domain() -> impl Strategy<Value = String> {
    "[a-z]{1,12}\\.[a-z]{2,3}"
}

fn arbitrary_envelope() -> impl Strategy<Value = Envelope> {
    (
        arbitrary_version(),
        proptest::option::of("[a-z0-9_]{1,16}"),
        proptest::option::of(prop::collection::vec(any::<u8>(), 32)),
        proptest::option::of(prop::collection::vec(any::<u8>(), 16)),
        any::<bool>(),
        prop::collection::vec(any::<u8>(), 0..64),
        prop::collection::vec(any::<u8>(), 0..512),
    )
        .prop_map(|(version, author, key, iv, public, post_key, ciphertext)| {
            let distribution = if public {
                PostKeyDistribution::Public { post_key }
            } else {
                PostKeyDistribution::EndToEnd { owner_key_encrypted: post_key }
            };
            Envelope {
                version,
                author: Ok(author.map(|user| ProfileIdentifier::new("twitter.com", user))),
                author_public_key: Ok(
                    key.map(|key| AuthorPublicKey { algorithm: PublicKeyAlgorithm::X25519, key })
                ),
                encryption: Ok(Encryption { iv, distribution }),
                ciphertext,
            }
        })
}

proptest! {
    #[test]
    fn prop_post_identifier_deterministic(
        domain in arbitrary_domain(),
        iv in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        prop_assert_eq!(PostIvIdentifier::new(domain.clone(), &iv), PostIvIdentifier::new(domain, &iv));
    }

    #[test]
    fn prop_post_identifier_injective(
        a in (arbitrary_domain(), prop::collection::vec(any::<u8>(), 0..32)),
        b in (arbitrary_domain(), prop::collection::vec(any::<u8>(), 0..32)),
    ) {
        let id_a = PostIvIdentifier::new(a.0.clone(), &a.1);
        let id_b = PostIvIdentifier::new(b.0.clone(), &b.1);

        prop_assert_eq!(a == b, id_a == id_b);
        prop_assert_eq!(a == b, id_a.to_text() == id_b.to_text());
    }

    #[test]
    fn prop_post_identifier_text_parses_back(
        domain in arbitrary_domain(),
        iv in prop::collection::vec(any::<u8>(), 1..32),
    ) {
        let id = PostIvIdentifier::new(domain, &iv);
        prop_assert_eq!(id.to_text().parse::<PostIvIdentifier>().unwrap(), id);
    }

    #[test]
    fn prop_profile_text_parses_back(
        domain in arbitrary_domain(),
        user_id in "[a-z0-9_/.]{1,24}",
    ) {
        let id = ProfileIdentifier::try_new(domain, user_id).unwrap();
        prop_assert_eq!(id.to_text().parse::<ProfileIdentifier>().unwrap(), id);
    }

    #[test]
    fn prop_envelope_survives_text_transport(
        envelope in arbitrary_envelope(),
        network in arbitrary_network(),
        prefix in "[a-zA-Z ]{0,40}",
        suffix in "[a-zA-Z ]{0,40}",
    ) {
        let bytes = encode_envelope(&envelope).unwrap();
        let text = format!("{prefix} {} {suffix}", social::encode(network, &bytes));

        let payloads = social::decode(network, &text);

        prop_assert_eq!(payloads.len(), 1);
        prop_assert_eq!(parse_envelope(&payloads[0]).unwrap(), envelope);
    }

    #[test]
    fn prop_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_envelope(&bytes);
    }

    #[test]
    fn prop_social_decode_never_panics(network in arbitrary_network(), text in "\\PC{0,200}") {
        let _ = social::decode(network, &text);
    }
}

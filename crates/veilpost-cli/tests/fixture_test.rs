//! Fixture installations driving the engine end to end.
//!
//! Each test writes a fixture the way a user would, installs it, decrypts a
//! post and checks the rendered output lines.

use futures_util::StreamExt;
use veilpost_cli::{Fixture, Installation, report};
use veilpost_core::{DecryptionConfig, DecryptionContext, EncodedPayload};
use veilpost_crypto::{PersonaSecret, PostKey, derive_post_key, seal, wrap_post_key};
use veilpost_proto::{
    AuthorPublicKey, Encryption, Envelope, PostKeyDistribution, ProfileIdentifier, ProtocolVersion,
    PublicKeyAlgorithm, SocialNetwork, encode_envelope, social,
};

const IV: [u8; 16] = [0x3C; 16];
const RECORD_IV: [u8; 16] = [0x4D; 16];

fn alice_secret() -> PersonaSecret {
    PersonaSecret::from_bytes([0xA1; 32])
}

fn bob_secret() -> PersonaSecret {
    PersonaSecret::from_bytes([0xB0; 32])
}

fn post_key() -> PostKey {
    PostKey::new([0x42; 32])
}

/// Alice's post as it appears on Twitter.
fn tweet(version: ProtocolVersion) -> String {
    let envelope = Envelope {
        version,
        author: Ok(Some(ProfileIdentifier::new("twitter.com", "alice"))),
        author_public_key: Ok(Some(AuthorPublicKey {
            algorithm: PublicKeyAlgorithm::X25519,
            key: alice_secret().public_key().as_bytes().to_vec(),
        })),
        encryption: Ok(Encryption {
            iv: Some(IV.to_vec()),
            distribution: PostKeyDistribution::EndToEnd { owner_key_encrypted: vec![0; 48] },
        }),
        ciphertext: seal(&post_key(), &IV, b"fixture secret").unwrap(),
    };
    let payload = encode_envelope(&envelope).unwrap();
    format!("new post {}", social::encode(SocialNetwork::Twitter, &payload))
}

/// Bob's installation. `network` is the fixture's gossip section.
fn fixture(network: &str) -> Fixture {
    Fixture::from_json(&format!(
        r#"{{
            "personas": [
                {{"public_key": "{alice}", "profiles": ["person:twitter.com/alice"]}},
                {{"public_key": "{bob}", "profiles": ["person:twitter.com/bob"]}}
            ],
            "secrets": ["{bob_secret}"],
            "gossip": {network}
        }}"#,
        alice = hex::encode(alice_secret().public_key().as_bytes()),
        bob = hex::encode(bob_secret().public_key().as_bytes()),
        bob_secret = hex::encode([0xB0; 32]),
    ))
    .unwrap()
}

fn wrapped_for_bob() -> String {
    let wrapping = derive_post_key(&alice_secret(), &bob_secret().public_key()).unwrap();
    hex::encode(wrap_post_key(&wrapping, &RECORD_IV, &post_key()).unwrap())
}

fn bob_reading_alice() -> DecryptionContext {
    DecryptionContext::new(SocialNetwork::Twitter)
        .with_current_profile(ProfileIdentifier::new("twitter.com", "bob"))
        .with_author_hint(ProfileIdentifier::new("twitter.com", "alice"))
}

async fn run(installation: &Installation, text: String) -> Vec<String> {
    installation
        .engine
        .decrypt_with_social_network_decoding(EncodedPayload::Text(text), bob_reading_alice(), None)
        .unwrap()
        .map(|event| report::render(&event))
        .collect()
        .await
}

#[tokio::test]
async fn v40_lookup_from_fixture() {
    let fixture = fixture(&format!(
        r#"{{"peers": ["p1"], "lookups": [{{
            "peer": "p1", "iv": "{iv}", "user_id": "bob",
            "encrypted_post_key": "{key}", "post_key_iv": "{record_iv}"
        }}]}}"#,
        iv = hex::encode(IV),
        key = wrapped_for_bob(),
        record_iv = hex::encode(RECORD_IV),
    ));
    let installation =
        fixture.install(SocialNetwork::Twitter, DecryptionConfig::default()).await.unwrap();

    let lines = run(&installation, tweet(ProtocolVersion::V40)).await;

    assert_eq!(lines, vec![
        format!("info iv={} author=person:twitter.com/alice shared=private", hex::encode(IV)),
        "success fixture secret".to_string(),
    ]);
    assert_eq!(installation.post_keys.len(), 1);
}

#[tokio::test]
async fn v39_gossip_from_fixture_skips_dead_peer() {
    let fixture = fixture(&format!(
        r#"{{"peers": ["dead", "p2"], "unreachable": ["dead"], "records": [{{
            "peer": "p2", "generation": "v39", "iv": "{iv}", "recipient": "{bob}",
            "encrypted_post_key": "{key}", "post_key_iv": "{record_iv}"
        }}]}}"#,
        iv = hex::encode(IV),
        bob = hex::encode(bob_secret().public_key().as_bytes()),
        key = wrapped_for_bob(),
        record_iv = hex::encode(RECORD_IV),
    ));
    let installation =
        fixture.install(SocialNetwork::Twitter, DecryptionConfig::default()).await.unwrap();

    let lines = run(&installation, tweet(ProtocolVersion::V39)).await;

    assert_eq!(lines.last().map(String::as_str), Some("success fixture secret"));
    assert_eq!(installation.gossip.request_count("dead"), 1);
    assert_eq!(installation.gossip.request_count("p2"), 1);
}

#[tokio::test]
async fn empty_network_reports_missing_key() {
    let installation = fixture(r#"{"peers": ["p1"]}"#)
        .install(SocialNetwork::Twitter, DecryptionConfig::default())
        .await
        .unwrap();

    let lines = run(&installation, tweet(ProtocolVersion::V40)).await;

    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("error "));
    assert!(installation.post_keys.is_empty());
}

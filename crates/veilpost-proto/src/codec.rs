//! CBOR wire form of an [`Envelope`].
//!
//! The outer map is decoded strictly (version and ciphertext are required);
//! the author, author key and encryption sections are kept as raw CBOR values
//! and decoded one by one, so damage in one section surfaces as a
//! [`FieldError`] on that field only.

use ciborium::Value;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    envelope::{
        AuthorPublicKey, Encryption, Envelope, FieldError, PostKeyDistribution, ProtocolVersion,
        PublicKeyAlgorithm,
    },
    errors::{ProtocolError, Result},
    identifier::ProfileIdentifier,
};

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "v")]
    version: i8,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    author: Option<Value>,
    #[serde(rename = "k", default, skip_serializing_if = "Option::is_none")]
    author_key: Option<Value>,
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    encryption: Option<Value>,
    #[serde(rename = "c")]
    ciphertext: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireAuthorKey {
    algorithm: u8,
    key: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireEncryption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_key: Option<Vec<u8>>,
}

/// Decode raw payload bytes into an [`Envelope`].
///
/// # Errors
///
/// - [`ProtocolError::CborDecode`] if the bytes are not an envelope map
/// - [`ProtocolError::UnknownVersion`] if the version tag is not a known
///   generation
pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope> {
    let wire: WireEnvelope =
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))?;
    let version = ProtocolVersion::from_tag(wire.version)?;

    Ok(Envelope {
        version,
        author: wire.author.map(decode_author).transpose(),
        author_public_key: wire.author_key.map(decode_author_key).transpose(),
        encryption: wire
            .encryption
            .ok_or_else(|| FieldError::new("encryption", "missing"))
            .and_then(decode_encryption),
        ciphertext: wire.ciphertext,
    })
}

/// Encode an [`Envelope`] to its CBOR wire form.
///
/// Fields holding a [`FieldError`] are omitted.
///
/// # Errors
///
/// [`ProtocolError::CborEncode`] if serialization fails.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let author = match &envelope.author {
        Ok(Some(author)) => Some(to_value(&author.to_text())?),
        _ => None,
    };
    let author_key = match &envelope.author_public_key {
        Ok(Some(key)) => Some(to_value(&WireAuthorKey {
            algorithm: key.algorithm.code(),
            key: key.key.clone(),
        })?),
        _ => None,
    };
    let encryption = match &envelope.encryption {
        Ok(encryption) => {
            let (post_key, owner_key) = match &encryption.distribution {
                PostKeyDistribution::Public { post_key } => (Some(post_key.clone()), None),
                PostKeyDistribution::EndToEnd { owner_key_encrypted } => {
                    (None, Some(owner_key_encrypted.clone()))
                },
            };
            Some(to_value(&WireEncryption { iv: encryption.iv.clone(), post_key, owner_key })?)
        },
        Err(_) => None,
    };

    let wire = WireEnvelope {
        version: envelope.version.tag(),
        author,
        author_key,
        encryption,
        ciphertext: envelope.ciphertext.clone(),
    };

    let mut buf = Vec::new();
    ciborium::ser::into_writer(&wire, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Value::serialized(value).map_err(|e| ProtocolError::CborEncode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(field: &'static str, value: &Value) -> std::result::Result<T, FieldError> {
    value.deserialized().map_err(|e| FieldError::new(field, e.to_string()))
}

fn decode_author(value: Value) -> std::result::Result<ProfileIdentifier, FieldError> {
    let text: String = from_value("author", &value)?;
    text.parse().map_err(|e: ProtocolError| FieldError::new("author", e.to_string()))
}

fn decode_author_key(value: Value) -> std::result::Result<AuthorPublicKey, FieldError> {
    let wire: WireAuthorKey = from_value("author_key", &value)?;
    let algorithm = PublicKeyAlgorithm::from_code(wire.algorithm).ok_or_else(|| {
        FieldError::new("author_key", format!("unknown algorithm {}", wire.algorithm))
    })?;
    Ok(AuthorPublicKey { algorithm, key: wire.key })
}

fn decode_encryption(value: Value) -> std::result::Result<Encryption, FieldError> {
    let wire: WireEncryption = from_value("encryption", &value)?;
    let distribution = match (wire.post_key, wire.owner_key) {
        (Some(post_key), _) => PostKeyDistribution::Public { post_key },
        (None, Some(owner_key_encrypted)) => PostKeyDistribution::EndToEnd { owner_key_encrypted },
        (None, None) => return Err(FieldError::new("encryption", "no post key distribution")),
    };
    Ok(Encryption { iv: wire.iv, distribution })
}

//! Post content encryption using AES-256-GCM with 16-byte IVs
//!
//! All functions are pure - IVs are provided by the caller. Post content and
//! published key records share the same cipher.

use aes_gcm::{
    AesGcm, Nonce,
    aead::{Aead, KeyInit, consts::U16},
    aes::Aes256,
};

use super::{
    error::CryptoError,
    keys::{KEY_SIZE, PostKey},
};

/// Size of the IV carried by envelopes and key records (16 bytes)
pub const IV_SIZE: usize = 16;

/// AES-256-GCM with a 128-bit nonce
type PostCipher = AesGcm<Aes256, U16>;

/// Open AES-GCM ciphertext (including the 16-byte tag).
///
/// # Errors
///
/// - `InvalidIvLength`: IV is not [`IV_SIZE`] bytes
/// - `DecryptionFailed`: authentication tag or key is incorrect
pub fn open(key: &PostKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = PostCipher::new(key.as_bytes().into());
    let nonce = nonce(iv)?;

    cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::DecryptionFailed {
        reason: "authentication failed".to_string(),
    })
}

/// Seal plaintext with AES-GCM.
///
/// Returns ciphertext with the 16-byte tag appended.
///
/// # Errors
///
/// - `InvalidIvLength`: IV is not [`IV_SIZE`] bytes
pub fn seal(key: &PostKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = PostCipher::new(key.as_bytes().into());
    let nonce = nonce(iv)?;

    let Ok(ciphertext) = cipher.encrypt(nonce, plaintext) else {
        unreachable!("AES-GCM encryption cannot fail with valid inputs");
    };
    Ok(ciphertext)
}

/// Wrap a post key for one recipient.
///
/// # Errors
///
/// - `InvalidIvLength`: IV is not [`IV_SIZE`] bytes
pub fn wrap_post_key(
    wrapping_key: &PostKey,
    iv: &[u8],
    post_key: &PostKey,
) -> Result<Vec<u8>, CryptoError> {
    seal(wrapping_key, iv, post_key.as_bytes())
}

/// Recover a post key from a wrapped record.
///
/// # Errors
///
/// - `DecryptionFailed`: the wrapping key does not fit this record
/// - `InvalidKeyLength`: the record opened but does not hold a 32-byte key
pub fn unwrap_post_key(
    wrapping_key: &PostKey,
    iv: &[u8],
    wrapped: &[u8],
) -> Result<PostKey, CryptoError> {
    let raw = open(wrapping_key, iv, wrapped)?;
    if raw.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: raw.len() });
    }
    PostKey::from_slice(&raw)
}

fn nonce(iv: &[u8]) -> Result<&Nonce<U16>, CryptoError> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidIvLength { expected: IV_SIZE, actual: iv.len() });
    }
    Ok(Nonce::<U16>::from_slice(iv))
}

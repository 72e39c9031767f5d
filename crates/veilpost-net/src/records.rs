//! CBOR form of the records stored in a slot.

use veilpost_core::SharedPostKey;

use crate::error::TransportError;

/// Encode the records of one slot.
///
/// # Errors
///
/// [`TransportError::Malformed`] if CBOR serialization fails.
pub fn encode_records(records: &[SharedPostKey]) -> Result<Vec<u8>, TransportError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(records, &mut buf)
        .map_err(|err| TransportError::Malformed(err.to_string()))?;
    Ok(buf)
}

/// Decode the records of one slot.
///
/// # Errors
///
/// [`TransportError::Malformed`] if `bytes` is not a CBOR record list.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<SharedPostKey>, TransportError> {
    ciborium::de::from_reader(bytes).map_err(|err| TransportError::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_contents_survive_encoding() {
        let records = vec![
            SharedPostKey { encrypted_post_key: vec![1; 48], post_key_iv: vec![2; 16] },
            SharedPostKey { encrypted_post_key: vec![3; 48], post_key_iv: vec![4; 16] },
        ];
        assert_eq!(decode_records(&encode_records(&records).unwrap()).unwrap(), records);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode_records(b"\xff\xfe"), Err(TransportError::Malformed(_))));
    }
}

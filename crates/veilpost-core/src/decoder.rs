//! Turning what a page shows into an envelope.
//!
//! Posts arrive as text or as images carrying a hidden payload. Text goes
//! through the network's text decoder directly; images are first decoded by a
//! [`SteganographyDecoder`] keyed with the author's identifier, and its text
//! output goes through the same text decoder.

use async_trait::async_trait;
use veilpost_proto::{Envelope, SocialNetwork, parse_envelope, social};

use crate::error::{ParseError, StegoError};

/// Post content handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPayload {
    /// Post text
    Text(String),
    /// Raw image bytes
    Image(Vec<u8>),
    /// Location of an image
    ImageUrl(String),
}

/// Image given to a [`SteganographyDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Raw image bytes
    Bytes(&'a [u8]),
    /// Location of an image
    Url(&'a str),
}

impl<'a> ImageSource<'a> {
    /// Borrow the image of an [`EncodedPayload`]. `None` for text.
    pub fn of(payload: &'a EncodedPayload) -> Option<Self> {
        match payload {
            EncodedPayload::Text(_) => None,
            EncodedPayload::Image(bytes) => Some(Self::Bytes(bytes)),
            EncodedPayload::ImageUrl(url) => Some(Self::Url(url)),
        }
    }
}

/// Parses raw payload bytes into an [`Envelope`].
pub trait PayloadParser: Send + Sync {
    /// Parse `payload`.
    fn parse(&self, payload: &[u8]) -> Result<Envelope, ParseError>;
}

/// [`PayloadParser`] for the CBOR wire form.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborPayloadParser;

impl PayloadParser for CborPayloadParser {
    fn parse(&self, payload: &[u8]) -> Result<Envelope, ParseError> {
        Ok(parse_envelope(payload)?)
    }
}

/// Extracts text hidden in an image.
#[async_trait]
pub trait SteganographyDecoder: Send + Sync {
    /// Decode the text hidden in `image` with `passphrase`. `Ok(None)` when
    /// the image carries nothing.
    async fn decode(
        &self,
        image: ImageSource<'_>,
        passphrase: &str,
    ) -> Result<Option<String>, StegoError>;
}

/// First payload the text decoder of `network` finds in `text`.
pub fn first_payload(network: SocialNetwork, text: &str) -> Option<Vec<u8>> {
    social::decode(network, text).into_iter().next()
}

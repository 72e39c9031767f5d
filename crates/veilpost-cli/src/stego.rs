//! Steganography decoder backed by fixture data.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use veilpost_core::{ImageSource, StegoError, SteganographyDecoder};

use crate::fixture::ImageEntry;

/// Looks images up by URL, or by the SHA-256 of their bytes, and reveals the
/// fixture's hidden text when the passphrase matches.
#[derive(Debug, Clone, Default)]
pub struct FixtureStego {
    images: HashMap<String, ImageEntry>,
}

impl FixtureStego {
    /// Decoder over `images`.
    pub fn new(images: &[ImageEntry]) -> Self {
        let images = images.iter().map(|image| (image.source.clone(), image.clone())).collect();
        Self { images }
    }
}

#[async_trait]
impl SteganographyDecoder for FixtureStego {
    async fn decode(
        &self,
        image: ImageSource<'_>,
        passphrase: &str,
    ) -> Result<Option<String>, StegoError> {
        let source = match image {
            ImageSource::Url(url) => url.to_string(),
            ImageSource::Bytes(bytes) => hex::encode(Sha256::digest(bytes)),
        };
        let Some(entry) = self.images.get(&source) else {
            tracing::debug!(source = %source, "image carries no payload");
            return Ok(None);
        };
        if entry.passphrase != passphrase {
            tracing::debug!(source = %source, "passphrase does not reveal a payload");
            return Ok(None);
        }
        Ok(Some(entry.text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str) -> ImageEntry {
        ImageEntry {
            source: source.to_string(),
            passphrase: "person:twitter.com/alice".to_string(),
            text: "hidden".to_string(),
        }
    }

    #[tokio::test]
    async fn url_images_need_the_right_passphrase() {
        let stego = FixtureStego::new(&[entry("https://img/1.png")]);
        let url = ImageSource::Url("https://img/1.png");

        assert_eq!(
            stego.decode(url, "person:twitter.com/alice").await.unwrap(),
            Some("hidden".to_string())
        );
        assert_eq!(stego.decode(url, "person:twitter.com/bob").await.unwrap(), None);
        assert_eq!(
            stego.decode(ImageSource::Url("https://img/2.png"), "x").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn byte_images_match_by_digest() {
        let bytes = b"\x89PNG fake";
        let stego = FixtureStego::new(&[entry(&hex::encode(Sha256::digest(bytes)))]);

        let hidden = stego.decode(ImageSource::Bytes(bytes), "person:twitter.com/alice").await;
        assert_eq!(hidden.unwrap(), Some("hidden".to_string()));
    }
}

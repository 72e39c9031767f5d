//! Progress events of a decryption invocation.

use futures_util::stream::BoxStream;
use veilpost_proto::ProfileIdentifier;

use crate::error::DecryptError;

/// Ordered, cancellable stream of events for one invocation.
///
/// The end of the stream means "done"; it is never surfaced as a value.
pub type ProgressStream = BoxStream<'static, DecryptProgress>;

/// One step of a decryption invocation.
///
/// At most one terminal event ([`Success`](Self::Success) or
/// [`Error`](Self::Error)) is emitted, and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptProgress {
    /// Envelope understood, key resolution starting. Always first.
    Info(DecryptionInfo),
    /// Post decrypted
    Success(DecryptedContent),
    /// Post could not be decrypted
    Error(DecryptError),
}

impl DecryptProgress {
    /// Returns true for [`Success`](Self::Success) and [`Error`](Self::Error).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Info(_))
    }
}

/// What is known about a post before its key is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionInfo {
    /// IV of the post
    pub iv: Vec<u8>,
    /// Author the envelope claims to be from
    pub claimed_author: Option<ProfileIdentifier>,
    /// Whether anyone can read the post. `None` if the encryption section is
    /// broken.
    pub public_shared: Option<bool>,
}

/// Decrypted post content.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedContent {
    /// Plaintext bytes
    pub content: Vec<u8>,
}

impl DecryptedContent {
    /// Content as UTF-8 text, if it is text.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

impl std::fmt::Debug for DecryptedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedContent").field("len", &self.content.len()).finish()
    }
}

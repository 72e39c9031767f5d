//! Identifiers for profiles and posts.
//!
//! Both identifiers have a stable text form used as storage keys and in logs:
//!
//! - profile: `person:<network>/<user_id>`
//! - post: `post_iv:<network>/<hex iv>`

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

const PROFILE_PREFIX: &str = "person:";
const POST_IV_PREFIX: &str = "post_iv:";

/// Network domain of the unknown profile sentinel.
const UNKNOWN_NETWORK: &str = "localhost";
/// User id of the unknown profile sentinel.
const UNKNOWN_USER: &str = "$unknown";

/// A user profile on one social network.
///
/// The network is a domain and never contains `/`; the text form splits on
/// the first one. User ids may contain anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileIdentifier {
    network: String,
    user_id: String,
}

impl ProfileIdentifier {
    /// Create a profile identifier from a known-good network domain.
    ///
    /// Use [`ProfileIdentifier::try_new`] for networks that come from input.
    pub fn new(network: impl Into<String>, user_id: impl Into<String>) -> Self {
        let network = network.into();
        debug_assert!(!network.contains('/'), "network domain contains '/': {network}");
        Self { network, user_id: user_id.into() }
    }

    /// Create a profile identifier, rejecting an empty network or user id and
    /// a network containing `/`.
    pub fn try_new(
        network: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let (network, user_id) = (network.into(), user_id.into());
        if network.is_empty() || user_id.is_empty() || network.contains('/') {
            return Err(ProtocolError::InvalidIdentifier(format!(
                "{PROFILE_PREFIX}{network}/{user_id}"
            )));
        }
        Ok(Self { network, user_id })
    }

    /// Sentinel for "the surrounding page could not tell who this is".
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_NETWORK, UNKNOWN_USER)
    }

    /// True for the [`ProfileIdentifier::unknown`] sentinel.
    pub fn is_unknown(&self) -> bool {
        self.network == UNKNOWN_NETWORK && self.user_id == UNKNOWN_USER
    }

    /// Profile domain, e.g. `twitter.com`.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// User id on that network.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Text form, `person:<network>/<user_id>`.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProfileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PROFILE_PREFIX}{}/{}", self.network, self.user_id)
    }
}

impl FromStr for ProfileIdentifier {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(PROFILE_PREFIX)
            .ok_or_else(|| ProtocolError::InvalidIdentifier(s.to_string()))?;
        let (network, user_id) =
            rest.split_once('/').ok_or_else(|| ProtocolError::InvalidIdentifier(s.to_string()))?;
        Self::try_new(network, user_id)
    }
}

impl TryFrom<String> for ProfileIdentifier {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProfileIdentifier> for String {
    fn from(value: ProfileIdentifier) -> Self {
        value.to_text()
    }
}

/// Stable identifier of an encrypted post.
///
/// Derived from the network the post was seen on and the envelope IV. The
/// same post seen on two networks yields two identifiers.
///
/// # Invariants
///
/// - Deterministic: same (network, IV) always yields the same identifier
/// - Injective: different (network, IV) pairs never share an identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostIvIdentifier {
    network: String,
    post_iv: String,
}

impl PostIvIdentifier {
    /// Derive the identifier for a post.
    pub fn new(network: impl Into<String>, iv: &[u8]) -> Self {
        Self { network: network.into(), post_iv: hex::encode(iv) }
    }

    /// Profile domain the post was seen on.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Hex-encoded IV.
    pub fn post_iv(&self) -> &str {
        &self.post_iv
    }

    /// Text form, `post_iv:<network>/<hex iv>`.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PostIvIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{POST_IV_PREFIX}{}/{}", self.network, self.post_iv)
    }
}

impl FromStr for PostIvIdentifier {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidIdentifier(s.to_string());
        let rest = s.strip_prefix(POST_IV_PREFIX).ok_or_else(invalid)?;
        let (network, post_iv) = rest.rsplit_once('/').ok_or_else(invalid)?;
        let iv = hex::decode(post_iv).map_err(|_| invalid())?;
        if network.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(network, &iv))
    }
}

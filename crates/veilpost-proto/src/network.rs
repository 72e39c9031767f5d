//! Supported social networks.

use std::{fmt, str::FromStr};

use crate::errors::ProtocolError;

/// Social network a post was found on.
///
/// `Unknown` exists so callers can represent an unconfigured deployment; most
/// operations that need network-specific behavior refuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialNetwork {
    /// facebook.com
    Facebook,
    /// twitter.com
    Twitter,
    /// minds.com
    Minds,
    /// instagram.com
    Instagram,
    /// Not configured
    Unknown,
}

impl SocialNetwork {
    /// All configured networks.
    pub const KNOWN: [Self; 4] = [Self::Facebook, Self::Twitter, Self::Minds, Self::Instagram];

    /// Profile domain used in identifiers.
    pub const fn profile_domain(self) -> &'static str {
        match self {
            Self::Facebook => "facebook.com",
            Self::Twitter => "twitter.com",
            Self::Minds => "minds.com",
            Self::Instagram => "instagram.com",
            Self::Unknown => "localhost",
        }
    }

    /// Look up a network by its profile domain.
    pub fn from_domain(domain: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|network| network.profile_domain() == domain)
    }

    /// Short lowercase name, e.g. `twitter`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Minds => "minds",
            Self::Instagram => "instagram",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SocialNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the short name (`twitter`) or the domain (`twitter.com`).
impl FromStr for SocialNetwork {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::KNOWN
            .into_iter()
            .find(|network| network.name() == lower || network.profile_domain() == lower)
            .ok_or_else(|| ProtocolError::UnknownNetwork(s.to_string()))
    }
}

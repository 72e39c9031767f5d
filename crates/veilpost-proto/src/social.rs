//! Text transport of payloads on social networks.
//!
//! Two text forms exist:
//!
//! - marker form, `🎼<base64>:||`, used everywhere
//! - link form, `https://veilpost.io/?PostData=<url-safe base64>`, produced
//!   for Twitter where long opaque tokens get mangled; Twitter posts may carry
//!   either form
//!
//! [`decode`] never fails. Text without a well-formed payload yields an empty
//! list; payloads come back in the order they appear in the text.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};

use crate::network::SocialNetwork;

/// Opening marker of the marker form.
pub const PAYLOAD_MARKER: &str = "\u{1F3BC}";
/// Closing marker of the marker form.
pub const PAYLOAD_TERMINATOR: &str = ":||";
/// Prefix of the link form.
pub const POST_LINK_PREFIX: &str = "https://veilpost.io/?PostData=";

/// Encode a raw payload as post text for `network`.
pub fn encode(network: SocialNetwork, payload: &[u8]) -> String {
    match network {
        SocialNetwork::Twitter => format!("{POST_LINK_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload)),
        _ => format!("{PAYLOAD_MARKER}{}{PAYLOAD_TERMINATOR}", STANDARD.encode(payload)),
    }
}

/// Find every payload embedded in `text`.
pub fn decode(network: SocialNetwork, text: &str) -> Vec<Vec<u8>> {
    let mut found: Vec<(usize, Vec<u8>)> = decode_markers(text);
    if network == SocialNetwork::Twitter {
        found.extend(decode_links(text));
        found.sort_by_key(|(position, _)| *position);
    }
    found.into_iter().map(|(_, payload)| payload).collect()
}

fn decode_markers(text: &str) -> Vec<(usize, Vec<u8>)> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(start) = text[offset..].find(PAYLOAD_MARKER) {
        let body_start = offset + start + PAYLOAD_MARKER.len();
        let Some(len) = text[body_start..].find(PAYLOAD_TERMINATOR) else {
            break;
        };
        let body = &text[body_start..body_start + len];
        if let Ok(payload) = STANDARD.decode(body.trim())
            && !payload.is_empty()
        {
            found.push((offset + start, payload));
        }
        // A stray marker inside a broken body may open the next payload.
        offset = body_start;
    }

    found
}

fn decode_links(text: &str) -> Vec<(usize, Vec<u8>)> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(start) = text[offset..].find(POST_LINK_PREFIX) {
        let body_start = offset + start + POST_LINK_PREFIX.len();
        let body_len = text[body_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(text.len() - body_start);
        let body = &text[body_start..body_start + body_len];
        if let Ok(payload) = URL_SAFE_NO_PAD.decode(body)
            && !payload.is_empty()
        {
            found.push((offset + start, payload));
        }
        offset = body_start + body_len;
    }

    found
}

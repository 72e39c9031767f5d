//! Text rendering of progress events.

use veilpost_core::DecryptProgress;

/// One line describing `event`.
///
/// ```text
/// info iv=<hex> author=<profile|unknown> shared=<public|private|unknown>
/// success <text>            (or: success hex:<bytes> for binary content)
/// error <message>
/// ```
pub fn render(event: &DecryptProgress) -> String {
    match event {
        DecryptProgress::Info(info) => {
            let author = info
                .claimed_author
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            let shared = match info.public_shared {
                Some(true) => "public",
                Some(false) => "private",
                None => "unknown",
            };
            format!("info iv={} author={author} shared={shared}", hex::encode(&info.iv))
        },
        DecryptProgress::Success(content) => match content.text() {
            Some(text) => format!("success {text}"),
            None => format!("success hex:{}", hex::encode(&content.content)),
        },
        DecryptProgress::Error(err) => format!("error {err}"),
    }
}

#[cfg(test)]
mod tests {
    use veilpost_core::{DecryptError, DecryptedContent, DecryptionInfo};
    use veilpost_proto::ProfileIdentifier;

    use super::*;

    #[test]
    fn info_line() {
        let event = DecryptProgress::Info(DecryptionInfo {
            iv: vec![0xab, 0xcd],
            claimed_author: Some(ProfileIdentifier::new("twitter.com", "alice")),
            public_shared: Some(false),
        });
        assert_eq!(render(&event), "info iv=abcd author=person:twitter.com/alice shared=private");
    }

    #[test]
    fn success_lines() {
        let text = DecryptProgress::Success(DecryptedContent { content: b"hi".to_vec() });
        let binary = DecryptProgress::Success(DecryptedContent { content: vec![0xff, 0x00] });

        assert_eq!(render(&text), "success hi");
        assert_eq!(render(&binary), "success hex:ff00");
    }

    #[test]
    fn error_line_uses_display() {
        let event = DecryptProgress::Error(DecryptError::KeyNotFound);
        assert_eq!(render(&event), format!("error {}", DecryptError::KeyNotFound));
    }
}

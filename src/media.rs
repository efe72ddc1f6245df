//! Image detection and base64 payload encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

/// One item taken from the clipboard or picked from disk.
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ClipboardItem {
    /// Wraps raw bytes, detecting the MIME type from magic bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ClipboardItem {
            mime: detect_mime(&bytes),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
    }
}

#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<String> {
    infer::get(data).map(|info| info.mime_type().to_string())
}

#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 9] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

    #[test]
    fn png_is_an_image() {
        let item = ClipboardItem::from_bytes(PNG.to_vec());
        assert_eq!(item.mime.as_deref(), Some("image/png"));
        assert!(item.is_image());
    }

    #[test]
    fn plain_text_is_not_an_image() {
        let item = ClipboardItem::from_bytes(b"just some notes".to_vec());
        assert!(!item.is_image());
    }

    #[test]
    fn base64_uses_standard_alphabet() {
        assert_eq!(encode_base64(b"hi?>"), "aGk/Pg==");
    }
}

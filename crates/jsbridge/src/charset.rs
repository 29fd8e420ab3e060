//! Byte-to-text decoding for response bodies.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// How far into a document `<meta charset>` is looked for.
const META_SNIFF_LEN: usize = 1024;

/// Decode a plain-text body.
///
/// The `content-type` charset is used when it names a known encoding; a byte
/// order mark overrides it and UTF-8 is the fallback. Malformed sequences are
/// replaced with U+FFFD.
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset.and_then(for_label).unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Decode an HTML body: BOM, then `content-type` charset, then a
/// `<meta charset>` near the top of the document, then UTF-8.
pub fn decode_html(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| charset.and_then(for_label))
        .or_else(|| sniff_meta(&bytes[..bytes.len().min(META_SNIFF_LEN)]))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

fn sniff_meta(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest = lower.as_slice();
    while let Some(start) = find(rest, b"<meta") {
        rest = &rest[start + 5..];
        let end = rest.iter().position(|&b| b == b'>').unwrap_or(rest.len());
        let tag = &rest[..end];
        if let Some(at) = find(tag, b"charset=") {
            let label: Vec<u8> = tag[at + 8..]
                .iter()
                .copied()
                .skip_while(|b| matches!(b, b'"' | b'\'') || b.is_ascii_whitespace())
                .take_while(|b| !matches!(b, b'"' | b'\'' | b';' | b'/') && !b.is_ascii_whitespace())
                .collect();
            if let Some(encoding) = Encoding::for_label(&label) {
                // A meta tag can't describe a UTF-16 document it was read from as ASCII.
                if encoding == UTF_16LE || encoding == UTF_16BE {
                    return Some(UTF_8);
                }
                return Some(encoding);
            }
        }
        rest = &rest[end..];
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

//! Turns fetched bytes into UTF-8 text.
//!
//! The declared charset is taken from the Content-Type header, then from a
//! `<meta>` declaration near the top of the document. Undeclared content is
//! read as UTF-8, replacing invalid sequences.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// How far into the document a `<meta>` charset declaration is looked for.
const META_SCAN_BYTES: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-zA-Z0-9_.:\-]+)"#)
        .expect("Invalid meta charset regex")
});

pub fn decode_bytes_to_utf8(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(bytes))
        .unwrap_or(UTF_8);

    if encoding == UTF_8 {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let (decoded, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = actual.name(), "replaced malformed sequences while decoding");
    }
    decoded.into_owned()
}

/// "text/html; charset=ISO-8859-1" -> windows-1252 (per the WHATWG label table).
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes())
    })
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_charset_wins() {
        // "Crème" in ISO-8859-1
        let bytes = b"Cr\xe8me br\xfbl\xe9e";
        assert_eq!(
            decode_bytes_to_utf8(bytes, Some("text/html; charset=ISO-8859-1")),
            "Crème brûlée"
        );
    }

    #[test]
    fn test_meta_charset() {
        let bytes = b"<html><head><meta charset=\"windows-1252\"></head><body>caf\xe9</body></html>";
        assert!(decode_bytes_to_utf8(bytes, Some("text/html")).contains("café"));

        let http_equiv = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">na\xefve";
        assert!(decode_bytes_to_utf8(http_equiv, None).ends_with("naïve"));
    }

    #[test]
    fn test_utf8_default_and_lossy() {
        assert_eq!(decode_bytes_to_utf8("jalapeño".as_bytes(), None), "jalapeño");
        assert_eq!(decode_bytes_to_utf8(b"ok\xff", None), "ok\u{fffd}");
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        assert_eq!(
            decode_bytes_to_utf8(b"plain", Some("text/html; charset=made-up")),
            "plain"
        );
    }
}

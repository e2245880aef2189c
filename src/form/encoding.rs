//! Percent-encoding for `application/x-www-form-urlencoded` payloads.
//!
//! Follows the classic form rules rather than plain RFC 3986: space
//! encodes as `+`, a literal `+` decodes to space, and everything outside
//! `A-Z a-z 0-9 * - . _` is emitted as uppercase `%XX` over the UTF-8
//! bytes. Key components additionally escape `.` (see [`encode_key`]),
//! since the path grammar splits raw keys on dots. Decoding is strict: a
//! `%` not followed by two hex digits is malformed input, not passed
//! through.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, VersionedError};

/// Bytes escaped on encode in the value position: everything
/// non-alphanumeric except the characters `URLEncoder` historically
/// leaves bare.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b' ');

/// Key position also escapes `.`: path splitting runs on the raw key,
/// so a literal dot in a segment name must travel as `%2E`.
const FORM_KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'_')
    .remove(b' ');

/// Percent-encode a value component.
pub fn encode(raw: &str) -> String {
    // Space handling is the only deviation from plain percent-encoding,
    // so encode everything else first and map spaces afterwards.
    utf8_percent_encode(raw, FORM_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}

/// Percent-encode a key component. Like [`encode`] but `.` is escaped
/// too, keeping it a literal character through the decode-side path
/// split.
pub fn encode_key(raw: &str) -> String {
    utf8_percent_encode(raw, FORM_KEY_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}

/// Percent-decode a component (key or value).
///
/// Returns [`VersionedError::MalformedInput`] for a truncated or non-hex
/// escape and [`VersionedError::InvalidUtf8`] when the decoded bytes are
/// not valid UTF-8.
pub fn decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(VersionedError::MalformedInput(format!(
                        "truncated percent-escape in '{raw}'"
                    )));
                }
                let hi = hex_value(bytes[i + 1]);
                let lo = hex_value(bytes[i + 2]);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push(hi << 4 | lo),
                    _ => {
                        return Err(VersionedError::MalformedInput(format!(
                            "invalid percent-escape in '{raw}'"
                        )))
                    }
                }
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    Ok(String::from_utf8(out)?)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

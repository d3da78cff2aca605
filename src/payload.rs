//! Fetched payload classification.
//!
//! The CSV endpoint answers invalid or out-of-range requests with an HTML
//! page instead of tabular data, and in-range months with no observations
//! come back as a lone header line. Both cases must be skipped, never
//! merged, so every payload is classified before parsing.

use encoding_rs::WINDOWS_1252;

/// Classification of one fetched payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Delimited tabular data, decoded to UTF-8
    Tabular(String),

    /// An HTML page served in place of tabular data
    Placeholder,

    /// Header-only or zero-length response
    Empty,
}

/// Classify a raw response body.
///
/// HTML detection runs on the raw bytes before any decode; the text path
/// decodes the portal's legacy Windows-1252 encoding with replacement
/// characters, so a garbled byte can never fail a whole window.
pub fn classify(raw: &[u8]) -> Payload {
    if looks_like_html(raw) {
        return Payload::Placeholder;
    }

    let text = decode_portal_text(raw);
    if text.lines().count() < 2 {
        return Payload::Empty;
    }

    Payload::Tabular(text)
}

/// Decode portal bytes (Windows-1252) to a UTF-8 string, lossily
fn decode_portal_text(raw: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(raw);
    text.into_owned()
}

/// Heuristic HTML check over the first bytes of a payload
fn looks_like_html(raw: &[u8]) -> bool {
    let head: Vec<u8> = raw.iter().take(256).map(u8::to_ascii_lowercase).collect();
    contains(&head, b"<!doctype html") || contains(&head, b"<html")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

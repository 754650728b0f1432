//! XML Entity Decoding and Escaping
//!
//! Decoding handles the five predefined entities and numeric character
//! references. Escaping is used by the serializer for text and attribute
//! values.
//!
//! Decoding returns `Cow::Borrowed` when the input holds no '&'.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references in character data or an attribute value
///
/// Strict mode rejects unknown entities, missing semicolons and character
/// references to characters XML does not allow. Lenient mode keeps such
/// text verbatim.
pub fn decode_text(input: &str, strict: bool) -> Result<Cow<'_, str>, &'static str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = memchr(b';', rest.as_bytes())
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None if strict => return Err("Undefined entity or malformed character reference"),
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Decode one entity name (without '&' and ';')
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let codepoint = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            if !is_valid_xml_char(codepoint) {
                return None;
            }
            char::from_u32(codepoint)
        }
    }
}

/// XML 1.0 Char production
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Reject characters XML 1.0 does not allow
pub fn validate_xml_content(content: &str) -> Result<(), &'static str> {
    match content.chars().find(|c| !is_valid_xml_char(*c as u32)) {
        Some(_) => Err("Invalid XML character in content"),
        None => Ok(()),
    }
}

/// Append text content to `buf`, escaping markup characters
#[inline]
pub fn escape_text(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            _ => buf.push(c),
        }
    }
}

/// Append a double-quoted attribute value to `buf`, escaping as needed
#[inline]
pub fn escape_attribute(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\t' => buf.push_str("&#9;"),
            '\n' => buf.push_str("&#10;"),
            '\r' => buf.push_str("&#13;"),
            _ => buf.push(c),
        }
    }
}

//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag (the text between the element
//! name and '>' or '/>').

use std::borrow::Cow;

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};

/// A parsed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name (may include a prefix)
    pub name: &'a str,
    /// Value with entities decoded
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn prefix(&self) -> Option<&'a str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    pub fn local_name(&self) -> &'a str {
        self.name.split_once(':').map(|(_, l)| l).unwrap_or(self.name)
    }

    /// Prefix bound by an `xmlns` / `xmlns:p` declaration ("" for the
    /// default namespace), or None for ordinary attributes
    pub fn declared_prefix(&self) -> Option<&'a str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// Parse an attribute list
///
/// Strict mode requires quoted values, rejects '<' in values and duplicate
/// names. Lenient mode skips what it cannot read and accepts valueless and
/// unquoted attributes.
pub fn parse_attributes(input: &str, strict: bool) -> Result<Vec<Attribute<'_>>, &'static str> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        // Name
        if !is_name_start_char(bytes[pos]) {
            if strict {
                return Err("Attribute name must start with letter, underscore, or colon");
            }
            pos += 1;
            continue;
        }
        let name_start = pos;
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        if strict && attrs.iter().any(|a| a.name == name) {
            return Err("Duplicate attribute");
        }

        // '='
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            if strict {
                return Err("Attribute value required");
            }
            attrs.push(Attribute { name, value: Cow::Borrowed("") });
            continue;
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            if strict {
                return Err("Attribute value required");
            }
            break;
        }

        // Value
        let quote = bytes[pos];
        let raw = if quote == b'"' || quote == b'\'' {
            pos += 1;
            let value_start = pos;
            while pos < bytes.len() && bytes[pos] != quote {
                pos += 1;
            }
            if pos >= bytes.len() && strict {
                return Err("Attribute value has mismatched quotes");
            }
            let raw = &input[value_start..pos];
            pos = (pos + 1).min(bytes.len());
            raw
        } else {
            if strict {
                return Err("Attribute value must be quoted");
            }
            let value_start = pos;
            while pos < bytes.len() && !is_whitespace(bytes[pos]) {
                pos += 1;
            }
            &input[value_start..pos]
        };

        if strict && raw.contains('<') {
            return Err("Attribute value cannot contain '<'");
        }
        let value = decode_text(raw, strict)?;
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}

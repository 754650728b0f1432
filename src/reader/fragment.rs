//! Fragment Reader
//!
//! Pull reader over literal XML held in a column. A fragment is element
//! content: any mix of elements, text, CDATA, comments and processing
//! instructions, with no single-root requirement. A leading XML declaration
//! is skipped. Element nesting is checked by the consumer, which sees the
//! start and end events.

use std::borrow::Cow;

use crate::core::attributes::parse_attributes;
use crate::core::entities::{decode_text, validate_xml_content};
use crate::core::scanner::Scanner;

use super::events::{StartElement, XmlEvent};

/// Error with the byte offset where reading stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Reader over one fragment
pub struct FragmentReader<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    failed: bool,
}

impl<'a> FragmentReader<'a> {
    /// Lenient reader: malformed markup degrades to text, never fails
    pub fn new(input: &'a str) -> Self {
        FragmentReader {
            scanner: Scanner::new(input),
            strict: false,
            failed: false,
        }
    }

    /// Strict reader: the first well-formedness error ends reading
    pub fn new_strict(input: &'a str) -> Self {
        FragmentReader {
            scanner: Scanner::new(input),
            strict: true,
            failed: false,
        }
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    fn error<T>(&self, message: &str) -> Result<T, ParseError> {
        Err(ParseError::new(message, self.scanner.position()))
    }

    /// Next event, Ok(None) at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        loop {
            if self.scanner.is_eof() {
                return Ok(None);
            }
            if self.scanner.peek() != Some(b'<') {
                return self.read_text().map(Some);
            }

            let event = if self.scanner.starts_with("<!--") {
                self.read_comment()?
            } else if self.scanner.starts_with("<![CDATA[") {
                self.read_cdata()?
            } else if self.scanner.starts_with("<!") {
                self.skip_declaration()?
            } else if self.scanner.starts_with("<?") {
                self.read_processing_instruction()?
            } else if self.scanner.starts_with("</") {
                self.read_end_tag()?
            } else {
                self.read_start_tag()?
            };

            // Skipped constructs produce no event
            if let Some(event) = event {
                return Ok(Some(event));
            }
        }
    }

    fn read_text(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self.scanner.find_byte(b'<').unwrap_or(start + self.scanner.remaining().len());
        let raw = self.scanner.slice(start, end);

        if self.strict {
            if raw.contains("]]>") {
                return self.error("']]>' not allowed in character data");
            }
            if let Err(msg) = validate_xml_content(raw) {
                return self.error(msg);
            }
        }
        let text = match decode_text(raw, self.strict) {
            Ok(text) => text,
            Err(msg) => return self.error(msg),
        };
        self.scanner.set_position(end);
        Ok(XmlEvent::Text(text))
    }

    /// Remaining input as text, used by lenient recovery
    fn rest_as_text(&mut self) -> Option<XmlEvent<'a>> {
        let rest = self.scanner.remaining();
        self.scanner.advance(rest.len());
        Some(XmlEvent::Text(Cow::Borrowed(rest)))
    }

    fn read_comment(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        self.scanner.advance(4);
        let start = self.scanner.position();
        match self.scanner.find_str("-->") {
            Some(end) => {
                let content = self.scanner.slice(start, end);
                if self.strict && content.contains("--") {
                    return self.error("'--' not allowed in comment");
                }
                self.scanner.set_position(end + 3);
                Ok(Some(XmlEvent::Comment(content)))
            }
            None if self.strict => self.error("Unterminated comment"),
            None => Ok(self.rest_as_text()),
        }
    }

    fn read_cdata(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        self.scanner.advance(9);
        let start = self.scanner.position();
        match self.scanner.find_str("]]>") {
            Some(end) => {
                let content = self.scanner.slice(start, end);
                self.scanner.set_position(end + 3);
                Ok(Some(XmlEvent::CData(content)))
            }
            None if self.strict => self.error("Unterminated CDATA section"),
            None => Ok(self.rest_as_text()),
        }
    }

    fn skip_declaration(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        if self.strict {
            return self.error("Markup declarations are not allowed in element content");
        }
        match self.scanner.find_tag_end_quoted() {
            Some(end) => {
                self.scanner.set_position(end + 1);
                Ok(None)
            }
            None => Ok(self.rest_as_text()),
        }
    }

    fn read_processing_instruction(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let tag_start = self.scanner.position();
        self.scanner.advance(2);
        let Some(target) = self.scanner.read_name() else {
            if self.strict {
                return self.error("Processing instruction target expected");
            }
            self.scanner.set_position(tag_start + 1);
            return Ok(Some(XmlEvent::Text(Cow::Borrowed("<"))));
        };
        let data_start = self.scanner.position();
        let Some(end) = self.scanner.find_str("?>") else {
            if self.strict {
                return self.error("Unterminated processing instruction");
            }
            self.scanner.set_position(tag_start);
            return Ok(self.rest_as_text());
        };
        let data = self.scanner.slice(data_start, end).trim();
        self.scanner.set_position(end + 2);

        if target.eq_ignore_ascii_case("xml") {
            if self.strict && tag_start != 0 {
                return Err(ParseError::new("XML declaration must come first", tag_start));
            }
            return Ok(None);
        }
        Ok(Some(XmlEvent::ProcessingInstruction { target, data }))
    }

    fn read_end_tag(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let tag_start = self.scanner.position();
        self.scanner.advance(2);
        let name = self.scanner.read_name();
        self.scanner.skip_whitespace();

        match (name, self.scanner.peek()) {
            (Some(name), Some(b'>')) => {
                self.scanner.advance(1);
                Ok(Some(XmlEvent::EndElement { name }))
            }
            _ if self.strict => self.error("Malformed end tag"),
            (Some(name), _) => {
                // Drop whatever follows the name up to '>'
                match self.scanner.find_byte(b'>') {
                    Some(end) => self.scanner.set_position(end + 1),
                    None => self.scanner.advance(self.scanner.remaining().len()),
                }
                Ok(Some(XmlEvent::EndElement { name }))
            }
            (None, _) => {
                self.scanner.set_position(tag_start + 1);
                Ok(Some(XmlEvent::Text(Cow::Borrowed("<"))))
            }
        }
    }

    fn read_start_tag(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let tag_start = self.scanner.position();
        self.scanner.advance(1);
        let Some(name) = self.scanner.read_name() else {
            if self.strict {
                return self.error("Invalid element name");
            }
            return Ok(Some(XmlEvent::Text(Cow::Borrowed("<"))));
        };

        let attrs_start = self.scanner.position();
        let Some(end) = self.scanner.find_tag_end_quoted() else {
            if self.strict {
                return self.error("Unterminated start tag");
            }
            self.scanner.set_position(tag_start);
            return Ok(self.rest_as_text());
        };

        let body = self.scanner.slice(attrs_start, end);
        let (body, empty) = match body.strip_suffix('/') {
            Some(b) => (b, true),
            None => (body, false),
        };
        if self.strict && !body.is_empty() && !body.starts_with(|c: char| c.is_ascii_whitespace()) {
            return self.error("Whitespace required after element name");
        }
        let attributes = match parse_attributes(body, self.strict) {
            Ok(attrs) => attrs,
            Err(msg) => return Err(ParseError::new(msg, attrs_start)),
        };
        self.scanner.set_position(end + 1);

        let element = StartElement::new(name, attributes);
        Ok(Some(if empty {
            XmlEvent::EmptyElement(element)
        } else {
            XmlEvent::StartElement(element)
        }))
    }
}

impl<'a> Iterator for FragmentReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_event().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}

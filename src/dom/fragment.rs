//! Fragment Parsing
//!
//! Turns literal XML from a column into detached nodes of the output
//! document. Prefixes resolve against the fragment's own declarations first
//! and the document-level declarations after that.

use thiserror::Error;

use super::document::Document;
use super::namespace::{NamespaceResolver, Resolution};
use super::node::{NodeId, NodeKind};
use crate::reader::{FragmentReader, ParseError, StartElement, XmlEvent};

/// How malformed literal XML is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentMode {
    /// Any well-formedness error fails the parse
    #[default]
    Strict,
    /// Best effort: unreadable markup becomes text, unclosed elements are
    /// closed at the end, stray end tags are dropped
    Lenient,
}

/// Literal XML that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {position}")]
pub struct FragmentError {
    pub message: String,
    pub position: usize,
}

impl From<ParseError> for FragmentError {
    fn from(e: ParseError) -> Self {
        FragmentError {
            message: e.message,
            position: e.position,
        }
    }
}

impl Document {
    /// Parse `text` into detached top-level nodes, in document order
    ///
    /// On error no node created by this call remains in the document.
    pub fn parse_fragment(&mut self, text: &str, mode: FragmentMode) -> Result<Vec<NodeId>, FragmentError> {
        let mark = self.node_count();
        let result = self.build_fragment(text, mode);
        if result.is_err() {
            self.truncate(mark);
        }
        result
    }

    fn build_fragment(&mut self, text: &str, mode: FragmentMode) -> Result<Vec<NodeId>, FragmentError> {
        let strict = mode == FragmentMode::Strict;
        let mut reader = if strict {
            FragmentReader::new_strict(text)
        } else {
            FragmentReader::new(text)
        };

        let mut resolver = NamespaceResolver::new(&mut self.strings);
        for &(prefix_id, uri_id) in &self.namespaces {
            resolver.declare(prefix_id, uri_id);
        }

        let mut top: Vec<NodeId> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();

        while let Some(event) = reader.next_event()? {
            let position = reader.position();
            match event {
                XmlEvent::StartElement(elem) => {
                    let id = self.open_element(&elem, &mut resolver, strict, position)?;
                    self.attach(&mut top, &stack, id);
                    stack.push(id);
                }
                XmlEvent::EmptyElement(elem) => {
                    let id = self.open_element(&elem, &mut resolver, strict, position)?;
                    self.attach(&mut top, &stack, id);
                    resolver.pop_scope();
                }
                XmlEvent::EndElement { name } => {
                    let open = stack.iter().rposition(|&id| self.node_name(id) == Some(name));
                    match open {
                        Some(i) if i + 1 == stack.len() => {
                            stack.pop();
                            resolver.pop_scope();
                        }
                        _ if strict => {
                            let message = match stack.last().and_then(|&id| self.node_name(id)) {
                                Some(current) => format!("Tag mismatch: <{}> closed with </{}>", current, name),
                                None => format!("Unexpected end tag </{}>", name),
                            };
                            return Err(FragmentError { message, position });
                        }
                        // Close everything opened since the matching start tag
                        Some(i) => {
                            while stack.len() > i {
                                stack.pop();
                                resolver.pop_scope();
                            }
                        }
                        None => {}
                    }
                }
                XmlEvent::Text(content) => {
                    if content.is_empty() {
                        continue;
                    }
                    let parent_last = match stack.last() {
                        Some(&parent) => self.last_child(parent),
                        None => top.last().copied(),
                    };
                    // Lenient recovery can split text; keep it in one node
                    match parent_last.filter(|&id| self.kind(id) == Some(NodeKind::Text)) {
                        Some(id) => self.append_text(id, &content),
                        None => {
                            let id = self.create_text(&content);
                            self.attach(&mut top, &stack, id);
                        }
                    }
                }
                XmlEvent::CData(content) => {
                    let id = self.create_cdata(content);
                    self.attach(&mut top, &stack, id);
                }
                XmlEvent::Comment(content) => {
                    let id = self.create_comment(content);
                    self.attach(&mut top, &stack, id);
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let id = self.create_processing_instruction(target, data);
                    self.attach(&mut top, &stack, id);
                }
            }
        }

        if strict {
            if let Some(name) = stack.last().and_then(|&id| self.node_name(id)) {
                return Err(FragmentError {
                    message: format!("Unclosed element <{}>", name),
                    position: text.len(),
                });
            }
        }
        Ok(top)
    }

    fn attach(&mut self, top: &mut Vec<NodeId>, stack: &[NodeId], id: NodeId) {
        match stack.last() {
            Some(&parent) => self.append_child(parent, id),
            None => top.push(id),
        }
    }

    /// Create an element for a start tag and enter its namespace scope
    fn open_element(
        &mut self,
        elem: &StartElement<'_>,
        resolver: &mut NamespaceResolver,
        strict: bool,
        position: usize,
    ) -> Result<NodeId, FragmentError> {
        resolver.push_scope();
        for attr in &elem.attributes {
            if let Some(prefix) = attr.declared_prefix() {
                let prefix_id = self.strings.intern(prefix);
                let uri_id = self.strings.intern(&attr.value);
                resolver.declare(prefix_id, uri_id);
            }
        }

        let unknown_prefix = |qname: &str| FragmentError {
            message: format!("Undeclared namespace prefix in {}", qname),
            position,
        };

        let namespace_id = match resolver.resolve_name(&mut self.strings, elem.name, false) {
            Resolution::Bound(uri) => uri,
            Resolution::UnknownPrefix if strict => return Err(unknown_prefix(elem.name)),
            Resolution::UnknownPrefix => 0,
        };
        if strict {
            for attr in elem.attributes.iter().filter(|a| a.declared_prefix().is_none()) {
                if resolver.resolve_name(&mut self.strings, attr.name, true) == Resolution::UnknownPrefix {
                    return Err(unknown_prefix(attr.name));
                }
            }
        }

        let uri = match namespace_id {
            0 => None,
            id => Some(self.strings.get(id).to_string()),
        };
        let id = self.create_element(uri.as_deref(), elem.name);
        for attr in &elem.attributes {
            self.set_attribute(id, attr.name, &attr.value);
        }
        Ok(id)
    }
}

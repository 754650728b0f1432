//! XML Serialization
//!
//! Iterative writer with an explicit stack, so deeply nested output cannot
//! overflow the call stack.

use super::document::{Document, DOCUMENT_NODE};
use super::node::{NodeId, NodeKind};
use crate::core::entities::{escape_attribute, escape_text};

impl Document {
    /// Serialize the whole document (no XML declaration)
    pub fn to_xml(&self) -> String {
        self.node_to_xml(DOCUMENT_NODE)
    }

    /// Serialize one node and its descendants
    ///
    /// Document-level namespace declarations go on the outermost elements
    /// written, so a subtree can be read on its own.
    pub fn node_to_xml(&self, node_id: NodeId) -> String {
        let mut buf = String::with_capacity(1024);

        enum StackEntry {
            Enter(NodeId),
            Close(NodeId),
        }

        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry::Enter(node_id));

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Close(id) => {
                    buf.push_str("</");
                    buf.push_str(self.node_name(id).unwrap_or(""));
                    buf.push('>');
                }
                StackEntry::Enter(current) => {
                    let Some(node) = self.node(current) else {
                        continue;
                    };

                    match node.kind {
                        NodeKind::Document => {
                            let mut child = node.last_child;
                            while let Some(c) = child {
                                stack.push(StackEntry::Enter(c));
                                child = self.node(c).and_then(|n| n.prev_sibling);
                            }
                        }
                        NodeKind::Element => {
                            buf.push('<');
                            buf.push_str(self.strings.get(node.name_id));

                            if current == node_id || node.parent == Some(DOCUMENT_NODE) {
                                self.write_namespace_declarations(current, &mut buf);
                            }
                            for (name, value) in self.attributes(current) {
                                buf.push(' ');
                                buf.push_str(name);
                                buf.push_str("=\"");
                                escape_attribute(value, &mut buf);
                                buf.push('"');
                            }

                            if node.first_child.is_none() {
                                buf.push_str("/>");
                            } else {
                                buf.push('>');
                                stack.push(StackEntry::Close(current));
                                let mut child = node.last_child;
                                while let Some(c) = child {
                                    stack.push(StackEntry::Enter(c));
                                    child = self.node(c).and_then(|n| n.prev_sibling);
                                }
                            }
                        }
                        NodeKind::Text => escape_text(self.value(node.value_id), &mut buf),
                        NodeKind::CData => {
                            buf.push_str("<![CDATA[");
                            buf.push_str(self.value(node.value_id));
                            buf.push_str("]]>");
                        }
                        NodeKind::Comment => {
                            buf.push_str("<!--");
                            buf.push_str(self.value(node.value_id));
                            buf.push_str("-->");
                        }
                        NodeKind::ProcessingInstruction => {
                            buf.push_str("<?");
                            buf.push_str(self.strings.get(node.name_id));
                            let data = self.value(node.value_id);
                            if !data.is_empty() {
                                buf.push(' ');
                                buf.push_str(data);
                            }
                            buf.push_str("?>");
                        }
                    }
                }
            }
        }

        buf
    }

    /// Document-level declarations an element does not already carry
    fn write_namespace_declarations(&self, element: NodeId, buf: &mut String) {
        for (prefix, uri) in self.namespace_declarations() {
            let name = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            if self.attribute(element, &name).is_some() {
                continue;
            }
            buf.push(' ');
            buf.push_str(&name);
            buf.push_str("=\"");
            escape_attribute(uri, buf);
            buf.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FragmentMode;

    #[test]
    fn test_serialize_tree() {
        let mut doc = Document::new();
        let order = doc.create_element(None, "Order");
        doc.append_child(DOCUMENT_NODE, order);
        doc.set_attribute(order, "id", "7 \"rush\"");
        let note = doc.create_element(None, "Note");
        doc.append_child(order, note);
        let text = doc.create_text("a < b & c");
        doc.append_child(note, text);
        let empty = doc.create_element(None, "Done");
        doc.append_child(order, empty);

        assert_eq!(
            doc.to_xml(),
            "<Order id=\"7 &quot;rush&quot;\"><Note>a &lt; b &amp; c</Note><Done/></Order>"
        );
        assert_eq!(doc.node_to_xml(note), "<Note>a &lt; b &amp; c</Note>");
    }

    #[test]
    fn test_namespace_declarations_on_top_level() {
        let mut doc = Document::new();
        doc.declare_namespace("po", "urn:po");
        let order = doc.create_element(Some("urn:po"), "po:Order");
        doc.append_child(DOCUMENT_NODE, order);
        let line = doc.create_element(Some("urn:po"), "po:Line");
        doc.append_child(order, line);

        assert_eq!(doc.to_xml(), "<po:Order xmlns:po=\"urn:po\"><po:Line/></po:Order>");
    }

    #[test]
    fn test_subtree_carries_namespace_declarations() {
        let mut doc = Document::new();
        doc.declare_namespace("po", "urn:po");
        let order = doc.create_element(Some("urn:po"), "po:Order");
        doc.append_child(DOCUMENT_NODE, order);
        let line = doc.create_element(Some("urn:po"), "po:Line");
        doc.append_child(order, line);
        let part = doc.create_element(Some("urn:po"), "po:Part");
        doc.append_child(line, part);

        assert_eq!(
            doc.node_to_xml(line),
            "<po:Line xmlns:po=\"urn:po\"><po:Part/></po:Line>"
        );
        let text = doc.create_text("loose");
        doc.append_child(part, text);
        assert_eq!(doc.node_to_xml(text), "loose");
    }

    #[test]
    fn test_fragment_round_trip() {
        let mut doc = Document::new();
        let root = doc.create_element(None, "Doc");
        doc.append_child(DOCUMENT_NODE, root);
        let input = "Text <em>here</em><![CDATA[<raw>]]><?app data?>";
        for id in doc.parse_fragment(input, FragmentMode::Strict).unwrap() {
            doc.append_child(root, id);
        }
        assert_eq!(doc.to_xml(), format!("<Doc>{}</Doc>", input));
    }
}

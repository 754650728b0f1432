//! Output Document - Mutable Arena DOM
//!
//! The tree a retrieval builds:
//! - Arena allocation for nodes, NodeId indices for traversal
//! - String interning for names and character data; values that grow one
//!   token at a time live in owned buffers instead, so appending never
//!   re-interns the whole value
//! - Nodes are created detached and linked with `append_child` or
//!   `insert_before`, so siblings can be placed in any order
//! - Document-level namespace declarations, written on top-level elements

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;

/// Id of the document node
pub const DOCUMENT_NODE: NodeId = 0;

/// Marks a value id as an index into the growable buffers
const GROWABLE: u32 = 1 << 31;

/// A mutable XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<XmlNode>,
    pub(crate) strings: StringPool,
    /// Values being appended to, addressed by `GROWABLE | index`
    growable: Vec<String>,
    /// (prefix id, URI id) declared for the whole document
    pub(crate) namespaces: Vec<(u32, u32)>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document holding only the document node
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(256);
        nodes.push(XmlNode::document());
        Document {
            nodes,
            strings: StringPool::new(),
            growable: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    /// Number of nodes in the arena, detached ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// First element child of the document node
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(DOCUMENT_NODE).next()
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Declare a prefix for the whole document ("" for the default namespace)
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        let prefix_id = self.strings.intern(prefix);
        let uri_id = self.strings.intern(uri);
        match self.namespaces.iter_mut().find(|(p, _)| *p == prefix_id) {
            Some(binding) => binding.1 = uri_id,
            None => self.namespaces.push((prefix_id, uri_id)),
        }
    }

    /// Bytes of interned string data
    pub fn interned_bytes(&self) -> usize {
        self.strings.bytes_used()
    }

    /// Character data or attribute value for a value id
    #[inline]
    pub(crate) fn value(&self, id: u32) -> &str {
        if id & GROWABLE != 0 {
            self.growable.get((id & !GROWABLE) as usize).map(String::as_str).unwrap_or("")
        } else {
            self.strings.get(id)
        }
    }

    /// Make `id` growable and append `sep` and `more` to it
    ///
    /// The first append copies the interned value once; later appends only
    /// extend the owned buffer.
    fn grow(&mut self, id: u32, sep: &str, more: &str) -> u32 {
        let (id, buffer) = if id & GROWABLE != 0 {
            (id, (id & !GROWABLE) as usize)
        } else {
            let buffer = self.growable.len();
            self.growable.push(self.strings.get(id).to_string());
            (GROWABLE | buffer as u32, buffer)
        };
        if let Some(value) = self.growable.get_mut(buffer) {
            value.push_str(sep);
            value.push_str(more);
        }
        id
    }

    /// Document-level declarations as (prefix, URI)
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces
            .iter()
            .map(|&(p, u)| (self.strings.get(p), self.strings.get(u)))
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    fn push(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, namespace_uri: Option<&str>, qname: &str) -> NodeId {
        let name_id = self.strings.intern(qname);
        let namespace_id = namespace_uri.map(|u| self.strings.intern(u)).unwrap_or(0);
        self.push(XmlNode::element(name_id, namespace_id))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create_character_data(NodeKind::Text, text)
    }

    pub fn create_cdata(&mut self, text: &str) -> NodeId {
        self.create_character_data(NodeKind::CData, text)
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.create_character_data(NodeKind::Comment, text)
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        let target_id = self.strings.intern(target);
        let data_id = self.strings.intern(data);
        self.push(XmlNode::processing_instruction(target_id, data_id))
    }

    fn create_character_data(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push(XmlNode::character_data(kind, value_id))
    }

    /// Drop every node created after the first `len` nodes
    ///
    /// Only valid when none of those nodes is linked to an older node.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len.max(1));
    }

    // =========================================================================
    // Attributes and character data
    // =========================================================================

    /// Set an attribute, replacing an existing value
    pub fn set_attribute(&mut self, element: NodeId, qname: &str, value: &str) {
        let name_id = self.strings.intern(qname);
        let value_id = self.strings.intern(value);
        let Some(node) = self.nodes.get_mut(element as usize) else {
            return;
        };
        match node.attributes.iter_mut().find(|a| a.name_id == name_id) {
            Some(attr) => attr.value_id = value_id,
            None => node.attributes.push(XmlAttribute { name_id, value_id }),
        }
    }

    pub fn attribute(&self, element: NodeId, qname: &str) -> Option<&str> {
        self.node(element)?
            .attributes
            .iter()
            .find(|a| self.strings.get(a.name_id) == qname)
            .map(|a| self.value(a.value_id))
    }

    pub fn attributes(&self, element: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(element)
            .map(|n| n.attributes.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|a| (self.strings.get(a.name_id), self.value(a.value_id)))
    }

    /// Append a token to an attribute, separated by a space, creating the
    /// attribute when it is missing
    pub fn append_attribute_token(&mut self, element: NodeId, qname: &str, token: &str) {
        let name_id = self.strings.intern(qname);
        let Some(existing) = self
            .node(element)
            .and_then(|n| n.attributes.iter().position(|a| a.name_id == name_id))
        else {
            self.set_attribute(element, qname, token);
            return;
        };
        let value_id = self.nodes[element as usize].attributes[existing].value_id;
        let value_id = self.grow(value_id, " ", token);
        self.nodes[element as usize].attributes[existing].value_id = value_id;
    }

    /// Content of a text, CDATA, comment or PI node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                Some(self.value(node.value_id))
            }
            NodeKind::Document | NodeKind::Element => None,
        }
    }

    /// Append to the content of a character-data node
    pub fn append_text(&mut self, id: NodeId, more: &str) {
        if self.text(id).is_none() {
            return;
        }
        let value_id = self.grow(self.nodes[id as usize].value_id, "", more);
        self.nodes[id as usize].value_id = value_id;
    }

    /// Concatenated text of all text and CDATA descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if node.is_text() {
                out.push_str(self.value(node.value_id));
                continue;
            }
            let mut child = node.last_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.node(c).and_then(|n| n.prev_sibling);
            }
        }
        out
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Qualified name of an element, or target of a PI
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id)
            .map(|name| name.split_once(':').map(|(_, local)| local).unwrap_or(name))
    }

    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        match self.node(id)?.namespace_id {
            0 => None,
            uri => Some(self.strings.get(uri)),
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next_sibling
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |&c| self.node(c).map(|n| n.is_element()).unwrap_or(false))
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is None or not a child of `parent`
    ///
    /// A child that is already linked somewhere is moved.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let len = self.nodes.len() as NodeId;
        if parent >= len || child >= len || child == parent || child == DOCUMENT_NODE {
            return;
        }
        self.detach(child);

        let reference = reference.filter(|&r| r < len && self.nodes[r as usize].parent == Some(parent));
        match reference {
            Some(next) => {
                let prev = self.nodes[next as usize].prev_sibling;
                {
                    let node = &mut self.nodes[child as usize];
                    node.parent = Some(parent);
                    node.prev_sibling = prev;
                    node.next_sibling = Some(next);
                }
                self.nodes[next as usize].prev_sibling = Some(child);
                match prev {
                    Some(p) => self.nodes[p as usize].next_sibling = Some(child),
                    None => self.nodes[parent as usize].first_child = Some(child),
                }
            }
            None => {
                let last = self.nodes[parent as usize].last_child;
                {
                    let node = &mut self.nodes[child as usize];
                    node.parent = Some(parent);
                    node.prev_sibling = last;
                    node.next_sibling = None;
                }
                match last {
                    Some(l) => self.nodes[l as usize].next_sibling = Some(child),
                    None => self.nodes[parent as usize].first_child = Some(child),
                }
                self.nodes[parent as usize].last_child = Some(child);
            }
        }
    }

    /// Unlink a node from its parent and siblings
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id as usize) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(p) => self.nodes[p as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(n) => self.nodes[n as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }
        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }
}

/// Iterator over the children of a node
pub struct Children<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for Children<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .map(|c| {
                doc.node_name(c)
                    .map(str::to_string)
                    .or_else(|| doc.text(c).map(str::to_string))
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_append_and_insert_before() {
        let mut doc = Document::new();
        let root = doc.create_element(None, "Order");
        doc.append_child(DOCUMENT_NODE, root);

        let a = doc.create_element(None, "A");
        let c = doc.create_element(None, "C");
        let b = doc.create_element(None, "B");
        doc.append_child(root, a);
        doc.append_child(root, c);
        doc.insert_before(root, b, Some(c));
        let z = doc.create_element(None, "Z");
        doc.insert_before(root, z, Some(a));

        assert_eq!(names(&doc, root), vec!["Z", "A", "B", "C"]);
        assert_eq!(doc.document_element(), Some(root));
        assert_eq!(doc.parent(b), Some(root));
        assert_eq!(doc.last_child(root), Some(c));
    }

    #[test]
    fn test_move_existing_child() {
        let mut doc = Document::new();
        let root = doc.create_element(None, "R");
        doc.append_child(DOCUMENT_NODE, root);
        let a = doc.create_element(None, "A");
        let b = doc.create_element(None, "B");
        doc.append_child(root, a);
        doc.append_child(root, b);

        doc.insert_before(root, b, Some(a));
        assert_eq!(names(&doc, root), vec!["B", "A"]);

        doc.detach(a);
        assert_eq!(names(&doc, root), vec!["B"]);
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn test_reference_of_other_parent_appends() {
        let mut doc = Document::new();
        let r1 = doc.create_element(None, "R1");
        let r2 = doc.create_element(None, "R2");
        let x = doc.create_element(None, "X");
        let y = doc.create_element(None, "Y");
        doc.append_child(r1, x);
        doc.append_child(r2, y);
        let n = doc.create_element(None, "N");
        doc.insert_before(r2, n, Some(x));
        assert_eq!(names(&doc, r2), vec!["Y", "N"]);
    }

    #[test]
    fn test_attributes_and_text() {
        let mut doc = Document::new();
        let e = doc.create_element(Some("urn:po"), "po:Item");
        doc.set_attribute(e, "id", "1");
        doc.set_attribute(e, "id", "2");
        doc.set_attribute(e, "class", "a");
        assert_eq!(doc.attribute(e, "id"), Some("2"));
        assert_eq!(doc.attributes(e).count(), 2);
        assert_eq!(doc.local_name(e), Some("Item"));
        assert_eq!(doc.namespace_uri(e), Some("urn:po"));

        let t = doc.create_text("red");
        doc.append_child(e, t);
        doc.append_text(t, " green");
        assert_eq!(doc.text(t), Some("red green"));
        assert_eq!(doc.text_content(e), "red green");
    }

    #[test]
    fn test_appending_does_not_reintern() {
        let mut doc = Document::new();
        let e = doc.create_element(None, "Tags");
        let t = doc.create_text("t0");
        doc.append_child(e, t);
        for i in 1..2000 {
            doc.append_text(t, " ");
            doc.append_text(t, &format!("t{}", i));
            doc.append_attribute_token(e, "tags", &format!("t{}", i));
        }

        let text = doc.text(t).unwrap().to_string();
        assert!(text.starts_with("t0 t1 t2 "));
        assert!(text.ends_with(" t1999"));
        assert_eq!(doc.attribute(e, "tags").map(|v| v.split(' ').count()), Some(1999));
        assert!(doc.attribute(e, "tags").unwrap().starts_with("t1 t2 "));
        // Only the first value of each node was interned
        assert!(doc.interned_bytes() < 64);
    }
}

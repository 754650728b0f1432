//! Output Tree Nodes
//!
//! Nodes are addressed by NodeId (u32) indices into the document arena and
//! linked through parent, child and sibling indices, so nodes can be
//! inserted anywhere in the tree without moving existing ones.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root, always NodeId 0
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// Attribute of an element, both parts interned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified attribute name
    pub name_id: u32,
    pub value_id: u32,
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements) or target (processing instructions)
    pub name_id: u32,
    /// Namespace URI, or 0 for none
    pub namespace_id: u32,
    /// Character data (text, CDATA, comments, PI data)
    pub value_id: u32,
    pub attributes: Vec<XmlAttribute>,
}

impl XmlNode {
    fn detached(kind: NodeKind) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            namespace_id: 0,
            value_id: 0,
            attributes: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::detached(NodeKind::Document)
    }

    pub fn element(name_id: u32, namespace_id: u32) -> Self {
        XmlNode {
            name_id,
            namespace_id,
            ..Self::detached(NodeKind::Element)
        }
    }

    /// Character-data node (text, CDATA or comment)
    pub fn character_data(kind: NodeKind, value_id: u32) -> Self {
        XmlNode {
            value_id,
            ..Self::detached(kind)
        }
    }

    pub fn processing_instruction(target_id: u32, data_id: u32) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::detached(NodeKind::ProcessingInstruction)
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(3, 0);
        assert!(elem.is_element());
        assert!(elem.parent.is_none());
        assert!(!elem.has_children());
        assert_eq!(elem.name_id, 3);
    }

    #[test]
    fn test_character_data() {
        assert!(XmlNode::character_data(NodeKind::CData, 1).is_text());
        assert!(!XmlNode::character_data(NodeKind::Comment, 1).is_text());
    }
}

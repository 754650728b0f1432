//! Ordered Node Shadow Tree
//!
//! A tree parallel to the output document that decides where each new child
//! goes. Every shadow node wraps exactly one real node and keeps:
//! - its order value (descending orders are stored negated)
//! - a backward-linked list of its ordered children, sorted ascending
//! - the first of its unordered children, which all trail the ordered ones
//! - a name map for unique children (inlined elements, token-list nodes)
//!
//! Shadow nodes live in an arena indexed by `OrderedNodeId`. Because the
//! retrieval walk is depth-first, all nodes created after a node are its
//! descendants until it is cleared, so clearing a node's children can
//! truncate the arena and keep memory bounded by the current path.

use std::collections::HashMap;

use crate::dom::{Document, NodeId};

/// Order value of a child with no explicit position
pub const UNORDERED: i64 = i64::MIN;

/// Index of a shadow node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderedNodeId(u32);

impl OrderedNodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One shadow node
#[derive(Debug, Clone)]
pub struct OrderedNode {
    real: NodeId,
    order: i64,
    prev_ordered: Option<OrderedNodeId>,
    last_ordered_child: Option<OrderedNodeId>,
    first_unordered_child: Option<OrderedNodeId>,
    unique_children: HashMap<String, OrderedNodeId>,
}

impl OrderedNode {
    fn new(real: NodeId, order: i64) -> Self {
        OrderedNode {
            real,
            order,
            prev_ordered: None,
            last_ordered_child: None,
            first_unordered_child: None,
            unique_children: HashMap::new(),
        }
    }

    /// Real node this shadow node stands for
    #[inline]
    pub fn real_node(&self) -> NodeId {
        self.real
    }

    /// Stored order value, negated for descending orders
    #[inline]
    pub fn order(&self) -> i64 {
        self.order
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.order != UNORDERED
    }
}

/// Arena of shadow nodes rooted at one real node
#[derive(Debug, Clone)]
pub struct ShadowTree {
    nodes: Vec<OrderedNode>,
}

impl ShadowTree {
    /// Shadow tree whose root wraps `root_real`
    pub fn new(root_real: NodeId) -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(OrderedNode::new(root_real, UNORDERED));
        ShadowTree { nodes }
    }

    pub fn root(&self) -> OrderedNodeId {
        OrderedNodeId(0)
    }

    pub fn node(&self, id: OrderedNodeId) -> &OrderedNode {
        &self.nodes[id.index()]
    }

    pub fn real_node(&self, id: OrderedNodeId) -> NodeId {
        self.node(id).real
    }

    /// Live shadow nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert `real_child` under `parent`, in the real tree and the shadow tree
    ///
    /// Ordered children are kept ascending by stored value; a child whose
    /// value equals an existing one goes after it. Unordered children
    /// (`UNORDERED`) are appended after everything.
    pub fn insert_child(
        &mut self,
        doc: &mut Document,
        parent: OrderedNodeId,
        unique_name: Option<&str>,
        real_child: NodeId,
        order: i64,
        ascending: bool,
    ) -> OrderedNodeId {
        let id = OrderedNodeId(self.nodes.len() as u32);
        let parent_real = self.nodes[parent.index()].real;

        if order == UNORDERED {
            doc.append_child(parent_real, real_child);
            self.nodes.push(OrderedNode::new(real_child, UNORDERED));
            let parent_node = &mut self.nodes[parent.index()];
            if parent_node.first_unordered_child.is_none() {
                parent_node.first_unordered_child = Some(id);
            }
        } else {
            // UNORDERED is never negated here, so this cannot overflow
            let order = if ascending { order } else { order.wrapping_neg() };

            // Walk back from the highest ordered child to the insertion point
            let mut next: Option<OrderedNodeId> = None;
            let mut current = self.nodes[parent.index()].last_ordered_child;
            while let Some(c) = current {
                let child = &self.nodes[c.index()];
                if child.order <= order {
                    break;
                }
                next = Some(c);
                current = child.prev_ordered;
            }

            let reference = match next {
                Some(n) => Some(self.nodes[n.index()].real),
                None => self.nodes[parent.index()]
                    .first_unordered_child
                    .map(|u| self.nodes[u.index()].real),
            };
            doc.insert_before(parent_real, real_child, reference);

            let mut node = OrderedNode::new(real_child, order);
            node.prev_ordered = current;
            self.nodes.push(node);
            match next {
                Some(n) => self.nodes[n.index()].prev_ordered = Some(id),
                None => self.nodes[parent.index()].last_ordered_child = Some(id),
            }
        }

        if let Some(name) = unique_name {
            self.nodes[parent.index()]
                .unique_children
                .insert(name.to_string(), id);
        }
        id
    }

    /// Unique child registered under `name`
    pub fn unique_child(&self, parent: OrderedNodeId, name: &str) -> Option<OrderedNodeId> {
        self.nodes
            .get(parent.index())
            .and_then(|p| p.unique_children.get(name))
            .copied()
    }

    /// Forget all children of `node`; the real tree is untouched
    ///
    /// Every shadow node created after `node` must be one of its
    /// descendants. Ids of those nodes are invalid afterwards.
    pub fn clear_children(&mut self, node: OrderedNodeId) {
        let Some(n) = self.nodes.get_mut(node.index()) else {
            return;
        };
        n.last_ordered_child = None;
        n.first_unordered_child = None;
        n.unique_children.clear();
        self.nodes.truncate(node.index() + 1);
    }
}

//! Namespace Resolution
//!
//! Scoped prefix bindings used while building parsed XML fragments. The
//! outermost scope holds the document's declarations so that a fragment can
//! use prefixes it does not declare itself.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI), prefix id 0 is the default namespace
#[derive(Debug, Clone, Copy)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u16,
}

/// Outcome of resolving an element or attribute name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Namespace URI id, 0 when the name is in no namespace
    Bound(u32),
    /// The name uses a prefix nobody declared
    UnknownPrefix,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Resolver with `xml` and `xmlns` pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let bindings = vec![
            NsBinding {
                prefix_id: xml_prefix_id,
                uri_id: strings.intern(ns::XML),
                depth: 0,
            },
            NsBinding {
                prefix_id: xmlns_prefix_id,
                uri_id: strings.intern(ns::XMLNS),
                depth: 0,
            },
        ];

        NamespaceResolver {
            bindings,
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave a scope, dropping the bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bind a prefix in the current scope; `xml` and `xmlns` cannot be rebound
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the namespace of a qualified name
    ///
    /// Unprefixed element names take the default namespace; unprefixed
    /// attribute names are never in a namespace.
    pub fn resolve_name(&self, strings: &mut StringPool, qname: &str, is_attribute: bool) -> Resolution {
        match qname.split_once(':') {
            Some((prefix, _)) => {
                let prefix_id = strings.intern(prefix);
                match self.resolve(prefix_id) {
                    Some(uri) => Resolution::Bound(uri),
                    None => Resolution::UnknownPrefix,
                }
            }
            None if is_attribute => Resolution::Bound(0),
            None => Resolution::Bound(self.resolve(0).unwrap_or(0)),
        }
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }
}

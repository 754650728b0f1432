//! String Interning Pool
//!
//! Element names, attribute names, namespace URIs and character data are
//! stored once in a shared buffer and referenced by u32 id. Retrieved
//! documents repeat the same names and many of the same values, so lookups
//! are deduplicated through a content hash.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// (offset, length) of an interned string inside the pool buffer
#[derive(Debug, Clone, Copy)]
struct Span {
    offset: u32,
    len: u32,
}

/// String interning pool
///
/// Id 0 is reserved for the empty string.
#[derive(Debug, Default, Clone)]
pub struct StringPool {
    spans: Vec<Span>,
    data: String,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl StringPool {
    pub fn new() -> Self {
        let mut pool = StringPool {
            spans: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        pool.spans.push(Span { offset: 0, len: 0 });
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an equal string if one exists
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.spans.len() as u32;
        self.spans.push(Span {
            offset,
            len: s.len() as u32,
        });
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// String for an id; unknown ids read as empty
    pub fn get(&self, id: u32) -> &str {
        match self.spans.get(id as usize) {
            Some(span) => {
                let start = span.offset as usize;
                self.data.get(start..start + span.len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// Number of distinct strings, including the reserved empty string
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.len() <= 1
    }

    /// Bytes of string data held
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}

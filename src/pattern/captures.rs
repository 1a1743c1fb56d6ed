//! The Capture Map: names bound by one successful match attempt.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::ast::{symbols, Node, NodeList, Symbol};

/// One bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Single(Node),
    Many(NodeList),
}

impl Capture {
    pub fn as_single(&self) -> Option<&Node> {
        match self {
            Capture::Single(node) => Some(node),
            Capture::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&NodeList> {
        match self {
            Capture::Many(nodes) => Some(nodes),
            Capture::Single(_) => None,
        }
    }
}

/// Symbol to node / node-list store for one match attempt.
///
/// Created fresh per attempt, or cleared and reused across sibling
/// alternatives. The wildcard `_` is accepted by [`Captures::bind`] but never
/// stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captures {
    map: HashMap<Symbol, Capture>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, or checks consistency when `name` is already bound.
    ///
    /// Returns `false` when an earlier binding of the same name is not
    /// structurally equal to `value`.
    ///
    /// ```rust
    /// use nodematch::ast::Node;
    /// use nodematch::pattern::{Capture, Captures};
    /// let mut caps = Captures::new();
    /// assert!(caps.bind(&"x".into(), Capture::Single(Node::id("a"))));
    /// assert!(caps.bind(&"x".into(), Capture::Single(Node::id("a"))));
    /// assert!(!caps.bind(&"x".into(), Capture::Single(Node::id("b"))));
    /// assert!(caps.bind(&"_".into(), Capture::Single(Node::id("b"))));
    /// assert_eq!(caps.len(), 1);
    /// ```
    pub fn bind(&mut self, name: &Symbol, value: Capture) -> bool {
        if &**name == symbols::WILDCARD {
            return true;
        }
        match self.map.get(name) {
            Some(existing) => *existing == value,
            None => {
                self.map.insert(name.clone(), value);
                true
            }
        }
    }

    /// Unconditionally stores a binding, returning the previous one.
    pub fn insert(&mut self, name: impl Into<Symbol>, value: Capture) -> Option<Capture> {
        self.map.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Capture> {
        self.map.get(name)
    }

    pub fn single(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(Capture::as_single)
    }

    pub fn many(&self, name: &str) -> Option<&NodeList> {
        self.get(name).and_then(Capture::as_many)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every binding, keeping the allocation.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Capture)> {
        self.map.iter()
    }

    /// Bindings ordered by name.
    pub fn sorted(&self) -> BTreeMap<&str, &Capture> {
        self.map.iter().map(|(k, v)| (&**k, v)).collect()
    }
}

// Captures serialize in the printed surface syntax so JSON output stays readable.

impl Serialize for Capture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capture::Single(node) => serializer.serialize_str(&node.to_string()),
            Capture::Many(nodes) => {
                let mut seq = serializer.serialize_seq(Some(nodes.len()))?;
                for node in nodes {
                    seq.serialize_element(&node.to_string())?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Captures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sorted().serialize(serializer)
    }
}

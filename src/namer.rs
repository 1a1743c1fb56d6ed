//! Hygienic name generation.
//!
//! A [`Namer`] is a session handle over a monotonically increasing counter.
//! Clones share the counter, so every front-end of one macro-processing session
//! draws from the same sequence, and worker threads holding clones still never
//! hand out the same number twice. Names are unique, not reproducible: tests
//! that assert on generated names pin the start with [`Namer::starting_at`].
//!
//! User-authored macro bodies go through [`Namer::hygienize`] once per expansion:
//!
//! - every identifier containing `unique#` has that substring replaced by one
//!   number drawn for the whole expansion,
//! - every distinct identifier beginning with `temp#` gets its own number in
//!   place of the `#`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ast::{symbols, Node, NodeKind, NodeList, Symbol};

#[derive(Debug, Clone)]
pub struct Namer {
    counter: Arc<AtomicU64>,
}

impl Default for Namer {
    fn default() -> Self {
        Namer::new()
    }
}

impl Namer {
    pub fn new() -> Self {
        Namer::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Namer {
            counter: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Draws the next number.
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// The number the next call to [`Namer::next_id`] will return.
    pub fn peek(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// `prefix` followed by a fresh number.
    ///
    /// ```rust
    /// use nodematch::namer::Namer;
    /// let namer = Namer::starting_at(7);
    /// let shared = namer.clone();
    /// assert_eq!(&*namer.next_name("tmp_"), "tmp_7");
    /// assert_eq!(&*shared.next_name("tmp_"), "tmp_8");
    /// ```
    pub fn next_name(&self, prefix: &str) -> Symbol {
        format!("{}{}", prefix, self.next_id()).into()
    }

    /// Applies the `unique#` / `temp#` renaming to a macro body.
    ///
    /// ```rust
    /// use nodematch::namer::Namer;
    /// use nodematch::syntax::parse_one;
    /// let namer = Namer::starting_at(3);
    /// let body = parse_one("(= x_unique# (+ temp# y_unique#))").unwrap();
    /// assert_eq!(namer.hygienize(&body).to_string(), "(= x_3 (+ temp4 y_3))");
    /// ```
    pub fn hygienize(&self, body: &Node) -> Node {
        let mut renamer = Renamer {
            namer: self,
            unique: None,
            temps: HashMap::new(),
        };
        renamer.rewrite(body)
    }
}

struct Renamer<'a> {
    namer: &'a Namer,
    unique: Option<u64>,
    temps: HashMap<Symbol, Symbol>,
}

impl Renamer<'_> {
    fn rewrite(&mut self, node: &Node) -> Node {
        let attrs = self.rewrite_list(node.attrs());
        let rebuilt = match node.kind() {
            NodeKind::Id(name) => match self.rename(name) {
                Some(new_name) => Node::from_parts(NodeKind::Id(new_name), node.attrs().clone(), node.span()),
                None => node.clone(),
            },
            NodeKind::Literal(_) => node.clone(),
            NodeKind::Call { target, args } => {
                let new_target = self.rewrite(target);
                let new_args = self.rewrite_list(args);
                match (Node::ptr_eq(&new_target, target), new_args) {
                    (true, None) => node.clone(),
                    (_, new_args) => node
                        .with_target(new_target)
                        .with_args(new_args.unwrap_or_else(|| args.clone())),
                }
            }
        };
        match attrs {
            Some(attrs) => rebuilt.with_attrs(attrs),
            None => rebuilt,
        }
    }

    // `None` when no item changed
    fn rewrite_list(&mut self, items: &NodeList) -> Option<NodeList> {
        let rewritten: NodeList = items.iter().map(|item| self.rewrite(item)).collect();
        let changed = rewritten
            .iter()
            .zip(items.iter())
            .any(|(new, old)| !Node::ptr_eq(new, old));
        changed.then_some(rewritten)
    }

    fn rename(&mut self, name: &Symbol) -> Option<Symbol> {
        if name.starts_with(symbols::TEMP_MARKER) {
            if let Some(done) = self.temps.get(name) {
                return Some(done.clone());
            }
            let renamed: Symbol = name.replacen('#', &self.namer.next_id().to_string(), 1).into();
            self.temps.insert(name.clone(), renamed.clone());
            return Some(renamed);
        }
        if name.contains(symbols::UNIQUE_MARKER) {
            let namer = self.namer;
            let n = *self.unique.get_or_insert_with(|| namer.next_id());
            return Some(name.replace(symbols::UNIQUE_MARKER, &n.to_string()).into());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_one;

    #[test]
    fn each_expansion_draws_a_new_unique_number() {
        let namer = Namer::starting_at(1);
        let body = parse_one("(f x_unique#)").unwrap();
        assert_eq!(namer.hygienize(&body).to_string(), "(f x_1)");
        assert_eq!(namer.hygienize(&body).to_string(), "(f x_2)");
    }

    #[test]
    fn distinct_temps_get_distinct_numbers() {
        let namer = Namer::starting_at(10);
        let body = parse_one("(g temp#a temp#b temp#a)").unwrap();
        assert_eq!(namer.hygienize(&body).to_string(), "(g temp10a temp11b temp10a)");
    }

    #[test]
    fn bodies_without_markers_are_shared() {
        let namer = Namer::new();
        let body = parse_one("(f (g 1) [attr] h)").unwrap();
        let out = namer.hygienize(&body);
        assert!(Node::ptr_eq(&out, &body));
        assert_eq!(namer.peek(), 1);
    }

    #[test]
    fn attributes_are_renamed_too() {
        let namer = Namer::starting_at(5);
        let body = parse_one("[tag_unique#] x").unwrap();
        let out = namer.hygienize(&body);
        assert!(out.attrs()[0].is_id_named("tag_5"));
    }

    #[test]
    fn clones_share_one_counter_across_threads() {
        let namer = Namer::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let n = namer.clone();
                std::thread::spawn(move || (0..100).map(|_| n.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}

//! Variadic slicing of argument lists.
//!
//! A pattern argument list has a fixed prefix, at most one variadic capture,
//! and a fixed suffix. Both the runtime matcher and the pattern compiler ask
//! the same [`Layout`] which candidate arguments land where, so the two paths
//! cannot disagree on arity.

use std::ops::Range;

use crate::ast::NodeList;
use crate::diagnostics::EngineError;
use crate::err_ctx;

use super::is_variadic_capture;

/// Shape of one pattern argument (or attribute) list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Items before the variadic capture (all items when there is none).
    pub leading: usize,
    /// Items after the variadic capture.
    pub trailing: usize,
    /// Position of the variadic capture in the pattern list.
    pub variadic: Option<usize>,
}

impl Layout {
    /// Computes the layout of a pattern list, rejecting a second variadic capture.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodematch::pattern::Layout;
    /// use nodematch::syntax::parse_one;
    /// let pat = parse_one("(f a $(... mid) z)").unwrap();
    /// let layout = Layout::of(pat.args().unwrap()).unwrap();
    /// assert_eq!((layout.leading, layout.trailing), (1, 1));
    /// assert_eq!(layout.slice(5), Some(1..4));
    /// assert_eq!(layout.slice(1), None);
    /// ```
    pub fn of(items: &NodeList) -> Result<Layout, EngineError> {
        let mut variadic = None;
        for (i, item) in items.iter().enumerate() {
            if !is_variadic_capture(item)? {
                continue;
            }
            if variadic.is_some() {
                return Err(err_ctx!(
                    MalformedPattern,
                    item.span(),
                    "more than one variadic capture in one list (second is `{}`)",
                    item
                )
                .with_help("keep at most one `$(... name)` per argument list"));
            }
            variadic = Some(i);
        }
        Ok(match variadic {
            Some(v) => Layout {
                leading: v,
                trailing: items.len() - v - 1,
                variadic,
            },
            None => Layout {
                leading: items.len(),
                trailing: 0,
                variadic: None,
            },
        })
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Fewest candidate items that can satisfy this layout.
    pub fn min_len(&self) -> usize {
        self.leading + self.trailing
    }

    /// True when a candidate list of `n` items has an acceptable length.
    pub fn accepts(&self, n: usize) -> bool {
        if self.is_variadic() {
            n >= self.min_len()
        } else {
            n == self.leading
        }
    }

    /// Candidate index range bound to the variadic capture, or `None` when
    /// `n` items cannot match. Without a variadic capture the range is empty.
    pub fn slice(&self, n: usize) -> Option<Range<usize>> {
        if !self.accepts(n) {
            return None;
        }
        Some(self.leading..n - self.trailing)
    }

    /// Candidate index of pattern item `i` for a candidate list of `n` items.
    /// Not meaningful for the variadic position itself.
    pub fn candidate_index(&self, i: usize, n: usize) -> usize {
        match self.variadic {
            Some(v) if i > v => n - (self.trailing - (i - v - 1)),
            _ => i,
        }
    }
}

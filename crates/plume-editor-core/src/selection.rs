//! Selection model: boundaries, ranges, and the per-editor selection context.
//!
//! A boundary follows DOM conventions: inside a text node the offset counts
//! characters, inside an element it counts children.

use std::cmp::Ordering;

use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};

/// A point in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point just before `node` in its parent.
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)?))
    }

    /// The point just after `node` in its parent.
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)? + 1))
    }

    /// The point at the end of `node`'s content.
    pub fn end_of(doc: &Document, node: NodeId) -> Self {
        Self::new(node, doc.node_len(node))
    }
}

/// Order two boundaries in document order.
pub fn compare_boundaries(doc: &Document, a: Boundary, b: Boundary) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    position_key(doc, a).cmp(&position_key(doc, b))
}

/// Lexicographically ordered key for a boundary.
///
/// An element boundary `(e, k)` becomes `path(e) ++ [k]`, a text boundary
/// `(t, o)` becomes `path(t) ++ [o]`. Prefix ordering then matches tree order.
fn position_key(doc: &Document, b: Boundary) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = b.node;
    while let Some(index) = doc.index_in_parent(current) {
        path.push(index);
        current = match doc.parent(current) {
            Some(parent) => parent,
            None => break,
        };
    }
    path.reverse();
    path.push(b.offset);
    path
}

/// Anchor/focus pair. Anchor is where the user started, focus where they are now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl SelectionRange {
    pub fn new(anchor: Boundary, focus: Boundary) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(at: Boundary) -> Self {
        Self::new(at, at)
    }

    /// Range covering the whole content of `node`.
    pub fn node_contents(doc: &Document, node: NodeId) -> Self {
        Self::new(Boundary::new(node, 0), Boundary::end_of(doc, node))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self, doc: &Document) -> (Boundary, Boundary) {
        match compare_boundaries(doc, self.anchor, self.focus) {
            Ordering::Greater => (self.focus, self.anchor),
            _ => (self.anchor, self.focus),
        }
    }

    pub fn start(&self, doc: &Document) -> Boundary {
        self.ordered(doc).0
    }

    pub fn end(&self, doc: &Document) -> Boundary {
        self.ordered(doc).1
    }

    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.anchor.node, self.focus.node)
    }

    pub fn collapsed_to_end(&self, doc: &Document) -> Self {
        Self::caret(self.end(doc))
    }

    /// Both boundaries lie inside `root` (root itself included) and are in bounds.
    pub fn validate(&self, doc: &Document, root: NodeId) -> Result<()> {
        for b in [self.anchor, self.focus] {
            if !doc.is_valid(b.node) || !doc.contains(root, b.node) {
                return Err(EditorError::InvalidSelection("range is outside the editor root"));
            }
            if b.offset > doc.node_len(b.node) {
                return Err(EditorError::InvalidSelection("offset past the end of its node"));
            }
        }
        Ok(())
    }
}

/// Number of text characters inside `root` that precede `b`.
pub fn text_offset(doc: &Document, root: NodeId, b: Boundary) -> usize {
    let key = position_key(doc, b);
    let mut offset = 0;
    for node in doc.descendants(root) {
        let Some(text) = doc.text(node) else {
            continue;
        };
        let len = text.chars().count();
        if node == b.node {
            return offset + b.offset.min(len);
        }
        if position_key(doc, Boundary::new(node, len)) <= key {
            offset += len;
        } else {
            break;
        }
    }
    offset
}

/// Boundary inside `root` located `offset` text characters from its start.
///
/// At a seam between two text nodes the earlier node wins. Falls back to the
/// start of the first child (or root) when `root` holds no text.
pub fn boundary_at_text_offset(doc: &Document, root: NodeId, offset: usize) -> Boundary {
    let mut acc = 0;
    let mut last = None;
    for node in doc.descendants(root) {
        let Some(text) = doc.text(node) else {
            continue;
        };
        let len = text.chars().count();
        if offset <= acc + len {
            return Boundary::new(node, offset - acc);
        }
        acc += len;
        last = Some((node, len));
    }
    match last {
        Some((node, len)) => Boundary::new(node, len),
        None => match doc.first_child(root) {
            Some(first) if doc.is_element(first) && !crate::dom::tags::is_void(doc.tag(first).unwrap_or_default()) => {
                Boundary::new(first, 0)
            }
            _ => Boundary::new(root, 0),
        },
    }
}

/// Live selection plus the copy saved across an asynchronous UI detour.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    live: Option<SelectionRange>,
    saved: Option<SelectionRange>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SelectionRange> {
        self.live
    }

    pub fn set(&mut self, range: SelectionRange) {
        self.live = Some(range);
    }

    pub fn set_caret(&mut self, at: Boundary) {
        self.live = Some(SelectionRange::caret(at));
    }

    pub fn clear(&mut self) {
        self.live = None;
    }

    /// The live range, validated against `root`.
    pub fn current(&self, doc: &Document, root: NodeId) -> Result<SelectionRange> {
        let range = self
            .live
            .ok_or(EditorError::InvalidSelection("no selection"))?;
        range.validate(doc, root)?;
        Ok(range)
    }

    /// Clone the live range so it survives a focus change.
    pub fn save(&mut self) -> Option<SelectionRange> {
        self.saved = self.live;
        self.saved
    }

    pub fn saved(&self) -> Option<SelectionRange> {
        self.saved
    }

    /// Reapply the saved range. Returns false (and changes nothing) when
    /// nothing was saved.
    pub fn restore(&mut self) -> bool {
        match self.saved {
            Some(range) => {
                self.live = Some(range);
                true
            }
            None => false,
        }
    }

    /// Reapply a range saved elsewhere, e.g. by a pending command.
    pub fn restore_from(&mut self, range: SelectionRange) {
        self.saved = Some(range);
        self.live = Some(range);
    }
}

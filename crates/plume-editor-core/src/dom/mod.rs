//! Arena-backed content tree.
//!
//! The editor surface is an element/text tree stored in a flat arena. Node ids
//! stay valid for the lifetime of the `Document`: detaching a node removes it
//! from its parent but keeps the slot, so a saved selection can never point at
//! freed memory. Whether a node is still part of the live tree is answered by
//! [`Document::contains`].

pub mod markup;
pub mod style;
pub mod tags;
pub mod url;

use smol_str::SmolStr;

pub use markup::{MarkupError, inner_markup, outer_markup, parse_fragment};

/// Stable handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Element tag plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The content tree.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Whether `id` was allocated by this document.
    pub fn is_valid(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    // === Construction ===

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached element with attributes.
    pub fn create_element_with<'a>(
        &mut self,
        tag: &str,
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    // === Node data ===

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    /// Tag name of an element, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element(el) => Some(el.tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn has_any_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.tag(id).is_some_and(|t| tags.contains(&t))
    }

    /// Change an element's tag in place, keeping children and attributes.
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            el.tag = SmolStr::new(tag.to_ascii_lowercase());
        }
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if let NodeData::Text(text) = &mut self.node_mut(id).data {
            value.clone_into(text);
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(SmolStr, String)] {
        match &self.node(id).data {
            NodeData::Element(el) => &el.attrs,
            NodeData::Text(_) => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set or replace an attribute. Ignored for text nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            let name = name.to_ascii_lowercase();
            match el.attrs.iter_mut().find(|(n, _)| *n == name) {
                Some((_, v)) => value.clone_into(v),
                None => el.attrs.push((SmolStr::new(name), value.to_owned())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            let pos = el.attrs.iter().position(|(n, _)| n == name)?;
            return Some(el.attrs.remove(pos).1);
        }
        None
    }

    /// Keep only the attributes for which `keep` returns true.
    pub fn retain_attrs(&mut self, id: NodeId, mut keep: impl FnMut(&str, &str) -> bool) {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            el.attrs.retain(|(n, v)| keep(n, v));
        }
    }

    /// Whether the element's space separated `class` list contains `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    // === Structure ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.child(parent, index + 1)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// DOM "length": char count for text, child count for elements.
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.node(id).data {
            NodeData::Text(text) => text.chars().count(),
            NodeData::Element(_) => self.node(id).children.len(),
        }
    }

    /// Remove `id` from its parent. The node keeps its own subtree.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(parent != child, "node cannot contain itself");
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Insert `node` immediately before `reference`. No-op if `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        self.detach(node);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, index, node);
        }
    }

    /// Insert `node` immediately after `reference`. No-op if `reference` is detached.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.detach(node);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        {
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Detach and return all children of `id`.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for &child in &children {
            self.node_mut(child).parent = None;
        }
        children
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.take_children(from) {
            self.append_child(to, child);
        }
    }

    // === Queries ===

    /// Iterator over the proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Descendants of `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Nearest node that contains both `a` and `b`.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if self.contains(a, b) {
            return Some(a);
        }
        let chain_b: Vec<NodeId> = std::iter::once(b).chain(self.ancestors(b)).collect();
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|n| chain_b.contains(n))
    }

    /// Path of child indices from `root` down to `node`.
    ///
    /// Returns `None` when `node` is not inside `root`.
    pub fn path_from(&self, root: NodeId, node: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = node;
        while current != root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// First element with the given id attribute inside `root`.
    pub fn find_by_id_attr(&self, root: NodeId, value: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(value))
    }

    // === Copying and splitting ===

    /// Detached copy of `id` without children.
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        self.push(data)
    }

    /// Detached copy of `id` and its whole subtree.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.shallow_clone(id);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Split a text node at a char offset.
    ///
    /// The original keeps `[..offset]`, the returned node holds the rest and
    /// is inserted right after the original when it is attached.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId {
        let text = self.text(id).unwrap_or_default().to_owned();
        let at = char_to_byte(&text, offset);
        let (head, tail) = text.split_at(at);
        let tail = self.create_text(tail);
        self.set_text(id, head);
        self.insert_after(id, tail);
        tail
    }
}

/// Iterator returned by [`Document::ancestors`].
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Byte index of the `chars`-th character, clamped to the string length.
pub fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

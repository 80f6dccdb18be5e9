//! Range mutation algorithms shared by every command.
//!
//! Plugins never walk ancestors or split nodes themselves. They go through
//! these helpers so block detection and wrapping behave identically for every
//! command.

use crate::dom::tags::{self, BLOCK_TAGS, FORMAT_BLOCK_TAGS};
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::selection::{Boundary, SelectionRange, compare_boundaries, text_offset};

/// Nearest node at or above `node` that satisfies `pred`, stopping before `root`.
pub fn find_ancestor(
    doc: &Document,
    node: NodeId,
    root: NodeId,
    pred: impl Fn(&Document, NodeId) -> bool,
) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .take_while(|&n| n != root)
        .find(|&n| pred(doc, n))
}

/// Nearest element at or above `node` whose tag is in `allowlist`.
///
/// Never returns `root`, even if root's tag would qualify. Returns `None`
/// when nothing between `node` and `root` matches, or when `node` is not
/// inside `root` at all.
pub fn find_block_ancestor(
    doc: &Document,
    node: NodeId,
    root: NodeId,
    allowlist: &[&str],
) -> Option<NodeId> {
    if !doc.contains(root, node) {
        return None;
    }
    find_ancestor(doc, node, root, |doc, n| doc.has_any_tag(n, allowlist))
}

/// Block ancestor using the shared block allowlist.
pub fn block_ancestor(doc: &Document, node: NodeId, root: NodeId) -> Option<NodeId> {
    find_block_ancestor(doc, node, root, BLOCK_TAGS)
}

/// Whether `node` intersects the range `[start, end]`.
fn intersects(doc: &Document, node: NodeId, start: Boundary, end: Boundary) -> bool {
    let (Some(before), Some(after)) = (Boundary::before(doc, node), Boundary::after(doc, node))
    else {
        return false;
    };
    compare_boundaries(doc, before, end).is_lt() && compare_boundaries(doc, after, start).is_gt()
}

/// Innermost allowlisted blocks touched by the range, in document order.
pub fn selected_blocks(
    doc: &Document,
    root: NodeId,
    range: &SelectionRange,
    allowlist: &[&str],
) -> Vec<NodeId> {
    let (start, end) = range.ordered(doc);
    let mut blocks: Vec<NodeId> = Vec::new();
    let mut push = |block: Option<NodeId>| {
        if let Some(block) = block
            && !blocks.contains(&block)
        {
            blocks.push(block);
        }
    };

    push(find_block_ancestor(doc, start.node, root, allowlist));
    for node in doc.descendants(root) {
        if intersects(doc, node, start, end) {
            push(find_block_ancestor(doc, node, root, allowlist));
        }
    }
    push(find_block_ancestor(doc, end.node, root, allowlist));

    // Keep innermost blocks only; an outer block is covered by its children.
    let all = blocks.clone();
    blocks.retain(|&b| !all.iter().any(|&other| other != b && doc.contains(b, other)));
    blocks.sort_by(|&a, &b| {
        compare_boundaries(doc, Boundary::new(a, 0), Boundary::new(b, 0))
    });
    blocks
}

/// A contiguous run of siblings produced by [`isolate_range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isolated {
    pub parent: NodeId,
    /// Child index of the first isolated node (or the insertion point if empty).
    pub index: usize,
    pub nodes: Vec<NodeId>,
}

/// Split the tree at both range boundaries up to `container` so the range
/// content becomes a run of whole children of `container`.
///
/// Text nodes are always split. Partially selected elements are split into a
/// shallow clone plus the original only when `split_elements` is set;
/// otherwise meeting one is an `UnsupportedMutation`.
pub fn isolate_range(
    doc: &mut Document,
    start: Boundary,
    end: Boundary,
    container: NodeId,
    split_elements: bool,
) -> Result<Isolated> {
    if !doc.contains(container, start.node) || !doc.contains(container, end.node) {
        return Err(EditorError::unsupported("range is not inside the container"));
    }
    if !split_elements && (!surroundable(doc, start, container) || !surroundable(doc, end, container))
    {
        return Err(EditorError::unsupported(
            "range partially selects an element",
        ));
    }

    // End first: splitting there never moves the start boundary.
    let end_index = split_point(doc, end, container)?;
    let end_ref = doc.child(container, end_index);
    let start_index = split_point(doc, start, container)?;

    let children = doc.children(container);
    let stop = end_ref
        .and_then(|r| children.iter().position(|&c| c == r))
        .unwrap_or(children.len());
    let nodes = children
        .get(start_index..stop.max(start_index))
        .map(<[NodeId]>::to_vec)
        .unwrap_or_default();
    tracing::trace!(
        target: "plume::mutate",
        container = %container,
        start_index,
        count = nodes.len(),
        "isolated range"
    );
    Ok(Isolated {
        parent: container,
        index: start_index,
        nodes,
    })
}

/// Whether only text nodes lie between `b` and `container`.
fn surroundable(doc: &Document, b: Boundary, container: NodeId) -> bool {
    b.node == container || (doc.is_text(b.node) && doc.parent(b.node) == Some(container))
}

/// Turn `b` into a child index of `container`, splitting everything in between.
fn split_point(doc: &mut Document, b: Boundary, container: NodeId) -> Result<usize> {
    if b.node == container {
        return Ok(b.offset.min(doc.node_len(container)));
    }
    let mut node = b.node;
    let mut offset = b.offset;
    loop {
        let parent = doc
            .parent(node)
            .ok_or(EditorError::NodeNotFound(node))?;
        let index = doc.index_in_parent(node).ok_or(EditorError::NodeNotFound(node))?;
        let len = doc.node_len(node);

        let lifted = if offset == 0 {
            index
        } else if offset >= len {
            index + 1
        } else if doc.is_text(node) {
            doc.split_text(node, offset);
            index + 1
        } else {
            let clone = doc.shallow_clone(node);
            let moved: Vec<NodeId> = doc.children(node)[offset..].to_vec();
            for child in moved {
                doc.append_child(clone, child);
            }
            doc.insert_after(node, clone);
            index + 1
        };

        if parent == container {
            return Ok(lifted);
        }
        node = parent;
        offset = lifted;
    }
}

/// Wrap the range in a new element built by `factory`.
///
/// Tries a plain surround first (only text is partially selected). When the
/// range crosses element boundaries it falls back to extracting the content,
/// splitting partially selected elements, and wrapping the extracted run.
/// Node order and content are preserved either way.
pub fn wrap_range_in_element(
    doc: &mut Document,
    range: &SelectionRange,
    factory: impl FnOnce(&mut Document) -> NodeId,
) -> Result<NodeId> {
    let (start, end) = range.ordered(doc);
    let isolated = isolate_for_wrap(doc, start, end)?;

    let wrapper = factory(doc);
    doc.insert_child(isolated.parent, isolated.index, wrapper);
    for node in isolated.nodes {
        doc.append_child(wrapper, node);
    }
    Ok(wrapper)
}

/// Isolate `[start, end]` below their common ancestor, surrounding when
/// possible and splitting elements otherwise.
fn isolate_for_wrap(doc: &mut Document, start: Boundary, end: Boundary) -> Result<Isolated> {
    let mut container = doc
        .common_ancestor(start.node, end.node)
        .ok_or(EditorError::unsupported("range has no common ancestor"))?;
    if doc.is_text(container) {
        container = doc
            .parent(container)
            .ok_or(EditorError::NodeNotFound(container))?;
    }

    match isolate_range(doc, start, end, container, false) {
        Ok(isolated) => Ok(isolated),
        Err(EditorError::UnsupportedMutation(reason)) => {
            tracing::debug!(
                target: "plume::mutate",
                %reason,
                "surround not possible, extracting contents"
            );
            isolate_range(doc, start, end, container, true)
        }
        Err(err) => Err(err),
    }
}

/// One block's share of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSegment {
    pub block: NodeId,
    pub start: Boundary,
    pub end: Boundary,
}

/// Cut a range at block edges: one segment per innermost block it touches,
/// clamped to that block, in document order.
///
/// Segments with nothing between their ends are dropped. A range with no
/// block around it comes back whole, with `root` as its block.
pub fn block_segments(doc: &Document, root: NodeId, range: &SelectionRange) -> Vec<BlockSegment> {
    let (start, end) = range.ordered(doc);
    let blocks = selected_blocks(doc, root, range, FORMAT_BLOCK_TAGS);
    if blocks.is_empty() {
        return vec![BlockSegment {
            block: root,
            start,
            end,
        }];
    }
    blocks
        .into_iter()
        .filter_map(|block| {
            let first = Boundary::new(block, 0);
            let last = Boundary::end_of(doc, block);
            let start = if compare_boundaries(doc, start, first).is_lt() { first } else { start };
            let end = if compare_boundaries(doc, end, last).is_gt() { last } else { end };
            (!covers_nothing(doc, block, start, end)).then_some(BlockSegment { block, start, end })
        })
        .collect()
}

/// Whether no characters and no leaf elements lie between `start` and `end`
/// inside `block`.
fn covers_nothing(doc: &Document, block: NodeId, start: Boundary, end: Boundary) -> bool {
    if compare_boundaries(doc, start, end).is_ge() {
        return true;
    }
    text_offset(doc, block, start) == text_offset(doc, block, end)
        && !doc.descendants(block).into_iter().any(|n| {
            doc.is_element(n) && doc.children(n).is_empty() && intersects(doc, n, start, end)
        })
}

/// Whether `node` is block-level or has a block-level descendant.
fn holds_block(doc: &Document, node: NodeId) -> bool {
    std::iter::once(node)
        .chain(doc.descendants(node))
        .any(|n| doc.tag(n).is_some_and(tags::is_block_level))
}

/// Wrap the range in inline elements built by `factory`.
///
/// The range is cut at block edges and each block's share is wrapped on its
/// own, with one wrapper per run of inline content, so a wrapper never holds
/// a block. Returns the wrappers in document order; empty when the range
/// covers no content.
pub fn wrap_range_inline(
    doc: &mut Document,
    root: NodeId,
    range: &SelectionRange,
    mut factory: impl FnMut(&mut Document) -> NodeId,
) -> Result<Vec<NodeId>> {
    let mut wrappers = Vec::new();
    for segment in block_segments(doc, root, range) {
        let isolated = isolate_for_wrap(doc, segment.start, segment.end)?;

        let mut runs: Vec<Vec<NodeId>> = vec![Vec::new()];
        for node in isolated.nodes {
            if holds_block(doc, node) {
                runs.push(Vec::new());
            } else if let Some(run) = runs.last_mut() {
                run.push(node);
            }
        }
        for run in runs {
            let Some(&first) = run.first() else {
                continue;
            };
            let index = doc
                .index_in_parent(first)
                .ok_or(EditorError::NodeNotFound(first))?;
            let wrapper = factory(doc);
            doc.insert_child(isolated.parent, index, wrapper);
            for node in run {
                doc.append_child(wrapper, node);
            }
            wrappers.push(wrapper);
        }
    }
    tracing::trace!(target: "plume::mutate", count = wrappers.len(), "wrapped inline runs");
    Ok(wrappers)
}

/// Range from the start of `first`'s contents to the end of `last`'s.
pub fn contents_between(doc: &Document, first: NodeId, last: NodeId) -> SelectionRange {
    SelectionRange::new(Boundary::new(first, 0), Boundary::end_of(doc, last))
}

/// Splice `element`'s children into its parent in place and remove it.
///
/// Returns the moved children.
pub fn unwrap_element(doc: &mut Document, element: NodeId) -> Result<Vec<NodeId>> {
    let parent = doc
        .parent(element)
        .ok_or(EditorError::NodeNotFound(element))?;
    let index = doc
        .index_in_parent(element)
        .ok_or(EditorError::NodeNotFound(element))?;
    let children = doc.take_children(element);
    for (i, &child) in children.iter().enumerate() {
        doc.insert_child(parent, index + i, child);
    }
    doc.detach(element);
    Ok(children)
}

/// Insert `node` at a boundary, splitting a text node if needed.
///
/// Returns the boundary immediately after the inserted node.
pub fn insert_at_boundary(doc: &mut Document, at: Boundary, node: NodeId) -> Result<Boundary> {
    if doc.is_text(at.node) {
        let len = doc.node_len(at.node);
        if at.offset == 0 {
            doc.insert_before(at.node, node);
        } else if at.offset >= len {
            doc.insert_after(at.node, node);
        } else {
            doc.split_text(at.node, at.offset);
            doc.insert_after(at.node, node);
        }
    } else {
        doc.insert_child(at.node, at.offset, node);
    }
    Boundary::after(doc, node).ok_or(EditorError::NodeNotFound(node))
}

/// Range spanning from just before the first node to just after the last.
pub fn range_over(doc: &Document, nodes: &[NodeId]) -> Option<SelectionRange> {
    let first = *nodes.first()?;
    let last = *nodes.last()?;
    Some(SelectionRange::new(
        Boundary::before(doc, first)?,
        Boundary::after(doc, last)?,
    ))
}

/// Merge adjacent text nodes and drop empty ones below `node`, keeping
/// `selection` pointing at the same characters.
pub fn normalize(doc: &mut Document, node: NodeId, selection: &mut Option<SelectionRange>) {
    let mut elements = vec![node];
    elements.extend(doc.descendants(node).into_iter().filter(|&n| doc.is_element(n)));

    for parent in elements {
        let mut i = 0;
        while i < doc.children(parent).len() {
            let child = doc.children(parent)[i];
            if !doc.is_text(child) {
                i += 1;
                continue;
            }
            let prev = i
                .checked_sub(1)
                .map(|p| doc.children(parent)[p])
                .filter(|&p| doc.is_text(p));

            if doc.node_len(child) == 0 {
                remap(selection, |b| {
                    if b.node == child {
                        *b = Boundary::new(parent, i);
                    } else if b.node == parent && b.offset > i {
                        b.offset -= 1;
                    }
                });
                doc.detach(child);
                continue;
            }

            if let Some(prev) = prev {
                let base = doc.node_len(prev);
                let merged = format!(
                    "{}{}",
                    doc.text(prev).unwrap_or_default(),
                    doc.text(child).unwrap_or_default()
                );
                doc.set_text(prev, &merged);
                remap(selection, |b| {
                    if b.node == child {
                        *b = Boundary::new(prev, base + b.offset);
                    } else if b.node == parent && b.offset == i {
                        *b = Boundary::new(prev, base);
                    } else if b.node == parent && b.offset > i {
                        b.offset -= 1;
                    }
                });
                doc.detach(child);
                continue;
            }
            i += 1;
        }
    }
}

fn remap(selection: &mut Option<SelectionRange>, mut fix: impl FnMut(&mut Boundary)) {
    if let Some(range) = selection {
        fix(&mut range.anchor);
        fix(&mut range.focus);
    }
}

/// Remove inline wrappers left without children below `node`.
pub fn remove_empty_inlines(
    doc: &mut Document,
    node: NodeId,
    selection: &mut Option<SelectionRange>,
) {
    // Post-order so a wrapper emptied by removing its child goes too.
    let mut candidates = doc.descendants(node);
    candidates.reverse();
    for el in candidates {
        let is_inline_wrapper = doc
            .tag(el)
            .is_some_and(|t| tags::INLINE_FORMATTING_TAGS.contains(&t) || t == "a" || t == "code");
        if !is_inline_wrapper || !doc.children(el).is_empty() {
            continue;
        }
        let (Some(parent), Some(index)) = (doc.parent(el), doc.index_in_parent(el)) else {
            continue;
        };
        remap(selection, |b| {
            if b.node == el {
                *b = Boundary::new(parent, index);
            } else if b.node == parent && b.offset > index {
                b.offset -= 1;
            }
        });
        doc.detach(el);
    }
}

/// What [`rewrite`] does with one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Copy the element (attributes filtered) and rewrite its children.
    Keep,
    /// Replace the element with its rewritten children.
    Unwrap,
    /// Replace the element with copies of its text descendants. Verbatim
    /// subtrees inside it survive whole.
    TextOnly,
    /// Copy the subtree unchanged.
    Verbatim,
}

/// Per-element decisions for [`rewrite`].
pub trait TreeRewriter {
    fn classify(&self, doc: &Document, element: NodeId) -> Rewrite;

    /// Whether an attribute survives on a kept element.
    fn keep_attr(&self, _tag: &str, _name: &str) -> bool {
        true
    }
}

/// Recursively rewrite `node` into new detached nodes.
///
/// The source subtree is only read, so a failure leaves the live tree as it
/// was; callers swap the returned nodes in once the whole rewrite succeeded.
pub fn rewrite(
    doc: &mut Document,
    node: NodeId,
    rewriter: &impl TreeRewriter,
    max_depth: usize,
) -> Result<Vec<NodeId>> {
    rewrite_at(doc, node, rewriter, 0, max_depth)
}

fn rewrite_at(
    doc: &mut Document,
    node: NodeId,
    rewriter: &impl TreeRewriter,
    depth: usize,
    max_depth: usize,
) -> Result<Vec<NodeId>> {
    if depth > max_depth {
        return Err(EditorError::DepthExceeded(max_depth));
    }
    if doc.is_text(node) {
        return Ok(vec![doc.shallow_clone(node)]);
    }

    match rewriter.classify(doc, node) {
        Rewrite::Verbatim => Ok(vec![doc.deep_clone(node)]),
        Rewrite::TextOnly => {
            let mut out = Vec::new();
            collect_text(doc, node, rewriter, &mut out);
            Ok(out)
        }
        Rewrite::Unwrap => {
            let mut out = Vec::new();
            for child in doc.children(node).to_vec() {
                out.extend(rewrite_at(doc, child, rewriter, depth + 1, max_depth)?);
            }
            Ok(out)
        }
        Rewrite::Keep => {
            let copy = doc.shallow_clone(node);
            let tag = doc.tag(node).unwrap_or_default().to_owned();
            doc.retain_attrs(copy, |name, _| rewriter.keep_attr(&tag, name));
            for child in doc.children(node).to_vec() {
                for rewritten in rewrite_at(doc, child, rewriter, depth + 1, max_depth)? {
                    doc.append_child(copy, rewritten);
                }
            }
            Ok(vec![copy])
        }
    }
}

/// Copies of the text below `node`; subtrees classified `Verbatim` come
/// along whole.
fn collect_text(doc: &mut Document, node: NodeId, rewriter: &impl TreeRewriter, out: &mut Vec<NodeId>) {
    for child in doc.children(node).to_vec() {
        if doc.is_text(child) {
            out.push(doc.shallow_clone(child));
        } else if rewriter.classify(doc, child) == Rewrite::Verbatim {
            out.push(doc.deep_clone(child));
        } else {
            collect_text(doc, child, rewriter, out);
        }
    }
}

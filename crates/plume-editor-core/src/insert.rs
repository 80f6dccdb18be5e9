//! Insertion positioning for structural elements.
//!
//! Block-level elements cannot live inside a paragraph or heading, so an
//! insert there lands after the enclosing block instead. Afterwards the
//! cursor is put where typing can continue naturally: in a fresh
//! continuation block, right after a floated element, or after a filler
//! character following a centred one.

use crate::dom::tags::{is_block_level, is_inline_flow_block};
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::mutate::{block_ancestor, insert_at_boundary, isolate_range};
use crate::selection::{Boundary, SelectionRange};

/// How the inserted element sits in the flow, which decides where the cursor
/// goes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Occupies the full line (rules, tables). A continuation block follows.
    Flow,
    /// Floated to one side; text wraps beside it, nothing is added.
    Floated,
    /// Centred or unfloated; a filler character follows to hold the cursor.
    Inline,
}

/// Settings that shape the cursor placement.
#[derive(Debug, Clone, Copy)]
pub struct InsertOptions<'a> {
    pub continuation_tag: &'a str,
    pub filler: char,
}

/// Where an element will be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    /// After this block, escaping its inline-only content model.
    AfterBlock(NodeId),
    /// Exactly at the boundary.
    At(Boundary),
}

/// Empty the range so a collapsed caret remains at its start.
pub fn clear_range(doc: &mut Document, root: NodeId, range: &SelectionRange) -> Result<Boundary> {
    if range.is_collapsed() {
        return Ok(range.anchor);
    }
    let (start, end) = range.ordered(doc);
    let mut container = doc
        .common_ancestor(start.node, end.node)
        .ok_or(EditorError::unsupported("range has no common ancestor"))?;
    if doc.is_text(container) {
        container = doc.parent(container).ok_or(EditorError::NodeNotFound(container))?;
    }
    if !doc.contains(root, container) {
        return Err(EditorError::InvalidSelection("range is outside the editor root"));
    }
    let isolated = isolate_range(doc, start, end, container, true)?;
    for node in &isolated.nodes {
        doc.detach(*node);
    }
    Ok(Boundary::new(container, isolated.index))
}

/// Decide where a structural element goes for a caret at `at`.
///
/// Elements that need their own line escape an enclosing paragraph or
/// heading; everything else is inserted in place.
pub fn insertion_point(doc: &Document, root: NodeId, at: Boundary, needs_line: bool) -> InsertionPoint {
    match block_ancestor(doc, at.node, root) {
        Some(block) if needs_line && doc.tag(block).is_some_and(is_inline_flow_block) => {
            InsertionPoint::AfterBlock(block)
        }
        _ => InsertionPoint::At(at),
    }
}

/// Insert `element` for the current range and return the new caret.
pub fn insert_structural(
    doc: &mut Document,
    root: NodeId,
    range: &SelectionRange,
    element: NodeId,
    placement: Placement,
    options: InsertOptions<'_>,
) -> Result<Boundary> {
    let at = clear_range(doc, root, range)?;
    let needs_line = doc.tag(element).is_some_and(is_block_level);
    match insertion_point(doc, root, at, needs_line) {
        InsertionPoint::AfterBlock(block) => doc.insert_after(block, element),
        InsertionPoint::At(at) => {
            insert_at_boundary(doc, at, element)?;
        }
    }

    let caret = match placement {
        Placement::Flow => {
            let next = doc.create_element(options.continuation_tag);
            doc.insert_after(element, next);
            Boundary::new(next, 0)
        }
        Placement::Floated => {
            Boundary::after(doc, element).ok_or(EditorError::NodeNotFound(element))?
        }
        Placement::Inline => {
            let filler = doc.create_text(&options.filler.to_string());
            doc.insert_after(element, filler);
            Boundary::new(filler, 1)
        }
    };
    tracing::debug!(
        target: "plume::insert",
        element = %element,
        ?placement,
        "inserted structural element"
    );
    Ok(caret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_markup, parse_fragment};

    const OPTIONS: InsertOptions<'static> = InsertOptions {
        continuation_tag: "p",
        filler: '\u{200B}',
    };

    fn doc_with(src: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        parse_fragment(&mut doc, root, src).unwrap();
        (doc, root)
    }

    fn caret_in_first_text(doc: &Document, root: NodeId, offset: usize) -> SelectionRange {
        let text = doc
            .descendants(root)
            .into_iter()
            .find(|&n| doc.is_text(n))
            .unwrap();
        SelectionRange::caret(Boundary::new(text, offset))
    }

    #[test]
    fn test_rule_escapes_paragraph_with_continuation() {
        let (mut doc, root) = doc_with("<p>ABCD</p>");
        let range = caret_in_first_text(&doc, root, 2);
        let hr = doc.create_element("hr");
        let caret = insert_structural(&mut doc, root, &range, hr, Placement::Flow, OPTIONS).unwrap();
        assert_eq!(inner_markup(&doc, root), "<p>ABCD</p><hr><p></p>");
        assert_eq!(doc.tag(caret.node), Some("p"));
        assert_eq!(caret.offset, 0);
        assert_eq!(doc.prev_sibling(caret.node), Some(hr));
    }

    #[test]
    fn test_in_place_outside_inline_flow_block() {
        let (mut doc, root) = doc_with("<div>ABCD</div>");
        let range = caret_in_first_text(&doc, root, 2);
        let img = doc.create_element("img");
        let caret =
            insert_structural(&mut doc, root, &range, img, Placement::Inline, OPTIONS).unwrap();
        assert_eq!(inner_markup(&doc, root), "<div>AB<img>\u{200B}CD</div>");
        assert_eq!(doc.text(caret.node), Some("\u{200B}"));
    }

    #[test]
    fn test_floated_leaves_caret_after_element() {
        let (mut doc, root) = doc_with("<p>text</p>");
        let range = caret_in_first_text(&doc, root, 4);
        let figure = doc.create_element("figure");
        let caret =
            insert_structural(&mut doc, root, &range, figure, Placement::Floated, OPTIONS).unwrap();
        assert_eq!(inner_markup(&doc, root), "<p>text</p><figure></figure>");
        assert_eq!(caret, Boundary::new(root, 2));
    }

    #[test]
    fn test_selected_content_is_replaced() {
        let (mut doc, root) = doc_with("<div>ABCD</div>");
        let text = doc.children(doc.children(root)[0])[0];
        let range = SelectionRange::new(Boundary::new(text, 1), Boundary::new(text, 3));
        let hr = doc.create_element("hr");
        insert_structural(&mut doc, root, &range, hr, Placement::Flow, OPTIONS).unwrap();
        assert_eq!(inner_markup(&doc, root), "<div>A<hr><p></p>D</div>");
    }
}

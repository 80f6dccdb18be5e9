use smol_str::SmolStr;

use crate::dom::tags::format_aliases;
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::mutate::{
    BlockSegment, block_segments, contents_between, find_ancestor, insert_at_boundary,
    isolate_range, normalize, remove_empty_inlines, unwrap_element, wrap_range_inline,
};
use crate::selection::{Boundary, SelectionRange};
use crate::session::EditorSession;

/// Inline format toggled on and off: bold, italic, underline and friends.
#[derive(Debug, Clone)]
pub struct ToggleFormat {
    tag: SmolStr,
    marker: char,
}

impl ToggleFormat {
    pub fn new(tag: impl Into<SmolStr>, marker: char) -> Self {
        Self {
            tag: tag.into(),
            marker,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match format_aliases(&self.tag) {
            [] => doc.has_tag(node, &self.tag),
            aliases => doc.has_any_tag(node, aliases),
        }
    }

    /// Nearest matching element at or above `node`, below `root`.
    fn enclosing(&self, doc: &Document, node: NodeId, root: NodeId) -> Option<NodeId> {
        find_ancestor(doc, node, root, |doc, n| self.matches(doc, n))
    }

    /// Outermost matching element at or above `node`, below `root`.
    fn outermost(&self, doc: &Document, node: NodeId, root: NodeId) -> Option<NodeId> {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .take_while(|&n| n != root)
            .filter(|&n| self.matches(doc, n))
            .last()
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        self.enclosing(&session.doc, range.anchor.node, session.root)
            .is_some()
    }

    pub fn execute(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let active = self.is_active(session);
        match (range.is_collapsed(), active) {
            (true, false) => self.insert_marker(session, range),
            (true, true) => self.unwrap_at_caret(session, range),
            (false, false) => self.apply(session, range),
            (false, true) => self.remove(session, range),
        }
    }

    /// Wrap the range, absorbing equivalent formatting already inside it.
    fn apply(&self, session: &mut EditorSession, range: SelectionRange) -> Result<bool> {
        let tag = self.tag.clone();
        let root = session.root;
        let doc = &mut session.doc;
        let wrappers = wrap_range_inline(doc, root, &range, |d| d.create_element(&tag))?;
        let (Some(&first), Some(&last)) = (wrappers.first(), wrappers.last()) else {
            return Ok(false);
        };

        for &wrapper in &wrappers {
            let nested: Vec<NodeId> = doc
                .descendants(wrapper)
                .into_iter()
                .filter(|&n| self.matches(doc, n))
                .collect();
            for node in nested {
                unwrap_element(doc, node)?;
            }
        }

        let mut selection = Some(contents_between(doc, first, last));
        for &wrapper in &wrappers {
            normalize(doc, wrapper, &mut selection);
        }
        if let Some(selection) = selection {
            session.selection.set(selection);
        }
        tracing::debug!(target: "plume::format", tag = %self.tag, blocks = wrappers.len(), "applied inline format");
        Ok(true)
    }

    /// Lift the range out of every matching ancestor and unwrap matches
    /// inside, one block at a time.
    fn remove(&self, session: &mut EditorSession, range: SelectionRange) -> Result<bool> {
        let root = session.root;
        let mut lifted: Vec<SelectionRange> = Vec::new();
        for segment in block_segments(&session.doc, root, &range) {
            lifted.push(self.remove_in_block(&mut session.doc, segment)?);
        }
        let (Some(first), Some(last)) = (lifted.first(), lifted.last()) else {
            return Ok(false);
        };
        session
            .selection
            .set(SelectionRange::new(first.anchor, last.focus));
        tracing::debug!(target: "plume::format", tag = %self.tag, blocks = lifted.len(), "removed inline format");
        Ok(true)
    }

    /// Remove the format from one block's share of the range. Returns the
    /// range now covering the lifted content.
    fn remove_in_block(&self, doc: &mut Document, segment: BlockSegment) -> Result<SelectionRange> {
        let BlockSegment { block, start, end } = segment;
        let common = doc
            .common_ancestor(start.node, end.node)
            .ok_or(EditorError::unsupported("range has no common ancestor"))?;

        let container = match self.outermost(doc, common, block) {
            Some(top) => doc.parent(top).ok_or(EditorError::NodeNotFound(top))?,
            None if doc.is_text(common) => doc.parent(common).ok_or(EditorError::NodeNotFound(common))?,
            None => common,
        };

        let isolated = isolate_range(doc, start, end, container, true)?;
        let before = isolated.index.checked_sub(1).and_then(|i| doc.child(container, i));
        let after = isolated
            .nodes
            .last()
            .and_then(|&last| doc.next_sibling(last));

        for node in isolated.nodes {
            let mut matched: Vec<NodeId> = doc
                .descendants(node)
                .into_iter()
                .filter(|&n| self.matches(doc, n))
                .collect();
            if self.matches(doc, node) {
                matched.push(node);
            }
            for el in matched {
                unwrap_element(doc, el)?;
            }
        }

        let start_index = before
            .and_then(|b| doc.index_in_parent(b))
            .map_or(0, |i| i + 1);
        let end_index = after
            .and_then(|a| doc.index_in_parent(a))
            .unwrap_or_else(|| doc.node_len(container));
        let mut selection = Some(SelectionRange::new(
            Boundary::new(container, start_index),
            Boundary::new(container, end_index),
        ));
        normalize(doc, container, &mut selection);
        remove_empty_inlines(doc, container, &mut selection);
        selection.ok_or(EditorError::NodeNotFound(container))
    }

    /// Start an empty wrapper at the caret so typed text picks up the format.
    fn insert_marker(&self, session: &mut EditorSession, range: SelectionRange) -> Result<bool> {
        let doc = &mut session.doc;
        let wrapper = doc.create_element(&self.tag);
        let marker = doc.create_text(&self.marker.to_string());
        doc.append_child(wrapper, marker);
        insert_at_boundary(doc, range.anchor, wrapper)?;
        session.selection.set_caret(Boundary::new(marker, 1));
        Ok(true)
    }

    fn unwrap_at_caret(&self, session: &mut EditorSession, range: SelectionRange) -> Result<bool> {
        let root = session.root;
        let doc = &mut session.doc;
        let Some(wrapper) = self.enclosing(doc, range.anchor.node, root) else {
            return Ok(false);
        };
        let parent = doc.parent(wrapper).ok_or(EditorError::NodeNotFound(wrapper))?;
        let index = doc
            .index_in_parent(wrapper)
            .ok_or(EditorError::NodeNotFound(wrapper))?;
        unwrap_element(doc, wrapper)?;

        let mut caret = range.anchor;
        if caret.node == wrapper {
            caret = Boundary::new(parent, index + caret.offset);
        }
        let mut selection = Some(SelectionRange::caret(caret));
        normalize(doc, parent, &mut selection);
        remove_empty_inlines(doc, parent, &mut selection);
        if let Some(selection) = selection {
            session.selection.set(selection);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn session(src: &str) -> EditorSession {
        EditorSession::from_markup(src, &EditorConfig::default()).unwrap()
    }

    fn bold() -> ToggleFormat {
        ToggleFormat::new("strong", '\u{200B}')
    }

    #[test]
    fn test_apply_then_remove_round_trips() {
        let mut s = session("<p>hello world</p>");
        s.select_text(0, 5);
        assert!(bold().execute(&mut s).unwrap());
        assert_eq!(s.markup(), "<p><strong>hello</strong> world</p>");
        assert!(bold().is_active(&s));

        assert!(bold().execute(&mut s).unwrap());
        assert_eq!(s.markup(), "<p>hello world</p>");
        assert!(!bold().is_active(&s));
    }

    #[test]
    fn test_apply_absorbs_alias_inside_range() {
        let mut s = session("<p>a<b>b</b>c</p>");
        s.select_text(0, 3);
        bold().execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p><strong>abc</strong></p>");
    }

    #[test]
    fn test_remove_middle_splits_wrapper() {
        let mut s = session("<p><em>abcdef</em></p>");
        s.select_text(2, 4);
        let italic = ToggleFormat::new("em", '\u{200B}');
        assert!(italic.is_active(&s));
        italic.execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p><em>ab</em>cd<em>ef</em></p>");
    }

    #[test]
    fn test_collapsed_inserts_marker() {
        let mut s = session("<p>ab</p>");
        s.place_caret(1);
        bold().execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p>a<strong>\u{200B}</strong>b</p>");
        assert!(bold().is_active(&s));
    }

    #[test]
    fn test_collapsed_inside_format_unwraps() {
        let mut s = session("<p>x<strong>bold</strong>y</p>");
        s.place_caret(3);
        assert!(bold().is_active(&s));
        bold().execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p>xboldy</p>");
    }

    #[test]
    fn test_no_selection_is_an_error() {
        let mut s = session("<p>ab</p>");
        assert!(matches!(
            bold().execute(&mut s),
            Err(EditorError::InvalidSelection(_))
        ));
        assert!(!bold().is_active(&s));
    }
}

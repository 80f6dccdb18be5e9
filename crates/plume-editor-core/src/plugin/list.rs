use smol_str::SmolStr;

use crate::dom::tags::{BLOCK_TAGS, LIST_TAGS, is_block_level};
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::mutate::{find_ancestor, find_block_ancestor, selected_blocks};
use crate::selection::SelectionRange;
use crate::session::EditorSession;

/// Ordered or unordered list toggle.
///
/// Outside a list the selected blocks become items of a new list. Inside a
/// list of the other type the list is retyped. Inside a list of this type the
/// selected items are lifted back out into paragraphs, splitting the list
/// around them.
#[derive(Debug, Clone)]
pub struct ListFormat {
    tag: SmolStr,
}

impl ListFormat {
    pub fn ordered() -> Self {
        Self { tag: "ol".into() }
    }

    pub fn unordered() -> Self {
        Self { tag: "ul".into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn nearest_list(doc: &Document, node: NodeId, root: NodeId) -> Option<NodeId> {
        find_ancestor(doc, node, root, |doc, n| doc.has_any_tag(n, LIST_TAGS))
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        let doc = &session.doc;
        Self::nearest_list(doc, range.start(doc).node, session.root)
            .is_some_and(|list| doc.has_tag(list, &self.tag))
    }

    pub fn execute(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let start = range.start(&session.doc);
        match Self::nearest_list(&session.doc, start.node, session.root) {
            Some(list) if session.doc.has_tag(list, &self.tag) => {
                session.preserving_selection(|s| lift_items(s, list, &range))
            }
            Some(list) => {
                session.doc.set_tag(list, &self.tag);
                tracing::debug!(target: "plume::format", tag = %self.tag, "retyped list");
                Ok(true)
            }
            None => session.preserving_selection(|s| self.wrap_blocks(s, &range)),
        }
    }

    fn wrap_blocks(&self, session: &mut EditorSession, range: &SelectionRange) -> Result<bool> {
        let doc = &mut session.doc;
        let blocks: Vec<NodeId> = selected_blocks(doc, session.root, range, BLOCK_TAGS)
            .into_iter()
            .filter(|&b| !doc.has_tag(b, "li"))
            .collect();
        let Some(&first) = blocks.first() else {
            return Ok(false);
        };

        let list = doc.create_element(&self.tag);
        doc.insert_before(first, list);
        for &block in &blocks {
            let item = doc.create_element("li");
            if doc.has_any_tag(block, &["p", "div"]) {
                doc.move_children(block, item);
                doc.detach(block);
            } else {
                doc.append_child(item, block);
            }
            doc.append_child(list, item);
        }
        tracing::debug!(target: "plume::format", tag = %self.tag, items = blocks.len(), "wrapped blocks in list");
        Ok(true)
    }
}

/// Move the selected items of `list` out as blocks, leaving the unselected
/// items in lists before and after them.
fn lift_items(session: &mut EditorSession, list: NodeId, range: &SelectionRange) -> Result<bool> {
    let root = session.root;
    let doc = &mut session.doc;
    let parent = doc.parent(list).ok_or(EditorError::NodeNotFound(list))?;
    let index = doc.index_in_parent(list).ok_or(EditorError::NodeNotFound(list))?;

    let mut selected: Vec<NodeId> = selected_blocks(doc, root, range, &["li"])
        .into_iter()
        .filter(|&li| doc.parent(li) == Some(list))
        .collect();
    if selected.is_empty() {
        let start = range.start(doc);
        selected.extend(find_block_ancestor(doc, start.node, root, &["li"]));
    }
    if selected.is_empty() {
        return Ok(false);
    }

    let mut out: Vec<NodeId> = Vec::new();
    let mut open_list: Option<NodeId> = None;
    for child in doc.take_children(list) {
        if selected.contains(&child) {
            open_list = None;
            let has_blocks = doc
                .children(child)
                .iter()
                .any(|&c| doc.tag(c).is_some_and(is_block_level));
            if has_blocks {
                out.extend(doc.take_children(child));
            } else {
                let p = doc.create_element("p");
                doc.move_children(child, p);
                out.push(p);
            }
            continue;
        }
        let target = match open_list {
            Some(l) => l,
            None => {
                let l = doc.shallow_clone(list);
                out.push(l);
                open_list = Some(l);
                l
            }
        };
        doc.append_child(target, child);
    }

    doc.detach(list);
    for (offset, node) in out.into_iter().enumerate() {
        doc.insert_child(parent, index + offset, node);
    }
    tracing::debug!(target: "plume::format", items = selected.len(), "lifted list items");
    Ok(true)
}

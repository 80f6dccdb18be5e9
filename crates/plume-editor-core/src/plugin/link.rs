use crate::dom::url::validate_href;
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::mutate::{
    contents_between, find_ancestor, insert_at_boundary, normalize, unwrap_element,
    wrap_range_inline,
};
use crate::plugin::CommandParams;
use crate::selection::{Boundary, compare_boundaries};
use crate::session::{EditorSession, UiRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Create,
    Remove,
}

/// Create, retarget or remove hyperlinks.
#[derive(Debug, Clone)]
pub struct LinkCommand {
    action: LinkAction,
}

fn enclosing_link(doc: &Document, node: NodeId, root: NodeId) -> Option<NodeId> {
    find_ancestor(doc, node, root, |doc, n| doc.has_tag(n, "a"))
}

impl LinkCommand {
    pub fn new(action: LinkAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> LinkAction {
        self.action
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        enclosing_link(&session.doc, range.anchor.node, session.root).is_some()
    }

    pub fn execute(
        &self,
        name: &str,
        session: &mut EditorSession,
        params: &CommandParams,
    ) -> Result<bool> {
        match self.action {
            LinkAction::Remove => self.remove(session),
            LinkAction::Create => {
                if let Some(href) = params.value_str() {
                    return self.apply(session, href);
                }
                let range = session.range()?;
                let current = enclosing_link(&session.doc, range.anchor.node, session.root)
                    .and_then(|a| session.doc.attr(a, "href"))
                    .map(str::to_owned);
                Ok(session
                    .open_secondary_ui(name, UiRequest::LinkHref { current })
                    .is_some())
            }
        }
    }

    /// Link the live selection to `href`.
    pub(crate) fn apply(&self, session: &mut EditorSession, href: &str) -> Result<bool> {
        let href = validate_href(href)?;
        let range = session.range()?;
        let root = session.root;
        let doc = &mut session.doc;

        if let Some(existing) = enclosing_link(doc, range.anchor.node, root) {
            doc.set_attr(existing, "href", href);
            tracing::debug!(target: "plume::format", href, "retargeted link");
            return Ok(true);
        }

        if range.is_collapsed() {
            let link = doc.create_element_with("a", [("href", href)]);
            let text = doc.create_text(href);
            doc.append_child(link, text);
            let after = insert_at_boundary(doc, range.anchor, link)?;
            session.selection.set_caret(after);
        } else {
            let links = wrap_range_inline(doc, root, &range, |d| {
                d.create_element_with("a", [("href", href)])
            })?;
            let (Some(&first), Some(&last)) = (links.first(), links.last()) else {
                return Ok(false);
            };
            for &link in &links {
                let nested: Vec<NodeId> = doc
                    .descendants(link)
                    .into_iter()
                    .filter(|&n| doc.has_tag(n, "a"))
                    .collect();
                for inner in nested {
                    unwrap_element(doc, inner)?;
                }
            }
            let mut selection = Some(contents_between(doc, first, last));
            for &link in &links {
                normalize(doc, link, &mut selection);
            }
            if let Some(selection) = selection {
                session.selection.set(selection);
            }
        }
        tracing::debug!(target: "plume::format", href, "created link");
        Ok(true)
    }

    /// Unwrap the link at the anchor plus every link inside the selection.
    fn remove(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let root = session.root;
        let doc = &mut session.doc;
        let (start, end) = range.ordered(doc);

        let mut links: Vec<NodeId> = Vec::new();
        links.extend(enclosing_link(doc, start.node, root));
        if let Some(link) = enclosing_link(doc, end.node, root)
            && !links.contains(&link)
        {
            links.push(link);
        }
        if let Some(common) = doc.common_ancestor(start.node, end.node) {
            for node in doc.descendants(common) {
                let inside = compare_boundaries(doc, Boundary::new(node, 0), end).is_lt()
                    && compare_boundaries(doc, Boundary::end_of(doc, node), start).is_gt();
                if inside && doc.has_tag(node, "a") && !links.contains(&node) {
                    links.push(node);
                }
            }
        }
        if links.is_empty() {
            return Ok(false);
        }

        let mut parents = Vec::new();
        for link in &links {
            let parent = doc.parent(*link).ok_or(EditorError::NodeNotFound(*link))?;
            let index = doc.index_in_parent(*link).ok_or(EditorError::NodeNotFound(*link))?;
            // A boundary on the link element itself is moved to its parent.
            let mut live = session.selection.get();
            if let Some(r) = live.as_mut() {
                for b in [&mut r.anchor, &mut r.focus] {
                    if b.node == *link {
                        *b = Boundary::new(parent, index + b.offset);
                    }
                }
            }
            unwrap_element(doc, *link)?;
            if let Some(r) = live {
                session.selection.set(r);
            }
            parents.push(parent);
        }

        let mut selection = session.selection.get();
        for parent in parents {
            if doc.is_valid(parent) {
                normalize(doc, parent, &mut selection);
            }
        }
        if let Some(selection) = selection {
            session.selection.set(selection);
        }
        tracing::debug!(target: "plume::format", count = links.len(), "removed links");
        Ok(true)
    }
}

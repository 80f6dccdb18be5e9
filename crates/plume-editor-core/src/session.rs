//! Per-editor session context.
//!
//! An `EditorSession` owns everything one editor instance mutates: the tree,
//! the live selection, the footnote registry and any commands waiting on
//! secondary UI. It is created with the editor and dropped with it; nothing
//! here is global.

use smol_str::SmolStr;

use crate::config::EditorConfig;
use crate::dom::tags::is_block_level;
use crate::dom::{Document, NodeId, inner_markup, parse_fragment};
use crate::error::{EditorError, Result};
use crate::footnotes::FootnoteRegistry;
use crate::plugin::ColorTarget;
use crate::selection::{
    Boundary, SelectionContext, SelectionRange, boundary_at_text_offset, text_offset,
};

/// External undo/redo engine.
///
/// The engine's internals live outside this crate; commands only ask it to
/// step and tell it when a mutation finished.
pub trait History {
    fn undo(&mut self, doc: &mut Document) -> bool;

    fn redo(&mut self, doc: &mut Document) -> bool;

    /// Called after every successful mutating command.
    fn checkpoint(&mut self, _doc: &Document) {}
}

/// Identifies a command waiting on secondary UI.
pub type PendingId = u64;

/// What a plugin asks the secondary UI for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    Color {
        target: ColorTarget,
        current: Option<String>,
    },
    LinkHref {
        current: Option<String>,
    },
    FootnoteText,
}

/// Host for pickers and prompts.
///
/// For every `open` the host later either calls
/// [`PluginCatalog::complete_pending`](crate::catalog::PluginCatalog::complete_pending)
/// exactly once with the chosen value, or nothing at all on cancellation.
pub trait SecondaryUiHost {
    fn open(&mut self, id: PendingId, request: &UiRequest);
}

/// A command deferred until the secondary UI answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub id: PendingId,
    pub plugin: SmolStr,
    pub request: UiRequest,
    /// Selection at the time the UI opened, reapplied before completing.
    pub saved: Option<SelectionRange>,
}

/// State captured before a command runs so a failure can be rolled back.
#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    doc: Document,
    selection: SelectionContext,
    footnotes: FootnoteRegistry,
    pending_len: usize,
}

pub struct EditorSession {
    pub(crate) doc: Document,
    pub(crate) root: NodeId,
    pub(crate) selection: SelectionContext,
    pub(crate) footnotes: FootnoteRegistry,
    history: Option<Box<dyn History>>,
    ui_host: Option<Box<dyn SecondaryUiHost>>,
    pending: Vec<PendingCommand>,
    next_pending: PendingId,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("root", &self.root)
            .field("selection", &self.selection)
            .field("footnotes", &self.footnotes.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Wrap an existing tree. `root` must be an element of `doc`.
    pub fn new(doc: Document, root: NodeId, config: &EditorConfig) -> Self {
        let mut footnotes = FootnoteRegistry::new(config.footnote_id_prefix.clone());
        footnotes.rebuild(&doc, root);
        let mut session = Self {
            doc,
            root,
            selection: SelectionContext::new(),
            footnotes,
            history: None,
            ui_host: None,
            pending: Vec::new(),
            next_pending: 1,
        };
        session.ensure_root_block();
        session
    }

    /// Load a markup fragment into a fresh editor root.
    pub fn from_markup(src: &str, config: &EditorConfig) -> Result<Self> {
        let mut doc = Document::new();
        let root = doc.create_element_with("div", [("contenteditable", "true")]);
        parse_fragment(&mut doc, root, src)?;
        Ok(Self::new(doc, root, config))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn selection(&self) -> &SelectionContext {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionContext {
        &mut self.selection
    }

    pub fn footnotes(&self) -> &FootnoteRegistry {
        &self.footnotes
    }

    /// The serialized editor content.
    pub fn markup(&self) -> String {
        inner_markup(&self.doc, self.root)
    }

    pub fn set_history(&mut self, history: impl History + 'static) {
        self.history = Some(Box::new(history));
    }

    pub fn set_ui_host(&mut self, host: impl SecondaryUiHost + 'static) {
        self.ui_host = Some(Box::new(host));
    }

    /// The live selection, validated against the root.
    pub fn range(&self) -> Result<SelectionRange> {
        self.selection.current(&self.doc, self.root)
    }

    pub fn set_selection(&mut self, range: SelectionRange) {
        self.selection.set(range);
    }

    /// Select text by character offsets counted over the whole root.
    pub fn select_text(&mut self, start: usize, end: usize) {
        let anchor = boundary_at_text_offset(&self.doc, self.root, start);
        let focus = boundary_at_text_offset(&self.doc, self.root, end);
        self.selection.set(SelectionRange::new(anchor, focus));
    }

    /// Collapse the selection at a character offset counted over the root.
    pub fn place_caret(&mut self, offset: usize) {
        let at = boundary_at_text_offset(&self.doc, self.root, offset);
        self.selection.set_caret(at);
    }

    /// Run a structural edit, then point the selection back at the same
    /// characters. Boundaries whose node survived are kept as is; the others
    /// are recovered from their text offset.
    pub(crate) fn preserving_selection<T>(
        &mut self,
        edit: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let before = self.selection.get();
        let offsets = before.map(|r| {
            (
                text_offset(&self.doc, self.root, r.anchor),
                text_offset(&self.doc, self.root, r.focus),
            )
        });
        let out = edit(self)?;
        if let (Some(range), Some((anchor_at, focus_at))) = (before, offsets) {
            let fix = |doc: &Document, root: NodeId, b: Boundary, at: usize| {
                if doc.contains(root, b.node) && b.offset <= doc.node_len(b.node) {
                    b
                } else {
                    boundary_at_text_offset(doc, root, at)
                }
            };
            let anchor = fix(&self.doc, self.root, range.anchor, anchor_at);
            let focus = fix(&self.doc, self.root, range.focus, focus_at);
            self.selection.set(SelectionRange::new(anchor, focus));
        }
        Ok(out)
    }

    /// Give the root a block child if it has none, wrapping stray inline
    /// content in a paragraph.
    pub fn ensure_root_block(&mut self) {
        let root = self.root;
        let has_block = self.doc.children(root).iter().any(|&c| {
            self.doc.tag(c).is_some_and(is_block_level)
        });
        if has_block {
            return;
        }
        let p = self.doc.create_element("p");
        self.doc.move_children(root, p);
        self.doc.append_child(root, p);
        if self.range().is_err() && self.selection.get().is_some() {
            self.selection.set_caret(Boundary::new(p, 0));
        }
        tracing::trace!(target: "plume::session", "wrapped root content in a paragraph");
    }

    // === History ===

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(true)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(false)
    }

    fn step_history(&mut self, back: bool) -> bool {
        let Some(history) = self.history.as_mut() else {
            return false;
        };
        let stepped = if back {
            history.undo(&mut self.doc)
        } else {
            history.redo(&mut self.doc)
        };
        if stepped {
            // The engine swapped content under us; resync derived state.
            self.footnotes.rebuild(&self.doc, self.root);
            if self.range().is_err() {
                let at = boundary_at_text_offset(&self.doc, self.root, 0);
                self.selection.set_caret(at);
            }
        }
        stepped
    }

    pub(crate) fn checkpoint(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.checkpoint(&self.doc);
        }
    }

    // === Secondary UI ===

    /// Save the selection and ask the host for input.
    ///
    /// Returns `None` when no host is attached. Calling this again while a
    /// request is open creates a second, independent pending command.
    pub(crate) fn open_secondary_ui(
        &mut self,
        plugin: &str,
        request: UiRequest,
    ) -> Option<PendingId> {
        if self.ui_host.is_none() {
            tracing::debug!(target: "plume::session", plugin, "no secondary UI host attached");
            return None;
        }
        let id = self.next_pending;
        self.next_pending += 1;
        let saved = self.selection.save();
        self.pending.push(PendingCommand {
            id,
            plugin: SmolStr::new(plugin),
            request: request.clone(),
            saved,
        });
        if let Some(host) = self.ui_host.as_mut() {
            host.open(id, &request);
        }
        tracing::debug!(target: "plume::session", plugin, id, "opened secondary UI");
        Some(id)
    }

    pub fn pending(&self) -> &[PendingCommand] {
        &self.pending
    }

    pub(crate) fn take_pending(&mut self, id: PendingId) -> Option<PendingCommand> {
        let pos = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(pos))
    }

    // === Rollback ===

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
            footnotes: self.footnotes.clone(),
            pending_len: self.pending.len(),
        }
    }

    pub(crate) fn rollback(&mut self, snapshot: SessionSnapshot) {
        self.doc = snapshot.doc;
        self.selection = snapshot.selection;
        self.footnotes = snapshot.footnotes;
        self.pending.truncate(snapshot.pending_len);
    }

    /// Node a plugin expects to exist, as an error if it was removed.
    pub(crate) fn attached(&self, node: NodeId) -> Result<NodeId> {
        if self.doc.is_valid(node) && self.doc.contains(self.root, node) {
            Ok(node)
        } else {
            Err(EditorError::NodeNotFound(node))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_markup_adds_block_to_bare_text() {
        let session = EditorSession::from_markup("just text", &EditorConfig::default()).unwrap();
        assert_eq!(session.markup(), "<p>just text</p>");
    }

    #[test]
    fn test_from_markup_empty_gets_paragraph() {
        let session = EditorSession::from_markup("", &EditorConfig::default()).unwrap();
        assert_eq!(session.markup(), "<p></p>");
    }

    #[test]
    fn test_select_text_and_range() {
        let mut session =
            EditorSession::from_markup("<p>hello</p><p>world</p>", &EditorConfig::default())
                .unwrap();
        assert!(session.range().is_err());
        session.select_text(2, 7);
        let range = session.range().unwrap();
        let doc = session.document();
        assert_eq!(doc.text(range.anchor.node), Some("hello"));
        assert_eq!(range.anchor.offset, 2);
        assert_eq!(doc.text(range.focus.node), Some("world"));
        assert_eq!(range.focus.offset, 2);
    }

    #[test]
    fn test_rollback_restores_tree() {
        let mut session =
            EditorSession::from_markup("<p>keep</p>", &EditorConfig::default()).unwrap();
        let snapshot = session.snapshot();
        let root = session.root();
        let extra = session.document_mut().create_element("hr");
        session.document_mut().append_child(root, extra);
        session.rollback(snapshot);
        assert_eq!(session.markup(), "<p>keep</p>");
    }

    #[test]
    fn test_undo_without_history_is_noop() {
        let mut session = EditorSession::from_markup("<p>x</p>", &EditorConfig::default()).unwrap();
        assert!(!session.has_history());
        assert!(!session.undo());
    }
}

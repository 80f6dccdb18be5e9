use crate::error::Result;
use crate::plugin::CommandParams;
use crate::selection::{Boundary, SelectionRange};
use crate::session::{EditorSession, UiRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootnoteAction {
    Insert,
    Delete,
}

/// Footnote commands on top of the session's [`FootnoteRegistry`].
///
/// Insert takes the note text as its value; without one it asks the
/// secondary UI. Delete takes a footnote id, or removes the footnote whose
/// reference holds the caret.
///
/// [`FootnoteRegistry`]: crate::footnotes::FootnoteRegistry
#[derive(Debug, Clone)]
pub struct FootnoteCommand {
    action: FootnoteAction,
}

impl FootnoteCommand {
    pub fn new(action: FootnoteAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> FootnoteAction {
        self.action
    }

    /// Active while the caret sits inside a footnote.
    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        session
            .footnotes
            .find_at(&session.doc, range.anchor.node)
            .is_some()
    }

    pub fn execute(
        &self,
        name: &str,
        session: &mut EditorSession,
        params: &CommandParams,
    ) -> Result<bool> {
        match self.action {
            FootnoteAction::Insert => match params.value_str() {
                Some(text) => self.insert(session, text),
                None => {
                    session.range()?;
                    Ok(session
                        .open_secondary_ui(name, UiRequest::FootnoteText)
                        .is_some())
                }
            },
            FootnoteAction::Delete => self.delete(session, params.value_str()),
        }
    }

    /// Place a new footnote at the end of the selection.
    pub(crate) fn insert(&self, session: &mut EditorSession, text: &str) -> Result<bool> {
        let range = session.range()?;
        let at = range.end(&session.doc);
        let root = session.root;
        let (record, after) = session.footnotes.create(&mut session.doc, root, at, text)?;
        session.selection.set(SelectionRange::caret(after));
        tracing::info!(target: "plume::footnotes", id = %record.id, number = record.number, "inserted footnote");
        Ok(true)
    }

    fn delete(&self, session: &mut EditorSession, id: Option<&str>) -> Result<bool> {
        let range = session.range().ok();
        let id = match id {
            Some(id) => id.to_owned(),
            None => {
                let Some(range) = range else {
                    return Ok(false);
                };
                match session.footnotes.find_at(&session.doc, range.anchor.node) {
                    Some(record) => record.id.to_string(),
                    None => return Ok(false),
                }
            }
        };
        let Some(reference) = session.footnotes.get(&id).map(|r| r.reference) else {
            return Ok(false);
        };
        let reference = session.attached(reference)?;

        // A caret inside the removed markup moves to where the reference was.
        let fallback = Boundary::before(&session.doc, reference);
        let caret_inside = range.is_some_and(|r| {
            session.doc.contains(reference, r.anchor.node)
                || session.footnotes.find_at(&session.doc, r.anchor.node).is_some_and(|f| f.id == id)
        });

        let root = session.root;
        if !session.footnotes.delete(&mut session.doc, root, &id) {
            return Ok(false);
        }
        if caret_inside && let Some(at) = fallback {
            session.selection.set_caret(at);
        }
        tracing::info!(target: "plume::footnotes", %id, "deleted footnote");
        Ok(true)
    }
}

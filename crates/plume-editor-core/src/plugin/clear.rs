use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::tags::{INLINE_FORMATTING_TAGS, KEPT_ATTRIBUTES, STRUCTURAL_TAGS};
use crate::dom::{Document, NodeId};
use crate::error::{EditorError, Result};
use crate::footnotes::is_footnote_markup;
use crate::mutate::{
    Rewrite, TreeRewriter, block_segments, isolate_range, normalize, range_over, rewrite,
};
use crate::plugin::CommandParams;
use crate::selection::{Boundary, SelectionRange, boundary_at_text_offset, text_offset};
use crate::session::EditorSession;

/// How much formatting `clearFormatting` strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearMode {
    /// Drop inline `style` attributes only.
    Light,
    /// Unwrap inline formatting and keep only a small attribute allowlist.
    #[default]
    Medium,
    /// Keep structural elements and text, nothing else.
    Full,
}

impl fmt::Display for ClearMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClearMode::Light => "light",
            ClearMode::Medium => "medium",
            ClearMode::Full => "full",
        })
    }
}

impl FromStr for ClearMode {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ClearMode::Light),
            "medium" => Ok(ClearMode::Medium),
            "full" => Ok(ClearMode::Full),
            other => Err(EditorError::unsupported(format!("unknown clear mode '{other}'"))),
        }
    }
}

struct ModeRewriter(ClearMode);

impl TreeRewriter for ModeRewriter {
    fn classify(&self, doc: &Document, element: NodeId) -> Rewrite {
        // Footnote markers and other non-editable islands are left alone.
        if is_footnote_markup(doc, element) || doc.attr(element, "contenteditable") == Some("false") {
            return Rewrite::Verbatim;
        }
        let tag = doc.tag(element).unwrap_or_default();
        match self.0 {
            ClearMode::Light => Rewrite::Keep,
            ClearMode::Medium if INLINE_FORMATTING_TAGS.contains(&tag) => Rewrite::Unwrap,
            ClearMode::Medium => Rewrite::Keep,
            ClearMode::Full if STRUCTURAL_TAGS.contains(&tag) => Rewrite::Keep,
            ClearMode::Full => Rewrite::TextOnly,
        }
    }

    fn keep_attr(&self, _tag: &str, name: &str) -> bool {
        match self.0 {
            ClearMode::Light => name != "style",
            ClearMode::Medium => KEPT_ATTRIBUTES.contains(&name),
            ClearMode::Full => false,
        }
    }
}

/// Strips formatting from the selection, or from the whole document when the
/// selection is collapsed.
///
/// The cleaned content is built as detached copies and swapped in only once
/// the whole rewrite succeeded.
#[derive(Debug, Clone)]
pub struct ClearFormatting {
    mode: ClearMode,
    max_depth: usize,
}

impl ClearFormatting {
    pub fn new(mode: ClearMode, max_depth: usize) -> Self {
        Self { mode, max_depth }
    }

    pub fn mode(&self) -> ClearMode {
        self.mode
    }

    pub fn execute(&self, session: &mut EditorSession, params: &CommandParams) -> Result<bool> {
        let mode = match params.value_str() {
            Some(value) => value.parse()?,
            None => self.mode,
        };
        let range = session.range()?;
        let rewriter = ModeRewriter(mode);
        if range.is_collapsed() {
            self.clear_document(session, range, &rewriter)?;
        } else {
            self.clear_range(session, range, &rewriter)?;
        }
        // Protected footnote markup was copied, so the registry's node ids are stale.
        session.footnotes.rebuild(&session.doc, session.root);
        tracing::debug!(target: "plume::format", %mode, collapsed = range.is_collapsed(), "cleared formatting");
        Ok(true)
    }

    fn clear_document(
        &self,
        session: &mut EditorSession,
        caret: SelectionRange,
        rewriter: &ModeRewriter,
    ) -> Result<()> {
        let root = session.root;
        let doc = &mut session.doc;
        let at = text_offset(doc, root, caret.anchor);

        let mut cleaned = Vec::new();
        for child in doc.children(root).to_vec() {
            cleaned.extend(rewrite(doc, child, rewriter, self.max_depth)?);
        }
        doc.take_children(root);
        for node in cleaned {
            doc.append_child(root, node);
        }

        let mut selection = None;
        normalize(doc, root, &mut selection);
        let caret = boundary_at_text_offset(doc, root, at);
        session.selection.set_caret(caret);
        Ok(())
    }

    fn clear_range(
        &self,
        session: &mut EditorSession,
        range: SelectionRange,
        rewriter: &ModeRewriter,
    ) -> Result<()> {
        let root = session.root;
        let doc = &mut session.doc;

        // Isolate and rewrite every block's share first; nothing is swapped
        // in until all of them succeeded.
        let mut pending = Vec::new();
        for segment in block_segments(doc, root, &range) {
            let isolated = isolate_range(doc, segment.start, segment.end, segment.block, true)?;
            let mut cleaned = Vec::new();
            for &node in &isolated.nodes {
                cleaned.extend(rewrite(doc, node, rewriter, self.max_depth)?);
            }
            pending.push((isolated, cleaned));
        }

        let mut cleared: Vec<SelectionRange> = Vec::new();
        for (isolated, cleaned) in pending {
            let container = isolated.parent;
            for &node in &isolated.nodes {
                doc.detach(node);
            }
            for (offset, &node) in cleaned.iter().enumerate() {
                doc.insert_child(container, isolated.index + offset, node);
            }
            let mut selection = range_over(doc, &cleaned).or(Some(SelectionRange::caret(
                Boundary::new(container, isolated.index),
            )));
            normalize(doc, container, &mut selection);
            cleared.extend(selection);
        }

        if let (Some(first), Some(last)) = (cleared.first(), cleared.last()) {
            session
                .selection
                .set(SelectionRange::new(first.anchor, last.focus));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn session(src: &str) -> EditorSession {
        EditorSession::from_markup(src, &EditorConfig::default()).unwrap()
    }

    fn clear(mode: ClearMode) -> ClearFormatting {
        ClearFormatting::new(mode, 64)
    }

    #[test]
    fn test_full_on_collapsed_selection_clears_document() {
        let mut s = session(r#"<p><span style="color:red"><strong>Hi</strong></span> there</p>"#);
        s.place_caret(1);
        clear(ClearMode::Full).execute(&mut s, &CommandParams::none()).unwrap();
        assert_eq!(s.markup(), "<p>Hi there</p>");
        let caret = s.range().unwrap();
        assert!(caret.is_collapsed());
        assert_eq!(caret.anchor.offset, 1);
    }

    #[test]
    fn test_medium_unwraps_inline_and_filters_attrs() {
        let mut s = session(
            r#"<p class="lead" style="color: red"><em>a</em> <a href="/x" class="btn">b</a></p>"#,
        );
        s.select_text(0, 3);
        clear(ClearMode::Medium).execute(&mut s, &CommandParams::none()).unwrap();
        let markup = s.markup();
        assert_eq!(markup, r#"<p class="lead" style="color: red">a <a href="/x">b</a></p>"#);
        let doc = s.document();
        let leftover = doc
            .descendants(s.root())
            .into_iter()
            .filter(|&n| doc.tag(n).is_some_and(|t| INLINE_FORMATTING_TAGS.contains(&t)))
            .count();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn test_light_strips_only_style() {
        let mut s = session(r#"<p><strong style="color: red" title="t">x</strong></p>"#);
        s.select_text(0, 1);
        clear(ClearMode::Light).execute(&mut s, &CommandParams::none()).unwrap();
        assert_eq!(s.markup(), r#"<p><strong title="t">x</strong></p>"#);
    }

    #[test]
    fn test_partial_range_keeps_outside_formatting() {
        let mut s = session("<p><strong>abcd</strong></p>");
        s.select_text(1, 3);
        clear(ClearMode::Medium).execute(&mut s, &CommandParams::none()).unwrap();
        assert_eq!(s.markup(), "<p><strong>a</strong>bc<strong>d</strong></p>");
    }

    #[test]
    fn test_mode_from_params() {
        let mut s = session("<p><em>x</em></p>");
        s.place_caret(0);
        clear(ClearMode::Light)
            .execute(&mut s, &CommandParams::value("full"))
            .unwrap();
        assert_eq!(s.markup(), "<p>x</p>");
        assert!(
            clear(ClearMode::Light)
                .execute(&mut s, &CommandParams::value("nuclear"))
                .is_err()
        );
    }

    #[test]
    fn test_full_keeps_footnote_markup() {
        let mut s = session("<p><em>text</em></p>");
        s.place_caret(2);
        let at = s.range().unwrap().anchor;
        let root = s.root();
        s.footnotes.create(&mut s.doc, root, at, "note").unwrap();
        let section_before = crate::dom::outer_markup(s.document(), s.document().children(root)[1]);

        clear(ClearMode::Full).execute(&mut s, &CommandParams::none()).unwrap();
        let doc = s.document();
        assert_eq!(crate::dom::outer_markup(doc, doc.children(root)[1]), section_before);
        assert_eq!(s.footnotes().len(), 1);
        assert!(s.footnotes().integrity_report(doc, root).is_empty());
        assert!(s.markup().starts_with(r#"<p>te<sup class="footnote-ref""#));
    }

    #[test]
    fn test_depth_limit_leaves_tree_untouched() {
        let mut s = session("<p><span><span><span><span>deep</span></span></span></span></p>");
        let before = s.markup();
        s.place_caret(0);
        let result = ClearFormatting::new(ClearMode::Medium, 2).execute(&mut s, &CommandParams::none());
        assert!(matches!(result, Err(EditorError::DepthExceeded(2))));
        assert_eq!(s.markup(), before);
    }
}

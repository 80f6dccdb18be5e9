use crate::dom::style::{parse_px, remove_style_property, set_style_property, style_property};
use crate::dom::tags::BLOCK_TAGS;
use crate::error::Result;
use crate::mutate::selected_blocks;
use crate::session::EditorSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentDirection {
    Indent,
    Outdent,
}

/// Adjusts `margin-left` on the selected blocks in fixed steps.
#[derive(Debug, Clone)]
pub struct Indent {
    direction: IndentDirection,
    step: u32,
    max: u32,
}

impl Indent {
    pub fn new(direction: IndentDirection, step: u32, max: u32) -> Self {
        Self {
            direction,
            step,
            max,
        }
    }

    pub fn direction(&self) -> IndentDirection {
        self.direction
    }

    fn next(&self, current: u32) -> u32 {
        match self.direction {
            IndentDirection::Indent => current.saturating_add(self.step).min(self.max),
            IndentDirection::Outdent => current.saturating_sub(self.step),
        }
    }

    /// Returns false when no block's margin changed, e.g. outdenting blocks
    /// that are already flush.
    pub fn execute(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let blocks = selected_blocks(&session.doc, session.root, &range, BLOCK_TAGS);
        let doc = &mut session.doc;
        let mut changed = 0;
        for block in blocks {
            let current = style_property(doc, block, "margin-left")
                .and_then(|v| parse_px(&v))
                .unwrap_or(0);
            let next = self.next(current);
            if next == current {
                continue;
            }
            if next == 0 {
                remove_style_property(doc, block, "margin-left");
            } else {
                set_style_property(doc, block, "margin-left", &format!("{next}px"));
            }
            changed += 1;
        }
        tracing::debug!(target: "plume::format", direction = ?self.direction, changed, "indent");
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn session(src: &str) -> EditorSession {
        let mut s = EditorSession::from_markup(src, &EditorConfig::default()).unwrap();
        s.place_caret(0);
        s
    }

    #[test]
    fn test_indent_and_outdent() {
        let mut s = session("<p>x</p>");
        let indent = Indent::new(IndentDirection::Indent, 40, 400);
        let outdent = Indent::new(IndentDirection::Outdent, 40, 400);

        assert!(indent.execute(&mut s).unwrap());
        assert!(indent.execute(&mut s).unwrap());
        assert_eq!(s.markup(), r#"<p style="margin-left: 80px">x</p>"#);

        assert!(outdent.execute(&mut s).unwrap());
        assert!(outdent.execute(&mut s).unwrap());
        assert_eq!(s.markup(), "<p>x</p>");
        assert!(!outdent.execute(&mut s).unwrap());
    }

    #[test]
    fn test_indent_clamps_at_max() {
        let mut s = session(r#"<p style="margin-left: 70px">x</p>"#);
        let indent = Indent::new(IndentDirection::Indent, 40, 80);
        assert!(indent.execute(&mut s).unwrap());
        assert_eq!(s.markup(), r#"<p style="margin-left: 80px">x</p>"#);
        assert!(!indent.execute(&mut s).unwrap());
    }
}

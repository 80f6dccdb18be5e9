use smol_str::SmolStr;

use crate::dom::tags::FORMAT_BLOCK_TAGS;
use crate::error::Result;
use crate::mutate::{find_block_ancestor, selected_blocks};
use crate::session::EditorSession;

/// Turns the selected blocks into paragraphs, headings, quotes or
/// preformatted blocks.
///
/// Running a non-paragraph format over blocks that already have it turns
/// them back into paragraphs.
#[derive(Debug, Clone)]
pub struct BlockFormat {
    tag: SmolStr,
}

impl BlockFormat {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        let doc = &session.doc;
        find_block_ancestor(doc, range.start(doc).node, session.root, FORMAT_BLOCK_TAGS)
            .is_some_and(|block| doc.has_tag(block, &self.tag))
    }

    pub fn execute(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let blocks = selected_blocks(&session.doc, session.root, &range, FORMAT_BLOCK_TAGS);
        if blocks.is_empty() {
            return Ok(false);
        }

        let all_set = blocks.iter().all(|&b| session.doc.has_tag(b, &self.tag));
        let target: &str = if all_set && self.tag != "p" { "p" } else { &self.tag };

        session.preserving_selection(|s| {
            for &block in &blocks {
                if s.doc.has_tag(block, "li") {
                    // List items keep their role; the format goes inside.
                    if target == "p" {
                        continue;
                    }
                    let inner = s.doc.create_element(target);
                    s.doc.move_children(block, inner);
                    s.doc.append_child(block, inner);
                } else {
                    s.doc.set_tag(block, target);
                }
            }
            Ok(())
        })?;
        tracing::debug!(target: "plume::format", tag = target, count = blocks.len(), "set block format");
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

    #[test]
    fn test_heading_toggles_back_to_paragraph() {
        let mut s = session("<p>title</p><p>body</p>");
        s.place_caret(2);
        let h1 = BlockFormat::new("h1");
        assert!(!h1.is_active(&s));
        h1.execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<h1>title</h1><p>body</p>");
        assert!(h1.is_active(&s));

        h1.execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p>title</p><p>body</p>");
    }

    #[test]
    fn test_applies_to_every_selected_block() {
        let mut s = session("<p>one</p><h2>two</h2><p>three</p>");
        s.select_text(1, 5);
        BlockFormat::new("blockquote").execute(&mut s).unwrap();
        assert_eq!(
            s.markup(),
            "<blockquote>one</blockquote><blockquote>two</blockquote><p>three</p>"
        );
    }

    #[test]
    fn test_preformatted_reverts() {
        let mut s = session("<p>code</p>");
        s.place_caret(0);
        let pre = BlockFormat::new("pre");
        pre.execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<pre>code</pre>");
        assert!(pre.is_active(&s));
        pre.execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<p>code</p>");
    }

    #[test]
    fn test_list_item_gets_inner_block() {
        let mut s = session("<ul><li>item</li></ul>");
        s.place_caret(1);
        BlockFormat::new("h3").execute(&mut s).unwrap();
        assert_eq!(s.markup(), "<ul><li><h3>item</h3></li></ul>");
    }
}

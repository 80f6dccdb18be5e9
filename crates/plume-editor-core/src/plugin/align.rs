use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::style::{set_style_property, style_property};
use crate::dom::tags::BLOCK_TAGS;
use crate::error::{EditorError, Result};
use crate::mutate::{block_ancestor, selected_blocks};
use crate::session::EditorSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" | "end" => Ok(Alignment::Right),
            "justify" => Ok(Alignment::Justify),
            other => Err(EditorError::unsupported(format!("unknown alignment '{other}'"))),
        }
    }
}

/// Sets `text-align` on every selected block.
#[derive(Debug, Clone)]
pub struct AlignmentFormat {
    value: Alignment,
}

impl AlignmentFormat {
    pub fn new(value: Alignment) -> Self {
        Self { value }
    }

    pub fn alignment(&self) -> Alignment {
        self.value
    }

    /// Active when the alignment in effect at the selection start, inherited
    /// from enclosing blocks, is this one. Unset means left.
    pub fn is_active(&self, session: &EditorSession) -> bool {
        let Ok(range) = session.range() else {
            return false;
        };
        let doc = &session.doc;
        let Some(block) = block_ancestor(doc, range.start(doc).node, session.root) else {
            return self.value == Alignment::Left;
        };
        let effective = std::iter::once(block)
            .chain(doc.ancestors(block))
            .take_while(|&n| n != session.root)
            .find_map(|n| style_property(doc, n, "text-align"))
            .and_then(|v| v.parse::<Alignment>().ok())
            .unwrap_or_default();
        effective == self.value
    }

    pub fn execute(&self, session: &mut EditorSession) -> Result<bool> {
        let range = session.range()?;
        let blocks = selected_blocks(&session.doc, session.root, &range, BLOCK_TAGS);
        if blocks.is_empty() {
            return Ok(false);
        }
        for &block in &blocks {
            set_style_property(&mut session.doc, block, "text-align", self.value.as_str());
        }
        tracing::debug!(target: "plume::format", align = %self.value, count = blocks.len(), "aligned blocks");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    #[test]
    fn test_center_then_active() {
        let mut s = EditorSession::from_markup("<p>a</p><p>b</p>", &EditorConfig::default()).unwrap();
        s.select_text(0, 2);
        let center = AlignmentFormat::new(Alignment::Center);
        let left = AlignmentFormat::new(Alignment::Left);
        assert!(left.is_active(&s));
        assert!(!center.is_active(&s));

        center.execute(&mut s).unwrap();
        assert_eq!(
            s.markup(),
            r#"<p style="text-align: center">a</p><p style="text-align: center">b</p>"#
        );
        assert!(center.is_active(&s));
        assert!(!left.is_active(&s));
    }

    #[test]
    fn test_inherited_alignment() {
        let mut s = EditorSession::from_markup(
            r#"<div style="text-align: right"><p>x</p></div>"#,
            &EditorConfig::default(),
        )
        .unwrap();
        s.place_caret(0);
        assert!(AlignmentFormat::new(Alignment::Right).is_active(&s));
    }

    #[test]
    fn test_parse_alignment() {
        assert_eq!("Center".parse::<Alignment>().unwrap(), Alignment::Center);
        assert!("diagonal".parse::<Alignment>().is_err());
    }
}

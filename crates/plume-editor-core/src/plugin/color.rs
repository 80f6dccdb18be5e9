use serde::{Deserialize, Serialize};

use crate::dom::style::{set_style_property, style_property};
use crate::error::{EditorError, Result};
use crate::mutate::{
    contents_between, find_ancestor, insert_at_boundary, normalize, wrap_range_inline,
};
use crate::plugin::CommandParams;
use crate::selection::Boundary;
use crate::session::{EditorSession, UiRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTarget {
    Foreground,
    Background,
}

impl ColorTarget {
    pub fn property(self) -> &'static str {
        match self {
            ColorTarget::Foreground => "color",
            ColorTarget::Background => "background-color",
        }
    }
}

/// Text or highlight colour, chosen directly or through a picker.
#[derive(Debug, Clone)]
pub struct ColorFormat {
    target: ColorTarget,
    marker: char,
}

impl ColorFormat {
    pub fn new(target: ColorTarget, marker: char) -> Self {
        Self { target, marker }
    }

    pub fn target(&self) -> ColorTarget {
        self.target
    }

    /// Colour in effect at the selection anchor, if any.
    pub fn current(&self, session: &EditorSession) -> Option<String> {
        let range = session.range().ok()?;
        let doc = &session.doc;
        let property = self.target.property();
        let holder = find_ancestor(doc, range.anchor.node, session.root, |doc, n| {
            style_property(doc, n, property).is_some()
        })?;
        style_property(doc, holder, property)
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        self.current(session).is_some()
    }

    pub fn execute(
        &self,
        name: &str,
        session: &mut EditorSession,
        params: &CommandParams,
    ) -> Result<bool> {
        if let Some(value) = params.value_str() {
            return self.apply(session, value);
        }
        session.range()?;
        let request = UiRequest::Color {
            target: self.target,
            current: self.current(session),
        };
        Ok(session.open_secondary_ui(name, request).is_some())
    }

    /// Colour the live selection.
    pub(crate) fn apply(&self, session: &mut EditorSession, value: &str) -> Result<bool> {
        let value = validate_color(value)?;
        let range = session.range()?;
        let property = self.target.property();
        let root = session.root;
        let doc = &mut session.doc;

        if range.is_collapsed() {
            let span = doc.create_element("span");
            set_style_property(doc, span, property, value);
            let marker = doc.create_text(&self.marker.to_string());
            doc.append_child(span, marker);
            insert_at_boundary(doc, range.anchor, span)?;
            session.selection.set_caret(Boundary::new(marker, 1));
        } else {
            let spans = wrap_range_inline(doc, root, &range, |d| {
                let span = d.create_element("span");
                set_style_property(d, span, property, value);
                span
            })?;
            let (Some(&first), Some(&last)) = (spans.first(), spans.last()) else {
                return Ok(false);
            };
            let mut selection = Some(contents_between(doc, first, last));
            for &span in &spans {
                normalize(doc, span, &mut selection);
            }
            if let Some(selection) = selection {
                session.selection.set(selection);
            }
        }
        tracing::debug!(target: "plume::format", property, value, "applied colour");
        Ok(true)
    }
}

/// Reject values that could break out of a style declaration.
fn validate_color(value: &str) -> Result<&str> {
    let value = value.trim();
    let bad = value.is_empty() || value.contains([';', '"', '<', '>', '{', '}']);
    if bad {
        return Err(EditorError::unsupported(format!("invalid colour value '{value}'")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn session(src: &str) -> EditorSession {
        EditorSession::from_markup(src, &EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_apply_wraps_in_styled_span() {
        let mut s = session("<p>red text</p>");
        s.select_text(0, 3);
        let color = ColorFormat::new(ColorTarget::Foreground, '\u{200B}');
        assert!(!color.is_active(&s));
        color
            .execute("textColor", &mut s, &CommandParams::value("#ff0000"))
            .unwrap();
        assert_eq!(
            s.markup(),
            r#"<p><span style="color: #ff0000">red</span> text</p>"#
        );
        assert!(color.is_active(&s));
        assert_eq!(color.current(&s).as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_rejects_style_injection() {
        let mut s = session("<p>x</p>");
        s.select_text(0, 1);
        let color = ColorFormat::new(ColorTarget::Background, '\u{200B}');
        assert!(
            color
                .execute("highlightColor", &mut s, &CommandParams::value("red; position: fixed"))
                .is_err()
        );
    }
}

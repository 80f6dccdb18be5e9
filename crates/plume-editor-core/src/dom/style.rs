//! Inline `style` attribute access.

use super::{Document, NodeId};

/// Parsed `style` attribute, declarations in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDecl {
    entries: Vec<(String, String)>,
}

impl StyleDecl {
    pub fn parse(source: &str) -> Self {
        let entries = source
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_owned()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => value.clone_into(v),
            None => self.entries.push((name.to_owned(), value.to_owned())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for StyleDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

pub fn style_of(doc: &Document, id: NodeId) -> StyleDecl {
    doc.attr(id, "style").map(StyleDecl::parse).unwrap_or_default()
}

pub fn style_property(doc: &Document, id: NodeId, name: &str) -> Option<String> {
    style_of(doc, id).get(name).map(str::to_owned)
}

/// Write back a declaration, dropping the attribute when it is empty.
fn store(doc: &mut Document, id: NodeId, style: StyleDecl) {
    if style.is_empty() {
        doc.remove_attr(id, "style");
    } else {
        doc.set_attr(id, "style", &style.to_string());
    }
}

pub fn set_style_property(doc: &mut Document, id: NodeId, name: &str, value: &str) {
    let mut style = style_of(doc, id);
    style.set(name, value);
    store(doc, id, style);
}

pub fn remove_style_property(doc: &mut Document, id: NodeId, name: &str) -> Option<String> {
    let mut style = style_of(doc, id);
    let removed = style.remove(name);
    store(doc, id, style);
    removed
}

/// Parse a CSS pixel length such as `40px` or `40`.
pub fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f32>().ok().map(|n| n.max(0.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let style = StyleDecl::parse("color: red;  TEXT-ALIGN:center;;bogus");
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("text-align"), Some("center"));
        assert_eq!(style.to_string(), "color: red; text-align: center");
    }

    #[test]
    fn test_remove_last_property_drops_attribute() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        set_style_property(&mut doc, p, "margin-left", "40px");
        assert_eq!(doc.attr(p, "style"), Some("margin-left: 40px"));
        remove_style_property(&mut doc, p, "margin-left");
        assert!(!doc.has_attr(p, "style"));
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("40px"), Some(40));
        assert_eq!(parse_px(" 12.6 "), Some(13));
        assert_eq!(parse_px("auto"), None);
    }
}

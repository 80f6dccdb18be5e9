//! Markup fragment reader and writer.
//!
//! The reader understands the element/text/comment
//! subset the editor produces and stores, decodes the common character
//! references, and reports structural problems with a labelled source span.

use miette::{Diagnostic, NamedSource, SourceSpan};
use pulldown_cmark_escape::{escape_href, escape_html, escape_html_body_text};

use super::tags::is_void;
use super::{Document, NodeData, NodeId};

/// Structural problem found while reading a fragment.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("malformed markup: {kind}")]
#[diagnostic(code(plume::markup))]
pub struct MarkupError {
    kind: MarkupErrorKind,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    advice: Option<String>,
}

impl MarkupError {
    fn new(kind: MarkupErrorKind, src: &str, offset: usize, len: usize) -> Self {
        let advice = match &kind {
            MarkupErrorKind::UnmatchedClose(tag) => {
                Some(format!("remove the stray </{tag}> or add the opening tag"))
            }
            MarkupErrorKind::UnterminatedTag => Some("close the tag with '>'".to_owned()),
            MarkupErrorKind::UnterminatedComment => Some("close the comment with '-->'".to_owned()),
        };
        Self {
            kind,
            src: NamedSource::new("fragment", src.to_owned()),
            span: SourceSpan::new(offset.into(), len),
            advice,
        }
    }

    pub fn kind(&self) -> &MarkupErrorKind {
        &self.kind
    }

    /// Byte offset of the problem in the source.
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MarkupErrorKind {
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("closing tag </{0}> has no matching opening tag")]
    UnmatchedClose(String),
    #[error("unterminated comment")]
    UnterminatedComment,
}

/// Parse `src` and append the resulting nodes to `parent`.
///
/// Unclosed elements are closed implicitly at the end of input; a closing tag
/// that matches nothing open is an error.
pub fn parse_fragment(doc: &mut Document, parent: NodeId, src: &str) -> Result<(), MarkupError> {
    let bytes = src.as_bytes();
    let mut stack = vec![parent];
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &src[i..];
        let next = bytes.get(i + 1).copied();

        let is_markup = rest.starts_with("<!")
            || next == Some(b'/')
            || next.is_some_and(|b| b.is_ascii_alphabetic());
        if !is_markup {
            i += 1;
            continue;
        }

        flush_text(doc, &stack, &src[text_start..i]);

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .ok_or_else(|| MarkupError::new(MarkupErrorKind::UnterminatedComment, src, i, 4))?;
            i += 4 + end + 3;
        } else if rest.starts_with("<!") {
            let end = rest
                .find('>')
                .ok_or_else(|| MarkupError::new(MarkupErrorKind::UnterminatedTag, src, i, 2))?;
            i += end + 1;
        } else if next == Some(b'/') {
            let end = rest
                .find('>')
                .ok_or_else(|| MarkupError::new(MarkupErrorKind::UnterminatedTag, src, i, 2))?;
            let name = rest[2..end].trim().to_ascii_lowercase();
            // The fragment parent (index 0) is never closed by markup.
            let open = stack
                .iter()
                .rposition(|&n| n != parent && doc.tag(n) == Some(name.as_str()));
            match open {
                Some(pos) => stack.truncate(pos),
                None => {
                    return Err(MarkupError::new(
                        MarkupErrorKind::UnmatchedClose(name),
                        src,
                        i,
                        end + 1,
                    ));
                }
            }
            i += end + 1;
        } else {
            let (element, self_closing, consumed) = parse_open_tag(doc, src, i)?;
            let current = *stack.last().unwrap_or(&parent);
            doc.append_child(current, element);
            let tag_is_void = doc.tag(element).is_some_and(is_void);
            if !self_closing && !tag_is_void {
                stack.push(element);
            }
            i += consumed;
        }
        text_start = i;
    }
    flush_text(doc, &stack, &src[text_start..]);
    Ok(())
}

fn flush_text(doc: &mut Document, stack: &[NodeId], raw: &str) {
    if raw.is_empty() {
        return;
    }
    // Source formatting between tags, not content.
    if raw.trim().is_empty() && raw.contains('\n') {
        return;
    }
    let Some(&parent) = stack.last() else {
        return;
    };
    let text = decode_entities(raw);
    let node = doc.create_text(&text);
    doc.append_child(parent, node);
}

/// Parse `<tag attr=...>` starting at `start`. Returns the new detached element,
/// whether it was self-closing, and the number of bytes consumed.
fn parse_open_tag(
    doc: &mut Document,
    src: &str,
    start: usize,
) -> Result<(NodeId, bool, usize), MarkupError> {
    let bytes = src.as_bytes();
    let unterminated = || MarkupError::new(MarkupErrorKind::UnterminatedTag, src, start, 1);

    let mut i = start + 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let element = doc.create_element(&src[start + 1..i]);

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(unterminated()),
            Some(b'>') => return Ok((element, false, i + 1 - start)),
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                return Ok((element, true, i + 2 - start));
            }
            Some(b'/') => {
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = &src[name_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let close = src[i + 1..]
                        .find(quote as char)
                        .ok_or_else(unterminated)?;
                    value = decode_entities(&src[i + 1..i + 1 + close]);
                    i += close + 2;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&src[value_start..i]);
                }
                None => return Err(unterminated()),
            }
        }
        if !name.is_empty() {
            doc.set_attr(element, name, &value);
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':'
}

/// Decode the character references the editor emits plus numeric ones.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// URL-valued attributes go through href escaping, everything else through
/// plain HTML escaping.
fn escape_attr(name: &str, value: &str, out: &mut String) {
    let Ok(()) = (if matches!(name, "href" | "src") {
        escape_href(&mut *out, value)
    } else {
        escape_html(&mut *out, value)
    }) else {
        unreachable!("writing to a String cannot fail")
    };
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        NodeData::Text(text) => {
            let Ok(()) = escape_html_body_text(&mut *out, text) else {
                unreachable!("writing to a String cannot fail")
            };
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(name, value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(&el.tag) {
                return;
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

/// Serialize `id` including its own tag.
pub fn outer_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serialize the children of `id`.
pub fn inner_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(src: &str) -> String {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        parse_fragment(&mut doc, root, src).expect("parse");
        inner_markup(&doc, root)
    }

    #[test]
    fn test_nested_elements() {
        let src = r#"<p class="lead">hello <strong>bold</strong> world</p>"#;
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn test_void_and_self_closing() {
        assert_eq!(round_trip("<p>a<br>b</p><hr/>"), "<p>a<br>b</p><hr>");
        assert_eq!(
            round_trip(r#"<img src="x.png" alt='pic'>"#),
            r#"<img src="x.png" alt="pic">"#
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(round_trip("<p>a &amp; b &lt;c&gt; &#65;&#x42;</p>"), "<p>a &amp; b &lt;c&gt; AB</p>");
        assert_eq!(decode_entities("&bogus; & done"), "&bogus; & done");
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let link = doc.create_element_with("a", [("href", "/a b?x=1&y=2"), ("title", r#"say "hi" <now>"#)]);
        let text = doc.create_text("1 < 2 \"ok\"");
        doc.append_child(link, text);
        doc.append_child(root, link);
        assert_eq!(
            inner_markup(&doc, root),
            r#"<a href="/a%20b?x=1&amp;y=2" title="say &quot;hi&quot; &lt;now&gt;">1 &lt; 2 "ok"</a>"#
        );
    }

    #[test]
    fn test_comments_and_formatting_whitespace_dropped() {
        assert_eq!(round_trip("<p>a</p>\n  <!-- note -->\n<p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        assert_eq!(round_trip("<p><em>open"), "<p><em>open</em></p>");
    }

    #[test]
    fn test_literal_less_than() {
        assert_eq!(round_trip("<p>1 < 2</p>"), "<p>1 &lt; 2</p>");
    }

    #[test]
    fn test_unmatched_close_is_error() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let err = parse_fragment(&mut doc, root, "<p>a</span></p>").unwrap_err();
        assert_eq!(err.kind(), &MarkupErrorKind::UnmatchedClose("span".into()));
        assert_eq!(err.offset(), 4);
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let err = parse_fragment(&mut doc, root, "<p class=\"x\"").unwrap_err();
        assert_eq!(err.kind(), &MarkupErrorKind::UnterminatedTag);
    }
}

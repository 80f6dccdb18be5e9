//! Tag tables shared by every command.
//!
//! Keeping these in one place means all plugins agree on what counts as a
//! block, an inline format, or a list.

/// Elements a block-level command may target.
pub const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "li",
];

/// Blocks a paragraph/heading command retags and a range is split along.
/// [`BLOCK_TAGS`] plus `pre`, so a preformatted block can be turned back.
pub const FORMAT_BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "li",
];

/// Blocks whose content model is inline-only. Block-level inserts escape them.
pub const INLINE_FLOW_BLOCKS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "pre"];

/// Inline formatting wrappers that MEDIUM clearing removes.
pub const INLINE_FORMATTING_TAGS: &[&str] = &[
    "strong", "b", "em", "i", "u", "s", "strike", "del", "ins", "mark", "span", "font", "sub",
    "sup", "small", "big",
];

/// Elements FULL clearing keeps.
pub const STRUCTURAL_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li",
];

/// Attributes MEDIUM clearing keeps.
pub const KEPT_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title", "id", "name"];

pub const LIST_TAGS: &[&str] = &["ol", "ul"];

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements serialized without a closing tag.
pub const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr", "col", "source"];

/// Elements that occupy block-level flow.
pub const BLOCK_LEVEL_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "li",
    "ul",
    "ol",
    "hr",
    "figure",
    "table",
    "section",
    "article",
];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn is_block_level(tag: &str) -> bool {
    BLOCK_LEVEL_TAGS.contains(&tag)
}

pub fn is_inline_flow_block(tag: &str) -> bool {
    INLINE_FLOW_BLOCKS.contains(&tag)
}

/// Equivalent spellings of an inline format, e.g. `strong` and `b`.
pub fn format_aliases(tag: &str) -> &'static [&'static str] {
    match tag {
        "strong" | "b" => &["strong", "b"],
        "em" | "i" => &["em", "i"],
        "s" | "strike" | "del" => &["s", "strike", "del"],
        "u" => &["u"],
        "sup" => &["sup"],
        "sub" => &["sub"],
        "code" => &["code"],
        "mark" => &["mark"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_blocks_extend_block_tags_with_pre() {
        for tag in BLOCK_TAGS {
            assert!(FORMAT_BLOCK_TAGS.contains(tag), "{tag} missing");
        }
        let extra: Vec<_> = FORMAT_BLOCK_TAGS
            .iter()
            .filter(|t| !BLOCK_TAGS.contains(t))
            .collect();
        assert_eq!(extra, [&"pre"]);
        assert!(FORMAT_BLOCK_TAGS.iter().all(|t| is_block_level(t)));
    }
}

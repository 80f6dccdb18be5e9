//! End-to-end command behaviour through the default catalog.

use plume_editor_core::dom::tags::{INLINE_FORMATTING_TAGS, is_block_level};
use plume_editor_core::mutate::find_block_ancestor;
use plume_editor_core::{CommandParams, EditorConfig, EditorSession, PluginCatalog};

fn setup(src: &str) -> (PluginCatalog, EditorSession) {
    let config = EditorConfig::default();
    (
        PluginCatalog::with_builtins(&config),
        EditorSession::from_markup(src, &config).unwrap(),
    )
}

fn run(catalog: &PluginCatalog, s: &mut EditorSession, name: &str) -> bool {
    catalog.execute(name, s, &CommandParams::none())
}

#[test]
fn test_bold_scenario() {
    let (catalog, mut s) = setup("<p>hello world</p>");
    s.select_text(0, 5);
    assert!(run(&catalog, &mut s, "bold"));
    assert_eq!(s.markup(), "<p><strong>hello</strong> world</p>");

    s.place_caret(2);
    assert!(catalog.is_active("bold", &s));
    s.place_caret(8);
    assert!(!catalog.is_active("bold", &s));
}

#[test]
fn test_toggles_round_trip() {
    let original = "<p>one <em>two</em> three</p>";
    for name in ["bold", "underline", "strikethrough", "superscript", "subscript", "code"] {
        let (catalog, mut s) = setup(original);
        s.select_text(0, 13);
        assert!(run(&catalog, &mut s, name), "{name} apply");
        assert_ne!(s.markup(), original, "{name} changed nothing");
        assert!(catalog.is_active(name, &s), "{name} inactive after apply");
        assert!(run(&catalog, &mut s, name), "{name} remove");
        assert_eq!(s.markup(), original, "{name} did not round-trip");
    }
}

#[test]
fn test_full_clear_scenario() {
    let (catalog, mut s) = setup(r#"<p><span style="color:red"><strong>Hi</strong></span> there</p>"#);
    s.place_caret(1);
    assert!(catalog.execute("clearFormatting", &mut s, &CommandParams::value("full")));
    assert_eq!(s.markup(), "<p>Hi there</p>");
}

#[test]
fn test_medium_clear_leaves_no_inline_formatting() {
    let (catalog, mut s) = setup(
        r#"<h2><b>a</b> <i>b <span style="color: red">c</span></i></h2><p><font color="red">d</font> <mark>e</mark> <a href="/x"><u>f</u></a></p>"#,
    );
    s.place_caret(0);
    assert!(run(&catalog, &mut s, "clearFormatting"));

    let doc = s.document();
    let leftover: Vec<_> = doc
        .descendants(s.root())
        .into_iter()
        .filter_map(|n| doc.tag(n))
        .filter(|t| INLINE_FORMATTING_TAGS.contains(t))
        .collect();
    assert!(leftover.is_empty(), "left behind: {leftover:?}");
    assert_eq!(s.markup(), r#"<h2>a b c</h2><p>d e <a href="/x">f</a></p>"#);
}

#[test]
fn test_rule_scenario() {
    let (catalog, mut s) = setup("<p>ABCD</p>");
    s.place_caret(2);
    assert!(run(&catalog, &mut s, "horizontalRule"));
    assert_eq!(s.markup(), "<p>ABCD</p><hr><p></p>");

    let caret = s.range().unwrap();
    assert!(caret.is_collapsed());
    let third = s.document().children(s.root())[2];
    assert_eq!(caret.anchor.node, third);
}

#[test]
fn test_block_ancestor_never_returns_root() {
    let (_, s) = setup("<p>x</p>");
    let doc = s.document();
    let root = s.root();
    assert_eq!(find_block_ancestor(doc, root, root, &["div"]), None);

    let p = doc.children(root)[0];
    let text = doc.children(p)[0];
    assert_eq!(find_block_ancestor(doc, text, root, &["div", "blockquote"]), None);
    assert_eq!(find_block_ancestor(doc, text, root, &["p"]), Some(p));
}

#[test]
fn test_saved_selection_survives_unrelated_edit() {
    let (_, mut s) = setup("<p>first</p><p>second</p>");
    s.select_text(1, 4);
    let saved = s.selection_mut().save().unwrap();

    let root = s.root();
    let doc = s.document_mut();
    let extra = doc.create_element("p");
    let text = doc.create_text("appended");
    doc.append_child(extra, text);
    doc.append_child(root, extra);
    s.place_caret(8);

    assert!(s.selection_mut().restore());
    let restored = s.range().unwrap();
    assert_eq!(restored, saved);
}

#[test]
fn test_heading_toggles_back_to_paragraph() {
    let (catalog, mut s) = setup("<p>title</p><p>body</p>");
    s.place_caret(2);
    assert!(run(&catalog, &mut s, "heading2"));
    assert_eq!(s.markup(), "<h2>title</h2><p>body</p>");
    assert!(catalog.is_active("heading2", &s));
    assert!(run(&catalog, &mut s, "heading2"));
    assert_eq!(s.markup(), "<p>title</p><p>body</p>");
}

#[test]
fn test_list_round_trip() {
    let (catalog, mut s) = setup("<p>a</p><p>b</p>");
    s.select_text(0, 2);
    assert!(run(&catalog, &mut s, "unorderedList"));
    assert_eq!(s.markup(), "<ul><li>a</li><li>b</li></ul>");

    assert!(run(&catalog, &mut s, "orderedList"));
    assert_eq!(s.markup(), "<ol><li>a</li><li>b</li></ol>");

    assert!(run(&catalog, &mut s, "orderedList"));
    assert_eq!(s.markup(), "<p>a</p><p>b</p>");
}

#[test]
fn test_indent_and_align() {
    let (catalog, mut s) = setup("<p>x</p>");
    s.place_caret(0);
    assert!(run(&catalog, &mut s, "indent"));
    assert!(run(&catalog, &mut s, "alignCenter"));
    assert_eq!(s.markup(), r#"<p style="margin-left: 40px; text-align: center">x</p>"#);
    assert!(catalog.is_active("alignCenter", &s));
    assert!(!catalog.is_active("alignLeft", &s));

    assert!(run(&catalog, &mut s, "outdent"));
    assert!(!run(&catalog, &mut s, "outdent"));
    assert_eq!(s.markup(), r#"<p style="text-align: center">x</p>"#);
}

/// No block-level element sits inside an inline wrapper.
fn assert_blocks_not_wrapped(s: &EditorSession) {
    let doc = s.document();
    for node in doc.descendants(s.root()) {
        if !doc.tag(node).is_some_and(is_block_level) {
            continue;
        }
        let wrapped = doc.ancestors(node).any(|a| {
            doc.tag(a)
                .is_some_and(|t| INLINE_FORMATTING_TAGS.contains(&t) || t == "a" || t == "code")
        });
        assert!(!wrapped, "block inside inline wrapper: {}", s.markup());
    }
}

#[test]
fn test_toggle_across_paragraphs_stays_inside_blocks() {
    let (catalog, mut s) = setup("<p>one</p><p>two</p>");
    s.select_text(0, 6);
    assert!(run(&catalog, &mut s, "bold"));
    assert_eq!(s.markup(), "<p><strong>one</strong></p><p><strong>two</strong></p>");
    assert_blocks_not_wrapped(&s);

    assert!(run(&catalog, &mut s, "bold"));
    assert_eq!(s.markup(), "<p>one</p><p>two</p>");
}

#[test]
fn test_partial_toggle_across_blocks_round_trips() {
    let original = "<p>one</p><h2>two</h2><p>three</p>";
    for name in ["bold", "italic", "underline", "code"] {
        let (catalog, mut s) = setup(original);
        s.select_text(1, 8);
        assert!(run(&catalog, &mut s, name), "{name} apply");
        assert_eq!(s.document().children(s.root()).len(), 3, "{name} split a block");
        assert_blocks_not_wrapped(&s);
        assert!(run(&catalog, &mut s, name), "{name} remove");
        assert_eq!(s.markup(), original, "{name} did not round-trip");
    }
}

#[test]
fn test_partial_bold_across_blocks() {
    let (catalog, mut s) = setup("<p>one</p><p>two</p>");
    s.select_text(1, 5);
    assert!(run(&catalog, &mut s, "bold"));
    assert_eq!(s.markup(), "<p>o<strong>ne</strong></p><p><strong>tw</strong>o</p>");
    assert!(run(&catalog, &mut s, "bold"));
    assert_eq!(s.markup(), "<p>one</p><p>two</p>");
}

#[test]
fn test_link_across_blocks() {
    let (catalog, mut s) = setup("<p>one</p><p>two</p>");
    s.select_text(1, 5);
    assert!(catalog.execute("createLink", &mut s, &CommandParams::value("/x")));
    assert_eq!(
        s.markup(),
        r#"<p>o<a href="/x">ne</a></p><p><a href="/x">tw</a>o</p>"#
    );
    assert_blocks_not_wrapped(&s);

    assert!(run(&catalog, &mut s, "unlink"));
    assert_eq!(s.markup(), "<p>one</p><p>two</p>");
}

#[test]
fn test_colour_across_blocks() {
    let (catalog, mut s) = setup("<p>one</p><p>two</p>");
    s.select_text(0, 6);
    assert!(catalog.execute("textColor", &mut s, &CommandParams::value("red")));
    assert_eq!(
        s.markup(),
        r#"<p><span style="color: red">one</span></p><p><span style="color: red">two</span></p>"#
    );
    assert_blocks_not_wrapped(&s);
}

#[test]
fn test_range_clear_across_blocks_keeps_paragraphs() {
    let (catalog, mut s) = setup("<p><b>one</b></p><p><i>two</i></p>");
    s.select_text(1, 5);
    assert!(run(&catalog, &mut s, "clearFormatting"));
    assert_eq!(s.markup(), "<p><b>o</b>ne</p><p>tw<i>o</i></p>");
}

#[test]
fn test_full_clear_across_three_blocks() {
    let (catalog, mut s) = setup(
        r#"<p><em>a</em>b</p><blockquote><p><u>c</u></p></blockquote><h3><span style="color: red">d</span>e</h3>"#,
    );
    s.select_text(0, 5);
    assert!(catalog.execute("clearFormatting", &mut s, &CommandParams::value("full")));
    assert_eq!(
        s.markup(),
        "<p>ab</p><blockquote><p>c</p></blockquote><h3>de</h3>"
    );
}

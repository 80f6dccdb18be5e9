use plume_editor_core::{
    Boundary, CommandParams, EditorConfig, EditorSession, PluginCatalog, SelectionRange,
};

fn setup(src: &str) -> (PluginCatalog, EditorSession) {
    let config = EditorConfig::default();
    (
        PluginCatalog::with_builtins(&config),
        EditorSession::from_markup(src, &config).unwrap(),
    )
}

fn insert_at(catalog: &PluginCatalog, s: &mut EditorSession, offset: usize, text: &str) {
    s.place_caret(offset);
    assert!(catalog.execute("insertFootnote", s, &CommandParams::value(text)));
}

/// "one1 two2 three3" with notes A, B, C.
fn three_notes() -> (PluginCatalog, EditorSession) {
    let (catalog, mut s) = setup("<p>one two three</p>");
    insert_at(&catalog, &mut s, 3, "A");
    insert_at(&catalog, &mut s, 8, "B");
    insert_at(&catalog, &mut s, 15, "C");
    (catalog, s)
}

fn numbers(s: &EditorSession) -> Vec<usize> {
    s.footnotes().records().iter().map(|r| r.number).collect()
}

#[test]
fn test_delete_middle_renumbers() {
    let (catalog, mut s) = three_notes();
    assert_eq!(numbers(&s), [1, 2, 3]);
    let p = s.document().children(s.root())[0];
    assert_eq!(s.document().text_content(p), "one1 two2 three3");

    let second = s.footnotes().records()[1].id.to_string();
    assert!(catalog.execute("deleteFootnote", &mut s, &CommandParams::value(second)));

    assert_eq!(numbers(&s), [1, 2]);
    assert_eq!(s.document().text_content(p), "one1 two three2");
    let texts: Vec<_> = s.footnotes().records().iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["A", "C"]);

    let doc = s.document();
    assert!(s.footnotes().integrity_report(doc, s.root()).is_empty());
    for record in s.footnotes().records() {
        assert_eq!(
            doc.attr(record.reference, "data-footnote-id"),
            doc.attr(record.content, "data-footnote-id")
        );
        assert_eq!(doc.attr(record.content, "value"), Some(record.number.to_string().as_str()));
    }
}

#[test]
fn test_delete_at_caret_inside_reference() {
    let (catalog, mut s) = three_notes();
    let reference = s.footnotes().records()[0].reference;
    s.set_selection(SelectionRange::caret(Boundary::new(reference, 0)));
    assert!(catalog.is_active("deleteFootnote", &s));

    assert!(catalog.execute("deleteFootnote", &mut s, &CommandParams::none()));
    assert_eq!(numbers(&s), [1, 2]);
    assert!(s.range().is_ok());
    assert!(!catalog.is_active("deleteFootnote", &s));
}

#[test]
fn test_delete_unknown_id_is_false() {
    let (catalog, mut s) = three_notes();
    let before = s.markup();
    assert!(!catalog.execute("deleteFootnote", &mut s, &CommandParams::value("fn-99")));
    assert_eq!(s.markup(), before);
}

#[test]
fn test_registry_recovered_from_saved_markup() {
    let (_, s) = three_notes();
    let saved = s.markup();

    let (catalog, mut loaded) = setup(&saved);
    assert_eq!(numbers(&loaded), [1, 2, 3]);
    assert_eq!(loaded.markup(), saved);

    insert_at(&catalog, &mut loaded, 0, "D");
    let newest = loaded.footnotes().records().last().unwrap();
    assert_eq!(newest.id, "fn-4");
    assert_eq!(newest.number, 4);
}

#[test]
fn test_clearing_keeps_footnotes_linked() {
    let (catalog, mut s) = three_notes();
    s.place_caret(0);
    assert!(catalog.execute("clearFormatting", &mut s, &CommandParams::value("full")));
    assert_eq!(numbers(&s), [1, 2, 3]);
    assert!(s.footnotes().integrity_report(s.document(), s.root()).is_empty());
}

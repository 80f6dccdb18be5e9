//! Commands that wait on a picker or prompt before mutating.

use std::cell::RefCell;
use std::rc::Rc;

use plume_editor_core::plugin::ColorTarget;
use plume_editor_core::{
    CommandParams, EditorConfig, EditorSession, PendingId, PluginCatalog, SecondaryUiHost,
    UiRequest,
};

#[derive(Clone, Default)]
struct RecordingHost(Rc<RefCell<Vec<(PendingId, UiRequest)>>>);

impl RecordingHost {
    fn opened(&self) -> Vec<(PendingId, UiRequest)> {
        self.0.borrow().clone()
    }
}

impl SecondaryUiHost for RecordingHost {
    fn open(&mut self, id: PendingId, request: &UiRequest) {
        self.0.borrow_mut().push((id, request.clone()));
    }
}

fn hosted(src: &str) -> (PluginCatalog, EditorSession, RecordingHost) {
    let config = EditorConfig::default();
    let mut session = EditorSession::from_markup(src, &config).unwrap();
    let host = RecordingHost::default();
    session.set_ui_host(host.clone());
    (PluginCatalog::with_builtins(&config), session, host)
}

#[test]
fn test_colour_applies_to_saved_selection() {
    let (catalog, mut s, host) = hosted("<p>red green</p>");
    s.select_text(0, 3);
    assert!(catalog.execute("textColor", &mut s, &CommandParams::none()));
    assert_eq!(s.markup(), "<p>red green</p>");

    let opened = host.opened();
    assert_eq!(opened.len(), 1);
    let (id, request) = &opened[0];
    assert_eq!(
        request,
        &UiRequest::Color {
            target: ColorTarget::Foreground,
            current: None,
        }
    );
    assert_eq!(s.pending().len(), 1);

    // Focus moved to the picker; the caret is somewhere else now.
    s.place_caret(7);
    assert!(catalog.complete_pending(&mut s, *id, "blue"));
    assert_eq!(s.markup(), r#"<p><span style="color: blue">red</span> green</p>"#);
    assert!(s.pending().is_empty());
    assert!(!catalog.complete_pending(&mut s, *id, "blue"));
}

#[test]
fn test_two_pending_commands_are_independent() {
    let (catalog, mut s, host) = hosted("<p>red green</p>");
    s.select_text(0, 3);
    assert!(catalog.execute("textColor", &mut s, &CommandParams::none()));
    s.select_text(4, 9);
    assert!(catalog.execute("highlightColor", &mut s, &CommandParams::none()));

    let opened = host.opened();
    assert_eq!(opened.len(), 2);
    let (first, second) = (opened[0].0, opened[1].0);
    assert_ne!(first, second);

    assert!(catalog.complete_pending(&mut s, second, "yellow"));
    assert!(catalog.complete_pending(&mut s, first, "blue"));
    assert_eq!(
        s.markup(),
        r#"<p><span style="color: blue">red</span> <span style="background-color: yellow">green</span></p>"#
    );
}

#[test]
fn test_cancel_drops_the_command() {
    let (catalog, mut s, host) = hosted("<p>docs</p>");
    s.select_text(0, 4);
    assert!(catalog.execute("createLink", &mut s, &CommandParams::none()));
    let (id, request) = host.opened()[0].clone();
    assert_eq!(request, UiRequest::LinkHref { current: None });

    assert!(catalog.cancel_pending(&mut s, id));
    assert!(!catalog.cancel_pending(&mut s, id));
    assert!(!catalog.complete_pending(&mut s, id, "https://example.org"));
    assert_eq!(s.markup(), "<p>docs</p>");
}

#[test]
fn test_invalid_value_rolls_back() {
    let (catalog, mut s, host) = hosted("<p>text</p>");
    s.select_text(0, 4);
    assert!(catalog.execute("textColor", &mut s, &CommandParams::none()));
    let (id, _) = host.opened()[0].clone();

    assert!(!catalog.complete_pending(&mut s, id, "red; display: none"));
    assert_eq!(s.markup(), "<p>text</p>");
    assert!(s.pending().is_empty());
}

#[test]
fn test_footnote_text_from_prompt() {
    let (catalog, mut s, host) = hosted("<p>abc</p>");
    s.place_caret(3);
    assert!(catalog.execute("insertFootnote", &mut s, &CommandParams::none()));
    let (id, request) = host.opened()[0].clone();
    assert_eq!(request, UiRequest::FootnoteText);

    s.place_caret(0);
    assert!(catalog.complete_pending(&mut s, id, "the source"));
    assert_eq!(s.footnotes().len(), 1);
    assert_eq!(s.footnotes().records()[0].text, "the source");
    let p = s.document().children(s.root())[0];
    assert_eq!(s.document().text_content(p), "abc1");
}

#[test]
fn test_without_host_nothing_is_pending() {
    let config = EditorConfig::default();
    let catalog = PluginCatalog::with_builtins(&config);
    let mut s = EditorSession::from_markup("<p>text</p>", &config).unwrap();
    s.select_text(0, 4);
    assert!(!catalog.execute("textColor", &mut s, &CommandParams::none()));
    assert!(s.pending().is_empty());
    assert!(catalog.execute("textColor", &mut s, &CommandParams::value("green")));
    assert_eq!(s.markup(), r#"<p><span style="color: green">text</span></p>"#);
}

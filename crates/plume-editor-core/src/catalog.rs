//! Plugin catalog: registration, dispatch and fault isolation.
//!
//! The catalog is the only place plugin failures are absorbed. A plugin that
//! returns an error or panics is reported as `false` (or left out of a
//! result list), logged, and its partial work is rolled back from a snapshot
//! taken before it ran. One broken plugin never takes the editor down.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;

use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::plugin::{
    Alignment, AlignmentFormat, BlockFormat, ClearFormatting, ColorFormat, ColorTarget,
    CommandParams, FootnoteAction, FootnoteCommand, Indent, IndentDirection, InsertKind,
    LinkAction, LinkCommand, ListFormat, Plugin, PluginCategory, PluginDescriptor, PluginKind,
    StructuralInsert, ToggleFormat, Utility,
};
use crate::session::{EditorSession, PendingId, SessionSnapshot};

/// A plugin plus the catalog's bookkeeping for it.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    pub name: SmolStr,
    pub category: PluginCategory,
    /// Higher sorts first within a category.
    pub priority: i32,
    pub plugin: Plugin,
}

impl PluginRecord {
    pub fn new(category: PluginCategory, plugin: Plugin) -> Self {
        Self {
            name: plugin.descriptor.name.clone(),
            category,
            priority: 0,
            plugin,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.plugin.descriptor
    }
}

/// Outcome of running a lifecycle hook over every plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleReport {
    pub succeeded: usize,
    pub failures: Vec<(SmolStr, String)>,
}

impl LifecycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Name-keyed registry of command plugins, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    records: IndexMap<SmolStr, PluginRecord>,
}

/// Run `f`, turning a panic into a `PluginFault` for `name`.
fn guarded<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(EditorError::fault(name, panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_owned()
    }
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every built-in plugin not disabled in `config`.
    pub fn with_builtins(config: &EditorConfig) -> Self {
        let mut catalog = Self::new();
        catalog.register_many(
            builtin_plugins(config)
                .into_iter()
                .filter(|record| !config.is_disabled(&record.name)),
        );
        tracing::info!(target: "plume::catalog", count = catalog.count(), "registered built-in plugins");
        catalog
    }

    /// Add a plugin. A plugin already registered under the same name is
    /// replaced (keeping its position) and returned.
    pub fn register(&mut self, record: PluginRecord) -> Option<PluginRecord> {
        let name = record.name.clone();
        let previous = self.records.insert(name.clone(), record);
        if previous.is_some() {
            tracing::warn!(target: "plume::catalog", %name, "plugin re-registered, replacing previous instance");
        } else {
            tracing::trace!(target: "plume::catalog", %name, "registered plugin");
        }
        previous
    }

    pub fn register_many(&mut self, records: impl IntoIterator<Item = PluginRecord>) {
        for record in records {
            self.register(record);
        }
    }

    /// Remove a plugin, running its destroy hook. Hook failures are logged.
    pub fn unregister(&mut self, name: &str) -> Option<PluginRecord> {
        let record = self.records.shift_remove(name)?;
        if let Err(err) = guarded(name, || record.plugin.destroy()) {
            tracing::error!(target: "plume::catalog", name, error = %err, "destroy hook failed during unregister");
        }
        Some(record)
    }

    pub fn get_plugin(&self, name: &str) -> Option<&PluginRecord> {
        self.records.get(name)
    }

    /// Like [`get_plugin`](Self::get_plugin), as an error when missing.
    pub fn require(&self, name: &str) -> Result<&PluginRecord> {
        self.records
            .get(name)
            .ok_or_else(|| EditorError::MissingPlugin(SmolStr::new(name)))
    }

    pub fn has(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Registered names in registration order.
    pub fn plugin_names(&self) -> Vec<SmolStr> {
        self.records.keys().cloned().collect()
    }

    /// Plugins of one category, highest priority first, ties in
    /// registration order.
    pub fn by_category(&self, category: PluginCategory) -> Vec<&PluginRecord> {
        let mut records: Vec<&PluginRecord> = self
            .records
            .values()
            .filter(|r| r.category == category)
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.priority));
        records
    }

    pub fn category_stats(&self) -> BTreeMap<PluginCategory, usize> {
        let mut stats = BTreeMap::new();
        for record in self.records.values() {
            *stats.entry(record.category).or_insert(0) += 1;
        }
        stats
    }

    /// Run a command by name.
    ///
    /// Returns whether a mutation was attempted. Unknown names, invalid
    /// selections, errors and panics all come back as `false`; on errors and
    /// panics the session is rolled back to its state before the call.
    pub fn execute(&self, name: &str, session: &mut EditorSession, params: &CommandParams) -> bool {
        let Some(record) = self.records.get(name) else {
            tracing::warn!(target: "plume::catalog", name, "execute called for unregistered plugin");
            return false;
        };
        let snapshot = session.snapshot();
        let result = guarded(name, || record.plugin.execute(session, params));
        self.settle(record, session, snapshot, result)
    }

    fn settle(
        &self,
        record: &PluginRecord,
        session: &mut EditorSession,
        snapshot: SessionSnapshot,
        result: Result<bool>,
    ) -> bool {
        let name = record.name.as_str();
        match result {
            Ok(true) => {
                session.ensure_root_block();
                if record.plugin.records_history() {
                    session.checkpoint();
                }
                tracing::debug!(target: "plume::catalog", name, "command executed");
                true
            }
            Ok(false) => {
                session.rollback(snapshot);
                tracing::trace!(target: "plume::catalog", name, "command had nothing to do");
                false
            }
            Err(EditorError::InvalidSelection(reason)) => {
                session.rollback(snapshot);
                tracing::debug!(target: "plume::catalog", name, reason, "command skipped");
                false
            }
            Err(err) => {
                session.rollback(snapshot);
                tracing::error!(target: "plume::catalog", name, error = %err, "command failed, changes rolled back");
                false
            }
        }
    }

    /// Whether one plugin reports itself active. Unknown names and failures
    /// answer false.
    pub fn is_active(&self, name: &str, session: &EditorSession) -> bool {
        let Some(record) = self.records.get(name) else {
            tracing::warn!(target: "plume::catalog", name, "is_active called for unregistered plugin");
            return false;
        };
        self.probe(record, session)
    }

    fn probe(&self, record: &PluginRecord, session: &EditorSession) -> bool {
        if !record.plugin.has_active_state() {
            return false;
        }
        match guarded(&record.name, || Ok(record.plugin.is_active(session))) {
            Ok(active) => active,
            Err(err) => {
                tracing::error!(target: "plume::catalog", name = %record.name, error = %err, "active-state query failed");
                false
            }
        }
    }

    /// Names of every plugin whose state is "on" at the current selection.
    ///
    /// Empty when there is no valid selection. A plugin whose query fails is
    /// left out and the rest are still reported.
    pub fn active_plugins(&self, session: &EditorSession) -> Vec<SmolStr> {
        if session.range().is_err() {
            return Vec::new();
        }
        self.records
            .values()
            .filter(|record| self.probe(record, session))
            .map(|record| record.name.clone())
            .collect()
    }

    /// Run every plugin's init hook. Failures are collected, not fatal.
    pub fn initialize_all(&self) -> LifecycleReport {
        self.run_lifecycle("init", |plugin| plugin.init())
    }

    /// Run every plugin's destroy hook. Failures are collected, not fatal.
    pub fn destroy_all(&self) -> LifecycleReport {
        self.run_lifecycle("destroy", |plugin| plugin.destroy())
    }

    fn run_lifecycle(&self, hook: &str, run: impl Fn(&Plugin) -> Result<()>) -> LifecycleReport {
        let mut report = LifecycleReport::default();
        for record in self.records.values() {
            match guarded(&record.name, || run(&record.plugin)) {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    tracing::error!(target: "plume::catalog", name = %record.name, hook, error = %err, "lifecycle hook failed");
                    report.failures.push((record.name.clone(), err.to_string()));
                }
            }
        }
        tracing::debug!(target: "plume::catalog", hook, succeeded = report.succeeded, failed = report.failures.len(), "lifecycle pass finished");
        report
    }

    /// Finish a command that was waiting on secondary UI.
    ///
    /// Restores the selection saved when the UI opened, then applies `value`.
    /// Unknown or already finished ids answer false.
    pub fn complete_pending(&self, session: &mut EditorSession, id: PendingId, value: &str) -> bool {
        let Some(pending) = session.take_pending(id) else {
            tracing::warn!(target: "plume::catalog", id, "no pending command with this id");
            return false;
        };
        let Some(record) = self.records.get(&pending.plugin) else {
            tracing::warn!(target: "plume::catalog", id, plugin = %pending.plugin, "pending command's plugin is gone");
            return false;
        };
        let snapshot = session.snapshot();
        if let Some(saved) = pending.saved {
            session.selection.restore_from(saved);
        }
        let result = guarded(&record.name, || {
            record.plugin.complete(session, &pending.request, value)
        });
        self.settle(record, session, snapshot, result)
    }

    /// Drop a pending command without applying anything.
    pub fn cancel_pending(&self, session: &mut EditorSession, id: PendingId) -> bool {
        let cancelled = session.take_pending(id).is_some();
        if cancelled {
            tracing::debug!(target: "plume::catalog", id, "pending command cancelled");
        }
        cancelled
    }
}

fn record(
    category: PluginCategory,
    name: &str,
    title: &str,
    icon: &str,
    shortcut: Option<&str>,
    kind: PluginKind,
) -> PluginRecord {
    let mut descriptor = PluginDescriptor::new(name, title).with_icon(icon);
    if let Some(shortcut) = shortcut {
        descriptor = descriptor.with_shortcut(shortcut);
    }
    if matches!(kind, PluginKind::Color(_) | PluginKind::Clear(_)) {
        descriptor = descriptor.dropdown();
    }
    PluginRecord::new(category, Plugin::new(descriptor, kind))
}

/// Every built-in plugin, configured from `config`.
pub fn builtin_plugins(config: &EditorConfig) -> Vec<PluginRecord> {
    use PluginCategory as C;

    let marker = config.zero_width_marker;
    let toggle = |tag: &str| PluginKind::Toggle(ToggleFormat::new(tag, marker));
    let block = |tag: &str| PluginKind::Block(BlockFormat::new(tag));
    let align = |a: Alignment| PluginKind::Align(AlignmentFormat::new(a));
    let insert = |kind: InsertKind| {
        PluginKind::Insert(StructuralInsert::new(
            kind,
            config.filler_char,
            config.continuation_block.as_str(),
        ))
    };

    let mut records = vec![
        record(C::Format, "bold", "Bold", "bold", Some("Mod-b"), toggle("strong")).with_priority(100),
        record(C::Format, "italic", "Italic", "italic", Some("Mod-i"), toggle("em")).with_priority(90),
        record(C::Format, "underline", "Underline", "underline", Some("Mod-u"), toggle("u")).with_priority(80),
        record(C::Format, "strikethrough", "Strikethrough", "strike", None, toggle("s")).with_priority(70),
        record(C::Format, "superscript", "Superscript", "sup", None, toggle("sup")),
        record(C::Format, "subscript", "Subscript", "sub", None, toggle("sub")),
        record(C::Format, "code", "Inline code", "code", Some("Mod-e"), toggle("code")),
        record(C::Block, "paragraph", "Paragraph", "paragraph", Some("Mod-Alt-0"), block("p")).with_priority(100),
    ];
    for level in 1..=6 {
        let name = format!("heading{level}");
        let title = format!("Heading {level}");
        let shortcut = format!("Mod-Alt-{level}");
        let tag = format!("h{level}");
        records.push(
            record(C::Block, &name, &title, &tag, Some(&shortcut), block(tag.as_str()))
                .with_priority(90 - level),
        );
    }
    records.extend([
        record(C::Block, "blockquote", "Quote", "quote", None, block("blockquote")),
        record(C::Block, "codeBlock", "Code block", "code-block", None, block("pre")),
        record(C::List, "orderedList", "Numbered list", "list-ol", Some("Mod-Shift-7"), PluginKind::List(ListFormat::ordered())),
        record(C::List, "unorderedList", "Bulleted list", "list-ul", Some("Mod-Shift-8"), PluginKind::List(ListFormat::unordered())),
        record(C::Alignment, "alignLeft", "Align left", "align-left", None, align(Alignment::Left)).with_priority(40),
        record(C::Alignment, "alignCenter", "Align center", "align-center", None, align(Alignment::Center)).with_priority(30),
        record(C::Alignment, "alignRight", "Align right", "align-right", None, align(Alignment::Right)).with_priority(20),
        record(C::Alignment, "alignJustify", "Justify", "align-justify", None, align(Alignment::Justify)).with_priority(10),
        record(
            C::Indent,
            "indent",
            "Indent",
            "indent",
            Some("Tab"),
            PluginKind::Indent(Indent::new(IndentDirection::Indent, config.indent_step, config.max_indent)),
        ),
        record(
            C::Indent,
            "outdent",
            "Outdent",
            "outdent",
            Some("Shift-Tab"),
            PluginKind::Indent(Indent::new(IndentDirection::Outdent, config.indent_step, config.max_indent)),
        ),
        record(
            C::Clear,
            "clearFormatting",
            "Clear formatting",
            "clear",
            Some("Mod-\\"),
            PluginKind::Clear(ClearFormatting::new(config.clear_format_default, config.max_transform_depth)),
        ),
        record(C::Footnote, "insertFootnote", "Insert footnote", "footnote", None, PluginKind::Footnote(FootnoteCommand::new(FootnoteAction::Insert))),
        record(C::Footnote, "deleteFootnote", "Delete footnote", "footnote-remove", None, PluginKind::Footnote(FootnoteCommand::new(FootnoteAction::Delete))),
        record(C::Insert, "horizontalRule", "Horizontal rule", "hr", None, insert(InsertKind::HorizontalRule)),
        record(C::Insert, "insertImage", "Image", "image", None, insert(InsertKind::Image)),
        record(C::Insert, "insertTable", "Table", "table", None, insert(InsertKind::Table)),
        record(C::Color, "textColor", "Text colour", "color", None, PluginKind::Color(ColorFormat::new(ColorTarget::Foreground, marker))),
        record(C::Color, "highlightColor", "Highlight", "highlight", None, PluginKind::Color(ColorFormat::new(ColorTarget::Background, marker))),
        record(C::Link, "createLink", "Link", "link", Some("Mod-k"), PluginKind::Link(LinkCommand::new(LinkAction::Create))),
        record(C::Link, "unlink", "Remove link", "unlink", None, PluginKind::Link(LinkCommand::new(LinkAction::Remove))),
        record(C::History, "undo", "Undo", "undo", Some("Mod-z"), PluginKind::Utility(Utility::Undo)),
        record(C::History, "redo", "Redo", "redo", Some("Mod-Shift-z"), PluginKind::Utility(Utility::Redo)),
        record(C::Utility, "selectAll", "Select all", "select-all", Some("Mod-a"), PluginKind::Utility(Utility::SelectAll)),
    ]);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_are_unique() {
        let records = builtin_plugins(&EditorConfig::default());
        let catalog = PluginCatalog::with_builtins(&EditorConfig::default());
        assert_eq!(catalog.count(), records.len());
    }

    #[test]
    fn test_disabled_builtins_are_skipped() {
        let config = EditorConfig {
            disabled_plugins: vec!["bold".to_owned(), "insertTable".to_owned()],
            ..EditorConfig::default()
        };
        let catalog = PluginCatalog::with_builtins(&config);
        assert!(!catalog.has("bold"));
        assert!(!catalog.has("insertTable"));
        assert!(catalog.has("italic"));
    }

    #[test]
    fn test_category_stats_snapshot() {
        let catalog = PluginCatalog::with_builtins(&EditorConfig::default());
        insta::assert_yaml_snapshot!(catalog.category_stats(), @r"
        format: 7
        block: 9
        list: 2
        alignment: 4
        indent: 2
        clear: 1
        footnote: 2
        insert: 3
        color: 2
        link: 2
        history: 2
        utility: 1
        ");
    }

    #[test]
    fn test_by_category_orders_by_priority() {
        let catalog = PluginCatalog::with_builtins(&EditorConfig::default());
        let names: Vec<_> = catalog
            .by_category(PluginCategory::Alignment)
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["alignLeft", "alignCenter", "alignRight", "alignJustify"]);
    }

    #[test]
    fn test_unknown_name_is_false() {
        let catalog = PluginCatalog::new();
        let mut session =
            EditorSession::from_markup("<p>x</p>", &EditorConfig::default()).unwrap();
        session.place_caret(0);
        assert!(!catalog.execute("nope", &mut session, &CommandParams::none()));
        assert!(!catalog.is_active("nope", &session));
        assert!(matches!(catalog.require("nope"), Err(EditorError::MissingPlugin(n)) if n == "nope"));
    }
}

//! The command plugin contract and the built-in plugin families.
//!
//! Every built-in command is one of a closed set of families; each family is
//! a plain struct configured at construction (a tag, an alignment, a
//! direction) and the catalog dispatches over [`PluginKind`]. Host-supplied
//! commands enter through [`Utility::Custom`].

mod align;
mod block;
mod clear;
mod color;
mod footnote;
mod indent;
mod link;
mod list;
mod structural;
mod toggle;
mod utility;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub use align::{Alignment, AlignmentFormat};
pub use block::BlockFormat;
pub use clear::{ClearFormatting, ClearMode};
pub use color::{ColorFormat, ColorTarget};
pub use footnote::{FootnoteAction, FootnoteCommand};
pub use indent::{Indent, IndentDirection};
pub use link::{LinkAction, LinkCommand};
pub use list::ListFormat;
pub use structural::{ImageAlign, ImageSpec, InsertKind, StructuralInsert, build_image_fragment};
pub use toggle::ToggleFormat;
pub use utility::{Utility, UtilityHandler};

use crate::error::{EditorError, Result};
use crate::session::{EditorSession, UiRequest};

/// Display metadata for a toolbar or menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: SmolStr,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<SmolStr>,
    /// Rendered as a menu of values rather than a single button.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_dropdown: bool,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<SmolStr>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            icon: None,
            shortcut: None,
            is_dropdown: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<SmolStr>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<SmolStr>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn dropdown(mut self) -> Self {
        self.is_dropdown = true;
        self
    }
}

/// Arguments to a command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    /// The primary argument, e.g. a colour, an href or a clear mode.
    pub value: Option<String>,
    /// Named arguments, e.g. `src`/`align` for an image.
    pub options: BTreeMap<String, String>,
}

impl CommandParams {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            options: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Grouping used for catalog statistics and toolbar layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    Format,
    Block,
    List,
    Alignment,
    Indent,
    Clear,
    Footnote,
    Insert,
    Color,
    Link,
    History,
    Utility,
}

impl PluginCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginCategory::Format => "format",
            PluginCategory::Block => "block",
            PluginCategory::List => "list",
            PluginCategory::Alignment => "alignment",
            PluginCategory::Indent => "indent",
            PluginCategory::Clear => "clear",
            PluginCategory::Footnote => "footnote",
            PluginCategory::Insert => "insert",
            PluginCategory::Color => "color",
            PluginCategory::Link => "link",
            PluginCategory::History => "history",
            PluginCategory::Utility => "utility",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of command families.
#[derive(Debug, Clone)]
pub enum PluginKind {
    Toggle(ToggleFormat),
    Block(BlockFormat),
    List(ListFormat),
    Align(AlignmentFormat),
    Indent(Indent),
    Clear(ClearFormatting),
    Footnote(FootnoteCommand),
    Insert(StructuralInsert),
    Color(ColorFormat),
    Link(LinkCommand),
    Utility(Utility),
}

/// A registered command: descriptor plus behaviour.
#[derive(Debug, Clone)]
pub struct Plugin {
    pub descriptor: PluginDescriptor,
    pub kind: PluginKind,
}

impl Plugin {
    pub fn new(descriptor: PluginDescriptor, kind: PluginKind) -> Self {
        Self { descriptor, kind }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Run the command against the session's live selection.
    ///
    /// `Ok(true)` means a mutation was attempted (or a secondary UI opened),
    /// `Ok(false)` means the command had nothing to do.
    pub fn execute(&self, session: &mut EditorSession, params: &CommandParams) -> Result<bool> {
        let name = self.name();
        match &self.kind {
            PluginKind::Toggle(p) => p.execute(session),
            PluginKind::Block(p) => p.execute(session),
            PluginKind::List(p) => p.execute(session),
            PluginKind::Align(p) => p.execute(session),
            PluginKind::Indent(p) => p.execute(session),
            PluginKind::Clear(p) => p.execute(session, params),
            PluginKind::Footnote(p) => p.execute(name, session, params),
            PluginKind::Insert(p) => p.execute(session, params),
            PluginKind::Color(p) => p.execute(name, session, params),
            PluginKind::Link(p) => p.execute(name, session, params),
            PluginKind::Utility(p) => p.execute(session, params),
        }
    }

    /// Whether the command exposes an on/off state at all.
    pub fn has_active_state(&self) -> bool {
        match &self.kind {
            PluginKind::Toggle(_)
            | PluginKind::Block(_)
            | PluginKind::List(_)
            | PluginKind::Align(_)
            | PluginKind::Footnote(_)
            | PluginKind::Color(_)
            | PluginKind::Link(_) => true,
            PluginKind::Indent(_) | PluginKind::Clear(_) | PluginKind::Insert(_) => false,
            PluginKind::Utility(u) => u.has_active_state(),
        }
    }

    /// Whether the command's state is "on" at the current selection.
    ///
    /// Commands without an active state always answer false.
    pub fn is_active(&self, session: &EditorSession) -> bool {
        match &self.kind {
            PluginKind::Toggle(p) => p.is_active(session),
            PluginKind::Block(p) => p.is_active(session),
            PluginKind::List(p) => p.is_active(session),
            PluginKind::Align(p) => p.is_active(session),
            PluginKind::Footnote(p) => p.is_active(session),
            PluginKind::Color(p) => p.is_active(session),
            PluginKind::Link(p) => p.is_active(session),
            PluginKind::Utility(p) => p.is_active(session),
            PluginKind::Indent(_) | PluginKind::Clear(_) | PluginKind::Insert(_) => false,
        }
    }

    /// Whether a successful run should be recorded as an undo step.
    pub fn records_history(&self) -> bool {
        match &self.kind {
            PluginKind::Utility(u) => u.records_history(),
            _ => true,
        }
    }

    pub fn init(&self) -> Result<()> {
        match &self.kind {
            PluginKind::Utility(u) => u.init(),
            _ => Ok(()),
        }
    }

    pub fn destroy(&self) -> Result<()> {
        match &self.kind {
            PluginKind::Utility(u) => u.destroy(),
            _ => Ok(()),
        }
    }

    /// Finish a command deferred on secondary UI with the chosen value.
    ///
    /// The catalog has already restored the selection saved when the UI
    /// opened.
    pub fn complete(
        &self,
        session: &mut EditorSession,
        request: &UiRequest,
        value: &str,
    ) -> Result<bool> {
        match (&self.kind, request) {
            (PluginKind::Color(p), UiRequest::Color { .. }) => p.apply(session, value),
            (PluginKind::Link(p), UiRequest::LinkHref { .. }) => p.apply(session, value),
            (PluginKind::Footnote(p), UiRequest::FootnoteText) => p.insert(session, value),
            _ => Err(EditorError::unsupported(format!(
                "'{}' cannot complete a {request:?} request",
                self.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builders() {
        let params = CommandParams::value("red").with("target", "text");
        assert_eq!(params.value_str(), Some("red"));
        assert_eq!(params.option("target"), Some("text"));
        assert_eq!(params.option("missing"), None);
        assert_eq!(CommandParams::value("").value_str(), None);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        insta::assert_yaml_snapshot!(
            vec![PluginCategory::Format, PluginCategory::History],
            @r"
        - format
        - history
        "
        );
    }
}

//! Error types for the command engine.
//!
//! Plugins return these; the catalog is the only place they are turned into
//! a `false`/empty answer plus a log entry.

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::dom::{MarkupError, NodeId};

#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// No selection, or a selection outside the editor root.
    #[error("invalid selection: {0}")]
    #[diagnostic(code(plume::invalid_selection))]
    InvalidSelection(&'static str),

    /// The tree cannot be mutated the requested way.
    #[error("unsupported mutation: {0}")]
    #[diagnostic(code(plume::unsupported_mutation))]
    UnsupportedMutation(String),

    /// Dispatch to a name nothing is registered under.
    #[error("no plugin registered as '{0}'")]
    #[diagnostic(code(plume::missing_plugin))]
    MissingPlugin(SmolStr),

    /// A plugin failed while executing or running a lifecycle hook.
    #[error("plugin '{name}' failed: {message}")]
    #[diagnostic(code(plume::plugin_fault))]
    PluginFault { name: SmolStr, message: String },

    #[error("node {0} is not part of the document")]
    #[diagnostic(code(plume::node_not_found))]
    NodeNotFound(NodeId),

    /// Recursive transform exceeded the configured nesting limit.
    #[error("content nested deeper than {0} levels")]
    #[diagnostic(
        code(plume::depth_exceeded),
        help("raise max_transform_depth in the editor config")
    )]
    DepthExceeded(usize),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Markup(#[from] MarkupError),
}

impl EditorError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedMutation(message.into())
    }

    pub fn fault(name: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self::PluginFault {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

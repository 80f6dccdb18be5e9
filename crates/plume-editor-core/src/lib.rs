//! plume-editor-core: plugin-based command engine for a rich-text tree.
//!
//! This crate provides:
//! - `Document` - arena tree of elements and text with stable node ids
//! - `SelectionContext` - live selection plus save/restore across UI detours
//! - `mutate` - range isolation, wrapping, unwrapping and rewriting helpers
//! - `PluginCatalog` - name-keyed command registry with fault isolation
//! - `FootnoteRegistry` - numbered reference/content pairs
//! - `insert` - placement of rules, images and tables

pub mod catalog;
pub mod config;
pub mod dom;
pub mod error;
pub mod footnotes;
pub mod insert;
pub mod log_capture;
pub mod mutate;
pub mod plugin;
pub mod selection;
pub mod session;

pub use catalog::{LifecycleReport, PluginCatalog, PluginRecord, builtin_plugins};
pub use config::EditorConfig;
pub use dom::{Document, MarkupError, NodeId, inner_markup, outer_markup, parse_fragment};
pub use error::{EditorError, Result};
pub use footnotes::{FootnoteRecord, FootnoteRegistry, IntegrityIssue};
pub use log_capture::{CapturedEvent, LogCapture, LogCaptureLayer};
pub use plugin::{
    ClearMode, CommandParams, Plugin, PluginCategory, PluginDescriptor, PluginKind, Utility,
    UtilityHandler,
};
pub use selection::{Boundary, SelectionContext, SelectionRange};
pub use session::{EditorSession, History, PendingCommand, PendingId, SecondaryUiHost, UiRequest};
pub use smol_str::SmolStr;

//! Editor configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes.

use serde::{Deserialize, Serialize};

use crate::plugin::ClearMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Pixels added or removed by indent/outdent.
    pub indent_step: u32,
    /// Indent is clamped to this many pixels.
    pub max_indent: u32,
    /// Character placed in an empty format wrapper so typed text inherits it.
    pub zero_width_marker: char,
    /// Character inserted after a non-floated structural insert.
    pub filler_char: char,
    /// Mode used by the `clearFormatting` plugin when no mode is passed.
    pub clear_format_default: ClearMode,
    /// Nesting limit for recursive tree rewrites.
    pub max_transform_depth: usize,
    /// Prefix for generated footnote ids.
    pub footnote_id_prefix: String,
    /// Block created after a block-level insert to hold the cursor.
    pub continuation_block: String,
    /// Built-in plugins left out of the default catalog.
    pub disabled_plugins: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            indent_step: 40,
            max_indent: 400,
            zero_width_marker: '\u{200B}',
            filler_char: '\u{200B}',
            clear_format_default: ClearMode::Medium,
            max_transform_depth: 256,
            footnote_id_prefix: "fn".to_owned(),
            continuation_block: "p".to_owned(),
            disabled_plugins: Vec::new(),
        }
    }
}

impl EditorConfig {
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_plugins.iter().any(|n| n == name)
    }
}

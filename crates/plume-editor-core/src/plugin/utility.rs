use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::plugin::CommandParams;
use crate::selection::SelectionRange;
use crate::session::EditorSession;

/// A host-supplied command.
///
/// Only `execute` is required. Handlers that report an on/off state override
/// both `has_active_state` and `is_active`.
pub trait UtilityHandler {
    fn execute(&self, session: &mut EditorSession, params: &CommandParams) -> Result<bool>;

    fn has_active_state(&self) -> bool {
        false
    }

    fn is_active(&self, _session: &EditorSession) -> bool {
        false
    }

    /// Whether a successful run is an undo step.
    fn records_history(&self) -> bool {
        true
    }

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// History, selection and host-supplied commands.
#[derive(Clone)]
pub enum Utility {
    Undo,
    Redo,
    SelectAll,
    Custom(Arc<dyn UtilityHandler>),
}

impl fmt::Debug for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Utility::Undo => f.write_str("Undo"),
            Utility::Redo => f.write_str("Redo"),
            Utility::SelectAll => f.write_str("SelectAll"),
            Utility::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Utility {
    pub fn custom(handler: impl UtilityHandler + 'static) -> Self {
        Utility::Custom(Arc::new(handler))
    }

    pub fn execute(&self, session: &mut EditorSession, params: &CommandParams) -> Result<bool> {
        match self {
            Utility::Undo => Ok(session.undo()),
            Utility::Redo => Ok(session.redo()),
            Utility::SelectAll => {
                let range = SelectionRange::node_contents(&session.doc, session.root);
                session.selection.set(range);
                Ok(true)
            }
            Utility::Custom(handler) => handler.execute(session, params),
        }
    }

    pub fn has_active_state(&self) -> bool {
        match self {
            Utility::Custom(handler) => handler.has_active_state(),
            _ => false,
        }
    }

    pub fn is_active(&self, session: &EditorSession) -> bool {
        match self {
            Utility::Custom(handler) => handler.has_active_state() && handler.is_active(session),
            _ => false,
        }
    }

    pub fn records_history(&self) -> bool {
        match self {
            Utility::Custom(handler) => handler.records_history(),
            _ => false,
        }
    }

    pub fn init(&self) -> Result<()> {
        match self {
            Utility::Custom(handler) => handler.init(),
            _ => Ok(()),
        }
    }

    pub fn destroy(&self) -> Result<()> {
        match self {
            Utility::Custom(handler) => handler.destroy(),
            _ => Ok(()),
        }
    }
}

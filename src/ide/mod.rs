//! Per-language IDE behavior on top of Acme windows.

pub mod classify;
pub mod dispatch;
pub mod navigate;
pub mod position;
pub mod python;

use std::collections::HashMap;
use std::sync::Arc;

pub use classify::{
    is_command_event, which_area, which_button, AcmeArea, AcmeButton, IdeCommand, WindowClassifier,
    WindowKind,
};
pub use dispatch::{Dispatcher, WatchState, WindowWatcher};
pub use navigate::{apply_resolution, format_location_list, plan, NavigationPlan, Resolution};
pub use position::{line_and_column, rune_to_byte_offset, LineAndColumn};
pub use python::{PythonIde, PYTHON_TAG};

/// What a language contributes: tag words and the ycmd command each click
/// maps to.
pub trait IdeHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> WindowKind;
    fn filetypes(&self) -> &[&'static str];

    /// Text appended to the window tag.
    fn tag(&self) -> &'static str;

    /// Tag words whose clicks are taken away from Acme.
    fn commands(&self) -> &[&'static str];

    /// ycmd `command_arguments` for a click, or `None` for a no-op.
    fn command_arguments(&self, command: &IdeCommand) -> Option<Vec<String>>;

    fn completer_target(&self) -> Option<&'static str> {
        None
    }
}

pub struct IdeRegistry {
    handlers: HashMap<WindowKind, Arc<dyn IdeHandler>>,
}

impl IdeRegistry {
    /// Registry with every built-in handler.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PythonIde));
        registry
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn IdeHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn get(&self, kind: WindowKind) -> Option<Arc<dyn IdeHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn supported_kinds(&self) -> Vec<WindowKind> {
        self.handlers.keys().copied().collect()
    }
}

impl Default for IdeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

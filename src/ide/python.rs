use super::{AcmeButton, IdeCommand, IdeHandler, WindowKind};

pub const PYTHON_TAG: &str = "Def Refs Fwd Bck In Out Up Dwn Find Case";

const PYTHON_COMMANDS: &[&str] = &["Def", "Refs", "Fwd", "Bck", "In", "Out", "Up", "Dwn", "Find", "Case"];

pub struct PythonIde;

impl IdeHandler for PythonIde {
    fn name(&self) -> &'static str {
        "python"
    }

    fn kind(&self) -> WindowKind {
        WindowKind::Python
    }

    fn filetypes(&self) -> &[&'static str] {
        &["python"]
    }

    fn tag(&self) -> &'static str {
        PYTHON_TAG
    }

    fn commands(&self) -> &[&'static str] {
        PYTHON_COMMANDS
    }

    fn command_arguments(&self, command: &IdeCommand) -> Option<Vec<String>> {
        match (command.command.as_str(), command.button) {
            ("Def", AcmeButton::Three) => Some(vec!["GoTo".to_string()]),
            ("Def", AcmeButton::Two) => Some(vec!["GoToReferences".to_string()]),
            _ => None,
        }
    }
}

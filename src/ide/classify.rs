//! Deciding what a window is and whether an event is meant for us.

use crate::acme::{Event, FLAG_BUILTIN};

/// What a window holds, judged from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// Unnamed, freshly created window.
    NewWindow,
    Unknown,
    Cc,
    Python,
    Java,
    Go,
    Javascript,
    Rust,
    CSharp,
    Directory,
    /// Acme's own `+Errors` windows.
    Errors,
    /// A `win` shell window, named `<dir>/-<hostname>`.
    Win,
}

const SUFFIXES: &[(&str, WindowKind)] = &[
    (".py", WindowKind::Python),
    (".c", WindowKind::Cc),
    (".cpp", WindowKind::Cc),
    (".cc", WindowKind::Cc),
    (".C", WindowKind::Cc),
    (".h", WindowKind::Cc),
    (".hh", WindowKind::Cc),
    (".H", WindowKind::Cc),
    (".hpp", WindowKind::Cc),
    (".java", WindowKind::Java),
    (".go", WindowKind::Go),
    (".js", WindowKind::Javascript),
    (".rs", WindowKind::Rust),
    (".cs", WindowKind::CSharp),
    ("+Errors", WindowKind::Errors),
    ("/", WindowKind::Directory),
];

/// Suffix table lookup, longest suffix first.
#[derive(Debug, Clone)]
pub struct WindowClassifier {
    suffixes: Vec<(String, WindowKind)>,
}

impl WindowClassifier {
    /// Builds the table; `hostname` adds the `-<hostname>` win suffix.
    pub fn new(hostname: Option<&str>) -> Self {
        let mut suffixes: Vec<(String, WindowKind)> = SUFFIXES
            .iter()
            .map(|(suffix, kind)| (suffix.to_string(), *kind))
            .collect();
        if let Some(host) = hostname.filter(|h| !h.is_empty()) {
            suffixes.push((format!("-{}", host), WindowKind::Win));
        }
        suffixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { suffixes }
    }

    /// Table for this machine.
    pub fn for_this_host() -> Self {
        let hostname = sysinfo::System::host_name();
        if hostname.is_none() {
            tracing::warn!("could not determine hostname; win windows will be unknown");
        }
        Self::new(hostname.as_deref())
    }

    pub fn classify(&self, name: &str) -> WindowKind {
        if name.is_empty() {
            return WindowKind::NewWindow;
        }
        self.suffixes
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix.as_str()))
            .map(|(_, kind)| *kind)
            .unwrap_or(WindowKind::Unknown)
    }
}

/// Where in the window the event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcmeArea {
    Tag,
    Body,
    Invalid,
}

/// Which mouse action produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcmeButton {
    /// Button 2: execute.
    Two,
    /// Button 3: look.
    Three,
    Invalid,
}

/// Uppercase event types come from the body, lowercase from the tag.
pub fn which_area(event: &Event) -> AcmeArea {
    if event.c2.is_uppercase() {
        AcmeArea::Body
    } else if event.c2.is_lowercase() {
        AcmeArea::Tag
    } else {
        AcmeArea::Invalid
    }
}

pub fn which_button(event: &Event) -> AcmeButton {
    match (event.c1, event.c2) {
        ('M', 'x' | 'X') => AcmeButton::Two,
        ('M', 'l' | 'L') => AcmeButton::Three,
        _ => AcmeButton::Invalid,
    }
}

/// A tag click on one of our command words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeCommand {
    pub command: String,
    pub area: AcmeArea,
    pub button: AcmeButton,
}

impl IdeCommand {
    pub fn from_event(event: &Event) -> Self {
        Self {
            command: event.text.clone(),
            area: which_area(event),
            button: which_button(event),
        }
    }
}

/// True only for mouse clicks in the tag, not handled internally by Acme,
/// whose text is exactly one of `commands`.
pub fn is_command_event(event: &Event, commands: &[&str]) -> bool {
    if which_area(event) != AcmeArea::Tag {
        return false;
    }
    if which_button(event) == AcmeButton::Invalid {
        return false;
    }
    // Never take over Acme's own commands.
    if event.flag & FLAG_BUILTIN != 0 {
        return false;
    }
    commands.contains(&event.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMANDS: &[&str] = &["Def", "Refs", "Find"];

    #[test]
    fn test_classify_by_suffix() {
        let classifier = WindowClassifier::new(Some("box"));
        assert_eq!(classifier.classify(""), WindowKind::NewWindow);
        assert_eq!(classifier.classify("/src/app.py"), WindowKind::Python);
        assert_eq!(classifier.classify("/src/main.cc"), WindowKind::Cc);
        assert_eq!(classifier.classify("/src/main.c"), WindowKind::Cc);
        assert_eq!(classifier.classify("/src/Main.C"), WindowKind::Cc);
        assert_eq!(classifier.classify("/src/lib.rs"), WindowKind::Rust);
        assert_eq!(classifier.classify("/src/"), WindowKind::Directory);
        assert_eq!(classifier.classify("/src/+Errors"), WindowKind::Errors);
        assert_eq!(classifier.classify("/src/-box"), WindowKind::Win);
        assert_eq!(classifier.classify("/src/README"), WindowKind::Unknown);
    }

    #[test]
    fn test_longest_suffix_wins() {
        let classifier = WindowClassifier::new(None);
        assert_eq!(classifier.classify("/a/b.cs"), WindowKind::CSharp);
        assert_eq!(classifier.classify("/a/b.hpp"), WindowKind::Cc);
    }

    #[test]
    fn test_no_hostname_means_no_win_kind() {
        let classifier = WindowClassifier::new(None);
        assert_eq!(classifier.classify("/src/-box"), WindowKind::Unknown);
    }

    #[test]
    fn test_area_and_button() {
        let tag_look = Event::new('M', 'l', 0, 3, 0, "Def");
        assert_eq!(which_area(&tag_look), AcmeArea::Tag);
        assert_eq!(which_button(&tag_look), AcmeButton::Three);

        let body_exec = Event::new('M', 'X', 0, 3, 0, "Def");
        assert_eq!(which_area(&body_exec), AcmeArea::Body);
        assert_eq!(which_button(&body_exec), AcmeButton::Two);

        let typed = Event::new('K', 'I', 0, 1, 0, "a");
        assert_eq!(which_button(&typed), AcmeButton::Invalid);

        let odd = Event::new('M', '1', 0, 0, 0, "");
        assert_eq!(which_area(&odd), AcmeArea::Invalid);
    }

    #[test]
    fn test_accepts_tag_clicks_on_commands() {
        assert!(is_command_event(&Event::new('M', 'l', 10, 13, 0, "Def"), COMMANDS));
        assert!(is_command_event(&Event::new('M', 'x', 14, 18, 0, "Refs"), COMMANDS));
    }

    #[test]
    fn test_rejects_everything_else() {
        // Body click.
        assert!(!is_command_event(&Event::new('M', 'L', 10, 13, 0, "Def"), COMMANDS));
        // Acme built-in.
        assert!(!is_command_event(&Event::new('M', 'x', 10, 13, 1, "Def"), COMMANDS));
        // Not one of ours.
        assert!(!is_command_event(&Event::new('M', 'x', 10, 13, 0, "Put"), COMMANDS));
        assert!(!is_command_event(&Event::new('M', 'x', 10, 14, 0, "Def "), COMMANDS));
        // Keyboard insert in the tag.
        assert!(!is_command_event(&Event::new('K', 'i', 10, 13, 0, "Def"), COMMANDS));
    }

    #[test]
    fn test_ide_command_from_event() {
        let command = IdeCommand::from_event(&Event::new('M', 'x', 0, 3, 0, "Def"));
        assert_eq!(command.command, "Def");
        assert_eq!(command.area, AcmeArea::Tag);
        assert_eq!(command.button, AcmeButton::Two);
    }
}

//! Input events as the editor sees them.
//!
//! Platform-agnostic definitions of the raw keyboard and input events that
//! drive editing. `Key` and `Modifiers` describe a keystroke, `InputType`
//! represents the semantic intent from input events (browser beforeinput,
//! native input methods, etc.).

use smol_str::SmolStr;

/// Semantic input types from input events.
///
/// Based on the W3C Input Events specification, but usable across platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    // === Insertion ===
    /// Insert typed text.
    InsertText,
    /// Insert text from IME composition.
    InsertCompositionText,
    /// Insert a line break (`<br>`, Shift+Enter).
    InsertLineBreak,
    /// Insert a paragraph break (Enter).
    InsertParagraph,
    /// Insert from paste operation.
    InsertFromPaste,

    // === Deletion ===
    /// Delete content backward (Backspace).
    DeleteContentBackward,
    /// Delete content forward (Delete key).
    DeleteContentForward,
    /// Delete word backward (Ctrl/Alt+Backspace).
    DeleteWordBackward,
    /// Delete word forward (Ctrl/Alt+Delete).
    DeleteWordForward,
    /// Delete to soft line boundary backward.
    DeleteSoftLineBackward,
    /// Delete to soft line boundary forward.
    DeleteSoftLineForward,
    /// Delete to hard line boundary backward (Cmd+Backspace on Mac).
    DeleteHardLineBackward,
    /// Delete to hard line boundary forward (Cmd+Delete on Mac).
    DeleteHardLineForward,
    /// Delete by cut operation.
    DeleteByCut,
    /// Generic content deletion.
    DeleteContent,

    // === History ===
    HistoryUndo,
    HistoryRedo,

    /// Unrecognized input type.
    Unknown(String),
}

impl InputType {
    /// Parse the `inputType` string of a beforeinput event.
    pub fn parse(s: &str) -> Self {
        match s {
            "insertText" => Self::InsertText,
            "insertCompositionText" => Self::InsertCompositionText,
            "insertLineBreak" => Self::InsertLineBreak,
            "insertParagraph" => Self::InsertParagraph,
            "insertFromPaste" => Self::InsertFromPaste,
            "deleteContentBackward" => Self::DeleteContentBackward,
            "deleteContentForward" => Self::DeleteContentForward,
            "deleteWordBackward" => Self::DeleteWordBackward,
            "deleteWordForward" => Self::DeleteWordForward,
            "deleteSoftLineBackward" => Self::DeleteSoftLineBackward,
            "deleteSoftLineForward" => Self::DeleteSoftLineForward,
            "deleteHardLineBackward" => Self::DeleteHardLineBackward,
            "deleteHardLineForward" => Self::DeleteHardLineForward,
            "deleteByCut" => Self::DeleteByCut,
            "deleteContent" => Self::DeleteContent,
            "historyUndo" => Self::HistoryUndo,
            "historyRedo" => Self::HistoryRedo,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether this input type is a deletion operation.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteContentBackward
                | Self::DeleteContentForward
                | Self::DeleteWordBackward
                | Self::DeleteWordForward
                | Self::DeleteSoftLineBackward
                | Self::DeleteSoftLineForward
                | Self::DeleteHardLineBackward
                | Self::DeleteHardLineForward
                | Self::DeleteByCut
                | Self::DeleteContent
        )
    }
}

/// Keyboard key, following the DOM `KeyboardEvent.key` naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    // === Whitespace / editing ===
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Space,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    // === Modifiers ===
    Alt,
    Control,
    Meta,
    Shift,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn parse(s: &str) -> Self {
        match s {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" => Self::Escape,
            " " => Self::Space,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Alt" => Self::Alt,
            "Control" => Self::Control,
            "Meta" => Self::Meta,
            "Shift" => Self::Shift,
            "" | "Unidentified" => Self::Unidentified,
            other if other.chars().count() == 1 => Self::Character(other.into()),
            _ => Self::Unidentified,
        }
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Alt | Self::Control | Self::Meta | Self::Shift)
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }
}

/// A keydown as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub is_composing: bool,
}

impl KeyboardEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            is_composing: false,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            is_composing: false,
        }
    }

    /// A key that would type a printable character.
    pub fn is_character_value(&self) -> bool {
        !self.modifiers.ctrl
            && !self.modifiers.meta
            && matches!(self.key, Key::Character(_) | Key::Space)
    }
}

/// A beforeinput event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub input_type: InputType,
    pub data: Option<String>,
}

impl InputEvent {
    pub fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            data: None,
        }
    }
}

/// The originating host event of an edit, threaded through to notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    Keyboard(KeyboardEvent),
    Input(InputEvent),
}

impl From<KeyboardEvent> for RawEvent {
    fn from(ev: KeyboardEvent) -> Self {
        RawEvent::Keyboard(ev)
    }
}

impl From<InputEvent> for RawEvent {
    fn from(ev: InputEvent) -> Self {
        RawEvent::Input(ev)
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not ours, let platform handle it.
    NotHandled,
    /// Event should be passed through (navigation, etc.).
    PassThrough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(Key::parse("Backspace"), Key::Backspace);
        assert_eq!(Key::parse(" "), Key::Space);
        assert_eq!(Key::parse("é"), Key::character("é"));
        assert_eq!(Key::parse("F13"), Key::Unidentified);
    }

    #[test]
    fn test_character_value_ignores_shortcuts() {
        let plain = KeyboardEvent::new(Key::character("a"));
        let shortcut = KeyboardEvent::with_modifiers(Key::character("a"), Modifiers::CTRL);
        let shifted = KeyboardEvent::with_modifiers(Key::character("A"), Modifiers::SHIFT);
        assert!(plain.is_character_value());
        assert!(!shortcut.is_character_value());
        assert!(shifted.is_character_value());
        assert!(!KeyboardEvent::new(Key::Enter).is_character_value());
    }

    #[test]
    fn test_parse_input_types() {
        assert_eq!(
            InputType::parse("deleteWordBackward"),
            InputType::DeleteWordBackward
        );
        assert!(InputType::parse("deleteSoftLineForward").is_deletion());
        assert_eq!(
            InputType::parse("formatBold"),
            InputType::Unknown("formatBold".into())
        );
    }
}

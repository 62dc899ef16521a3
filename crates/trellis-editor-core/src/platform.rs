//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the model logic and
//! platform-specific implementations (browser DOM, native UI, an in-memory
//! tree for tests). The same model code drives any of them.

use smol_str::SmolStr;

use crate::actions::{InputType, Key, RawEvent};
use crate::model::RenderNodeId;

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(SmolStr),
    Text,
}

/// A caret position in the render tree: a container and an offset into it.
///
/// For text nodes the offset counts chars, for elements it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePosition {
    pub container: RenderNodeId,
    pub offset: usize,
}

impl TreePosition {
    pub fn new(container: RenderNodeId, offset: usize) -> Self {
        Self { container, offset }
    }
}

/// The host's selection, expressed in render-tree terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSelection {
    Range {
        start: TreePosition,
        end: TreePosition,
        is_reverted: bool,
    },
    Table {
        table: RenderNodeId,
        first_row: usize,
        first_column: usize,
        last_row: usize,
        last_column: usize,
    },
    Image {
        image: RenderNodeId,
    },
}

impl TreeSelection {
    pub fn caret(position: TreePosition) -> Self {
        TreeSelection::Range {
            start: position,
            end: position,
            is_reverted: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, TreeSelection::Range { start, end, .. } if start == end)
    }
}

/// The external, mutable render tree the model is synchronized into.
///
/// Node handles stay valid until the tree drops the node. Inserting a node
/// that already has a parent moves it.
pub trait RenderTree {
    fn create_element(&mut self, tag: &str) -> RenderNodeId;
    fn create_text(&mut self, text: &str) -> RenderNodeId;

    /// `None` when the node does not exist (never created or dropped).
    fn node_kind(&self, node: RenderNodeId) -> Option<NodeKind>;

    /// Own text of a text node, or the concatenated text of an element.
    fn text_content(&self, node: RenderNodeId) -> Option<String>;
    fn set_text(&mut self, node: RenderNodeId, text: &str) -> Result<(), PlatformError>;

    fn attribute(&self, node: RenderNodeId, name: &str) -> Option<SmolStr>;
    fn set_attribute(&mut self, node: RenderNodeId, name: &str, value: &str)
    -> Result<(), PlatformError>;
    fn remove_attribute(&mut self, node: RenderNodeId, name: &str) -> Result<(), PlatformError>;
    fn set_style(&mut self, node: RenderNodeId, name: &str, value: &str)
    -> Result<(), PlatformError>;

    fn classes(&self, node: RenderNodeId) -> Vec<SmolStr>;
    fn has_class(&self, node: RenderNodeId, class: &str) -> bool;
    fn add_class(&mut self, node: RenderNodeId, class: &str) -> Result<(), PlatformError>;
    fn remove_class(&mut self, node: RenderNodeId, class: &str) -> Result<(), PlatformError>;

    fn parent(&self, node: RenderNodeId) -> Option<RenderNodeId>;
    fn children(&self, node: RenderNodeId) -> Vec<RenderNodeId>;

    /// Insert `child` into `parent` before `reference`, or append when
    /// `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: RenderNodeId,
        child: RenderNodeId,
        reference: Option<RenderNodeId>,
    ) -> Result<(), PlatformError>;

    /// Detach `node` from its parent. Detached nodes stay alive.
    fn detach(&mut self, node: RenderNodeId) -> Result<(), PlatformError>;

    fn selection(&self) -> Option<TreeSelection>;
    fn set_selection(&mut self, selection: Option<TreeSelection>);

    fn exists(&self, node: RenderNodeId) -> bool {
        self.node_kind(node).is_some()
    }

    fn tag_name(&self, node: RenderNodeId) -> Option<SmolStr> {
        match self.node_kind(node)? {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text => None,
        }
    }

    fn is_text(&self, node: RenderNodeId) -> bool {
        matches!(self.node_kind(node), Some(NodeKind::Text))
    }

    fn append_child(
        &mut self,
        parent: RenderNodeId,
        child: RenderNodeId,
    ) -> Result<(), PlatformError> {
        self.insert_before(parent, child, None)
    }

    fn child_index(&self, node: RenderNodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    fn first_child(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        self.children(node).first().copied()
    }

    fn next_sibling(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn previous_sibling(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|c| *c == node)?;
        index.checked_sub(1).and_then(|i| siblings.get(i).copied())
    }

    fn next_element_sibling(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        let mut current = self.next_sibling(node);
        while let Some(n) = current {
            if !self.is_text(n) {
                return Some(n);
            }
            current = self.next_sibling(n);
        }
        None
    }

    fn previous_element_sibling(&self, node: RenderNodeId) -> Option<RenderNodeId> {
        let mut current = self.previous_sibling(node);
        while let Some(n) = current {
            if !self.is_text(n) {
                return Some(n);
            }
            current = self.previous_sibling(n);
        }
        None
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn contains(&self, ancestor: RenderNodeId, node: RenderNodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}

/// Maps raw events onto delete gestures.
///
/// Which modifier deletes a word or a whole line differs per platform, so the
/// mapping is pluggable.
pub trait DeleteGesturePolicy {
    fn should_delete_word(&self, event: &RawEvent) -> bool;
    fn should_delete_all_segments_before(&self, event: &RawEvent) -> bool;

    fn is_delete_before(&self, event: &RawEvent) -> bool {
        match event {
            RawEvent::Keyboard(ev) => ev.key == Key::Backspace,
            RawEvent::Input(ev) => matches!(
                ev.input_type,
                InputType::DeleteContentBackward
                    | InputType::DeleteWordBackward
                    | InputType::DeleteSoftLineBackward
                    | InputType::DeleteHardLineBackward
            ),
        }
    }

    fn is_delete_after(&self, event: &RawEvent) -> bool {
        match event {
            RawEvent::Keyboard(ev) => ev.key == Key::Delete,
            RawEvent::Input(ev) => matches!(
                ev.input_type,
                InputType::DeleteContentForward
                    | InputType::DeleteWordForward
                    | InputType::DeleteSoftLineForward
                    | InputType::DeleteHardLineForward
            ),
        }
    }
}

/// Host platform description used for the default delete gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Platform {
    pub mac: bool,
}

impl Platform {
    pub fn new(mac: bool) -> Self {
        Self { mac }
    }
}

impl DeleteGesturePolicy for Platform {
    /// Option+Delete on mac, Ctrl+Delete elsewhere.
    fn should_delete_word(&self, event: &RawEvent) -> bool {
        match event {
            RawEvent::Keyboard(ev) => {
                let m = ev.modifiers;
                if self.mac {
                    m.alt && !m.meta
                } else {
                    m.ctrl && !m.alt
                }
            }
            RawEvent::Input(ev) => matches!(
                ev.input_type,
                InputType::DeleteWordBackward | InputType::DeleteWordForward
            ),
        }
    }

    fn should_delete_all_segments_before(&self, event: &RawEvent) -> bool {
        match event {
            RawEvent::Keyboard(ev) => ev.modifiers.meta && !ev.modifiers.alt,
            RawEvent::Input(ev) => matches!(
                ev.input_type,
                InputType::DeleteSoftLineBackward
                    | InputType::DeleteSoftLineForward
                    | InputType::DeleteHardLineBackward
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{InputEvent, KeyboardEvent, Modifiers};

    fn key(key: Key, modifiers: Modifiers) -> RawEvent {
        KeyboardEvent::with_modifiers(key, modifiers).into()
    }

    #[test]
    fn test_word_gesture_per_platform() {
        let mac = Platform::new(true);
        let other = Platform::new(false);
        let alt = key(Key::Backspace, Modifiers::ALT);
        let ctrl = key(Key::Backspace, Modifiers::CTRL);
        assert!(mac.should_delete_word(&alt));
        assert!(!mac.should_delete_word(&ctrl));
        assert!(other.should_delete_word(&ctrl));
        assert!(!other.should_delete_word(&alt));
    }

    #[test]
    fn test_line_gesture() {
        let policy = Platform::new(true);
        assert!(policy.should_delete_all_segments_before(&key(Key::Backspace, Modifiers::META)));
        let input: RawEvent = InputEvent::new(InputType::DeleteSoftLineBackward).into();
        assert!(policy.should_delete_all_segments_before(&input));
        assert!(policy.is_delete_before(&input));
    }

    #[test]
    fn test_direction_from_input_type() {
        let policy = Platform::default();
        let forward: RawEvent = InputEvent::new(InputType::DeleteWordForward).into();
        assert!(policy.is_delete_after(&forward));
        assert!(!policy.is_delete_before(&forward));
        assert!(policy.should_delete_word(&forward));
    }
}

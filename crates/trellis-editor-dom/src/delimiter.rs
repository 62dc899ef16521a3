//! Tree-side maintenance of the caret anchors around entities.
//!
//! A delimiter is a `span` carrying [`DELIMITER_BEFORE_CLASS`] or
//! [`DELIMITER_AFTER_CLASS`] whose only content is a zero-width space. The
//! synchronizer places them around read-only entities; this module keeps them
//! honest when the host edits the tree behind the model's back, and decides
//! what a keypress landing in one should do.

use smol_str::SmolStr;
use trellis_editor_core::render::{
    BLOCK_ENTITY_CONTAINER_CLASS, DELIMITER_AFTER_CLASS, DELIMITER_BEFORE_CLASS, ENTITY_CLASS,
    ENTITY_ID_PREFIX, ENTITY_READONLY_CLASS, ENTITY_TYPE_PREFIX,
};
use trellis_editor_core::{
    EditorOptions, Entity, Key, KeyboardEvent, RenderNodeId, RenderTree, TreePosition,
    TreeSelection, ZERO_WIDTH_SPACE,
};

use crate::error::Result;

/// Which side of its entity a delimiter element sits on, if it is one.
///
/// Only the class is checked; see [`is_entity_delimiter`] for the content.
pub fn delimiter_side<T: RenderTree + ?Sized>(tree: &T, node: RenderNodeId) -> Option<bool> {
    if tree.has_class(node, DELIMITER_BEFORE_CLASS) {
        Some(true)
    } else if tree.has_class(node, DELIMITER_AFTER_CLASS) {
        Some(false)
    } else {
        None
    }
}

/// A well-formed delimiter: the class plus exactly one zero-width space.
pub fn is_entity_delimiter<T: RenderTree + ?Sized>(tree: &T, node: RenderNodeId) -> bool {
    delimiter_side(tree, node).is_some()
        && tree
            .text_content(node)
            .is_some_and(|text| text.chars().eq(std::iter::once(ZERO_WIDTH_SPACE)))
}

/// Read the entity an element wraps back out of its classes.
pub fn parse_entity_format<T: RenderTree + ?Sized>(
    tree: &T,
    wrapper: RenderNodeId,
) -> Option<Entity> {
    if !tree.has_class(wrapper, ENTITY_CLASS) {
        return None;
    }
    let mut entity_type: Option<SmolStr> = None;
    let mut id = SmolStr::default();
    let mut is_readonly = false;
    for class in tree.classes(wrapper) {
        if class == ENTITY_READONLY_CLASS {
            is_readonly = true;
        } else if let Some(t) = class.strip_prefix(ENTITY_TYPE_PREFIX) {
            entity_type = Some(t.into());
        } else if let Some(i) = class.strip_prefix(ENTITY_ID_PREFIX) {
            id = i.into();
        }
    }
    Some(Entity::new(id, entity_type?, is_readonly, wrapper))
}

/// Stray text pulled out of a delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcisedText {
    /// The former delimiter element. It no longer carries a delimiter class.
    pub node: RenderNodeId,
    pub text: String,
    pub before: bool,
}

/// What a content-changed scan did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimiterScan {
    /// Delimiters detached because no entity was next to them.
    pub removed: Vec<RenderNodeId>,
    /// Delimiters created for entities that had lost theirs.
    pub added: Vec<RenderNodeId>,
    pub excised: Vec<ExcisedText>,
}

impl DelimiterScan {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.excised.is_empty()
    }
}

/// Elements below `root`, in document order.
fn descendant_elements<T: RenderTree + ?Sized>(tree: &T, root: RenderNodeId) -> Vec<RenderNodeId> {
    let mut found = Vec::new();
    let mut stack = tree.children(root);
    stack.reverse();
    while let Some(node) = stack.pop() {
        if tree.is_text(node) {
            continue;
        }
        found.push(node);
        stack.extend(tree.children(node).into_iter().rev());
    }
    found
}

fn is_next_to_entity<T: RenderTree + ?Sized>(
    tree: &T,
    delimiter: RenderNodeId,
    before: bool,
) -> bool {
    let sibling = if before {
        tree.next_element_sibling(delimiter)
    } else {
        tree.previous_element_sibling(delimiter)
    };
    sibling.is_some_and(|s| tree.has_class(s, ENTITY_CLASS))
}

/// Rescan every delimiter under `root` after the host changed the tree.
///
/// Delimiters holding more than their zero-width space lose their delimiter
/// class and give up that text, reported in [`DelimiterScan::excised`] for the
/// caller to put back into the model. Delimiters with no entity beside them
/// are detached. With delimiters enabled, read-only entities missing one get
/// a fresh one.
pub fn handle_delimiter_content_changed<T: RenderTree + ?Sized>(
    tree: &mut T,
    root: RenderNodeId,
    options: &EditorOptions,
) -> Result<DelimiterScan> {
    let mut scan = DelimiterScan::default();

    for node in descendant_elements(tree, root) {
        let Some(before) = delimiter_side(tree, node) else {
            continue;
        };
        if !is_entity_delimiter(tree, node) {
            let text: String = tree
                .text_content(node)
                .unwrap_or_default()
                .chars()
                .filter(|c| *c != ZERO_WIDTH_SPACE)
                .collect();
            tree.remove_class(node, DELIMITER_BEFORE_CLASS)?;
            tree.remove_class(node, DELIMITER_AFTER_CLASS)?;
            for child in tree.children(node) {
                tree.detach(child)?;
            }
            if text.is_empty() {
                tree.detach(node)?;
                scan.removed.push(node);
            } else {
                let text_node = tree.create_text(&text);
                tree.append_child(node, text_node)?;
                scan.excised.push(ExcisedText { node, text, before });
            }
            continue;
        }
        if !is_next_to_entity(tree, node, before) {
            tree.detach(node)?;
            scan.removed.push(node);
        }
    }

    if options.add_delimiter_for_entity {
        for wrapper in descendant_elements(tree, root) {
            let readonly = tree.has_class(wrapper, ENTITY_CLASS)
                && tree.has_class(wrapper, ENTITY_READONLY_CLASS);
            let Some(parent) = tree.parent(wrapper).filter(|_| readonly) else {
                continue;
            };
            let has_before = tree
                .previous_element_sibling(wrapper)
                .is_some_and(|s| tree.has_class(s, DELIMITER_BEFORE_CLASS));
            if !has_before {
                let delimiter = create_delimiter(tree, true)?;
                tree.insert_before(parent, delimiter, Some(wrapper))?;
                scan.added.push(delimiter);
            }
            let has_after = tree
                .next_element_sibling(wrapper)
                .is_some_and(|s| tree.has_class(s, DELIMITER_AFTER_CLASS));
            if !has_after {
                let delimiter = create_delimiter(tree, false)?;
                let next = tree.next_sibling(wrapper);
                tree.insert_before(parent, delimiter, next)?;
                scan.added.push(delimiter);
            }
        }
    }

    if !scan.is_empty() {
        tracing::debug!(
            target: "trellis::entity",
            removed = scan.removed.len(),
            added = scan.added.len(),
            excised = scan.excised.len(),
            "delimiters rescanned"
        );
    }
    Ok(scan)
}

fn create_delimiter<T: RenderTree + ?Sized>(tree: &mut T, before: bool) -> Result<RenderNodeId> {
    let span = tree.create_element("span");
    tree.add_class(
        span,
        if before {
            DELIMITER_BEFORE_CLASS
        } else {
            DELIMITER_AFTER_CLASS
        },
    )?;
    let text = tree.create_text(&ZERO_WIDTH_SPACE.to_string());
    tree.append_child(span, text)?;
    Ok(span)
}

/// What a keydown near a delimiter still needs from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelimiterKeyAction {
    /// Nothing to do with delimiters.
    None,
    /// The caret left an inline delimiter; the host may insert the character.
    LeftInlineDelimiter,
    /// The caret was in `delimiter` of a block entity and now sits beside
    /// its container.
    BlockDelimiter { delimiter: RenderNodeId, enter: bool },
    /// Enter in `delimiter` of an inline entity. The caret is already
    /// outside the delimiter.
    EnterInlineEntity { delimiter: RenderNodeId },
    /// An arrow key that may need to hop over an entity.
    AdjustSelection { key: Key, shift: bool },
    /// Enter with an entity selected.
    ClickEntity(Entity),
}

/// The delimiter element a collapsed caret sits in, if any.
fn focused_delimiter<T: RenderTree + ?Sized>(
    tree: &T,
    position: TreePosition,
) -> Option<RenderNodeId> {
    let TreePosition { container, offset } = position;
    let candidate = if tree.is_text(container) {
        tree.parent(container)?
    } else if delimiter_side(tree, container).is_some() {
        container
    } else {
        *tree.children(container).get(offset.checked_sub(1)?)?
    };
    delimiter_side(tree, candidate).map(|_| candidate)
}

fn entity_wrapper_around<T: RenderTree + ?Sized>(
    tree: &T,
    position: TreePosition,
) -> Option<RenderNodeId> {
    let start = if tree.is_text(position.container) {
        Some(position.container)
    } else {
        tree.children(position.container)
            .get(position.offset)
            .copied()
            .or(Some(position.container))
    };
    let mut current = start;
    while let Some(node) = current {
        if tree.has_class(node, ENTITY_CLASS) {
            return Some(node);
        }
        current = tree.parent(node);
    }
    None
}

fn place_caret_beside<T: RenderTree + ?Sized>(
    tree: &mut T,
    node: RenderNodeId,
    after: bool,
) -> bool {
    let (Some(parent), Some(index)) = (tree.parent(node), tree.child_index(node)) else {
        return false;
    };
    let position = TreePosition::new(parent, index + usize::from(after));
    tree.set_selection(Some(TreeSelection::caret(position)));
    true
}

/// Run the tree side of a keydown that may involve a delimiter.
///
/// Repositions the host caret where needed and reports what the model still
/// has to do.
pub fn handle_delimiter_keydown<T: RenderTree + ?Sized>(
    tree: &mut T,
    event: &KeyboardEvent,
) -> DelimiterKeyAction {
    let modifiers = event.modifiers;
    if matches!(event.key, Key::ArrowLeft | Key::ArrowRight) {
        if modifiers.ctrl || modifiers.alt || modifiers.meta {
            return DelimiterKeyAction::None;
        }
        return DelimiterKeyAction::AdjustSelection {
            key: event.key.clone(),
            shift: modifiers.shift,
        };
    }

    let Some(TreeSelection::Range { start, end, .. }) = tree.selection() else {
        return DelimiterKeyAction::None;
    };
    let is_enter = event.key == Key::Enter && !(modifiers.ctrl || modifiers.alt || modifiers.meta);

    if start != end {
        if !is_enter {
            return DelimiterKeyAction::None;
        }
        return entity_wrapper_around(tree, start)
            .and_then(|wrapper| parse_entity_format(tree, wrapper))
            .map_or(DelimiterKeyAction::None, DelimiterKeyAction::ClickEntity);
    }

    if !(is_enter || event.is_character_value()) {
        return DelimiterKeyAction::None;
    }
    let Some(delimiter) = focused_delimiter(tree, start) else {
        return DelimiterKeyAction::None;
    };
    let before = delimiter_side(tree, delimiter).unwrap_or(true);

    let block_container = tree
        .parent(delimiter)
        .filter(|p| tree.has_class(*p, BLOCK_ENTITY_CONTAINER_CLASS));
    let action = match block_container {
        Some(container) => {
            if !place_caret_beside(tree, container, !before) {
                return DelimiterKeyAction::None;
            }
            DelimiterKeyAction::BlockDelimiter {
                delimiter,
                enter: is_enter,
            }
        }
        None => {
            if !place_caret_beside(tree, delimiter, !before) {
                return DelimiterKeyAction::None;
            }
            if is_enter {
                DelimiterKeyAction::EnterInlineEntity { delimiter }
            } else {
                DelimiterKeyAction::LeftInlineDelimiter
            }
        }
    };
    tracing::trace!(target: "trellis::entity", ?delimiter, before, ?action, "keydown in delimiter");
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_editor_core::Modifiers;

    use crate::tree::MemoryTree;

    /// `<div><span.before/><span.entity/><span.after/></div>`
    fn inline_entity(tree: &mut MemoryTree) -> (RenderNodeId, RenderNodeId) {
        let root = tree.create_element("div");
        let wrapper = tree.create_element("span");
        for class in [ENTITY_CLASS, "_EType_mention", "_EId_m1", ENTITY_READONLY_CLASS] {
            tree.add_class(wrapper, class).unwrap();
        }
        let before = create_delimiter(tree, true).unwrap();
        let after = create_delimiter(tree, false).unwrap();
        tree.append_child(root, before).unwrap();
        tree.append_child(root, wrapper).unwrap();
        tree.append_child(root, after).unwrap();
        (root, wrapper)
    }

    #[test]
    fn test_parse_entity_format() {
        let mut tree = MemoryTree::new();
        let (_, wrapper) = inline_entity(&mut tree);
        let entity = parse_entity_format(&tree, wrapper).unwrap();
        assert_eq!(entity, Entity::new("m1", "mention", true, wrapper));
    }

    #[test]
    fn test_scan_keeps_valid_delimiters() {
        let mut tree = MemoryTree::new();
        let (root, _) = inline_entity(&mut tree);
        let scan =
            handle_delimiter_content_changed(&mut tree, root, &EditorOptions::default()).unwrap();
        assert!(scan.is_empty());
        assert_eq!(tree.children(root).len(), 3);
    }

    #[test]
    fn test_scan_excises_typed_text() {
        let mut tree = MemoryTree::new();
        let (root, wrapper) = inline_entity(&mut tree);
        let after = tree.next_sibling(wrapper).unwrap();
        let text = tree.first_child(after).unwrap();
        tree.set_text(text, "\u{200B}xy").unwrap();

        let scan =
            handle_delimiter_content_changed(&mut tree, root, &EditorOptions::default()).unwrap();
        assert_eq!(
            scan.excised,
            vec![ExcisedText {
                node: after,
                text: "xy".into(),
                before: false,
            }]
        );
        assert_eq!(scan.added.len(), 1);
        // before, wrapper, fresh after anchor, the former anchor with its text
        assert_eq!(tree.children(root).len(), 4);
        assert_eq!(tree.text_content(after).as_deref(), Some("xy"));
    }

    #[test]
    fn test_keydown_in_after_delimiter_moves_caret_out() {
        let mut tree = MemoryTree::new();
        let (root, wrapper) = inline_entity(&mut tree);
        let after = tree.next_sibling(wrapper).unwrap();
        let text = tree.first_child(after).unwrap();
        tree.set_selection(Some(TreeSelection::caret(TreePosition::new(text, 1))));

        let action = handle_delimiter_keydown(&mut tree, &KeyboardEvent::new(Key::character("a")));
        assert_eq!(action, DelimiterKeyAction::LeftInlineDelimiter);
        assert_eq!(
            tree.selection(),
            Some(TreeSelection::caret(TreePosition::new(root, 3)))
        );
    }

    #[test]
    fn test_word_arrow_is_not_adjusted() {
        let mut tree = MemoryTree::new();
        inline_entity(&mut tree);
        let event = KeyboardEvent::with_modifiers(Key::ArrowLeft, Modifiers::CTRL);
        assert_eq!(handle_delimiter_keydown(&mut tree, &event), DelimiterKeyAction::None);
    }
}

//! Selection readback from the render tree into the model.
//!
//! Tree positions are resolved through the [`RenderIndex`] built by the last
//! sync. Positions inside a delimiter map to the outside of its entity, and
//! positions between block elements map to block boundaries.

use trellis_editor_core::{
    Block, BlockLocation, CellCoordinate, DelimiterOwner, Document, IndexEntry, ModelPosition,
    RawEvent, RenderIndex, RenderNodeId, RenderTree, SelectionContext, TreePosition,
    TreeSelection,
};
use trellis_editor_core::platform::DeleteGesturePolicy;
use trellis_editor_core::render::{DELIMITER_AFTER_CLASS, DELIMITER_BEFORE_CLASS};

/// Read a [`SelectionContext`] out of a tree selection.
///
/// `None` when the selection touches nodes the last sync did not produce.
pub fn tree_selection_to_model<T: RenderTree + ?Sized>(
    tree: &T,
    index: &RenderIndex,
    doc: &Document,
    selection: &TreeSelection,
) -> Option<SelectionContext> {
    let reader = Reader { tree, index, doc };
    let context = match selection {
        TreeSelection::Image { image } => match index.get(*image)? {
            IndexEntry::Segment(location) => SelectionContext::Image {
                image: location.clone(),
            },
            _ => return None,
        },
        TreeSelection::Table {
            table,
            first_row,
            first_column,
            last_row,
            last_column,
        } => match index.get(*table)? {
            IndexEntry::Block(location) => SelectionContext::Table {
                table: location.clone(),
                first_cell: CellCoordinate::new(*first_row, *first_column),
                last_cell: CellCoordinate::new(*last_row, *last_column),
            },
            _ => return None,
        },
        TreeSelection::Range { start, end, .. } => {
            let start = reader.position(*start)?;
            let end = reader.position(*end)?;
            SelectionContext::Range { start, end }
        }
    };
    tracing::trace!(target: "trellis::editor", ?context, "selection read from tree");
    Some(context)
}

struct Reader<'a, T: RenderTree + ?Sized> {
    tree: &'a T,
    index: &'a RenderIndex,
    doc: &'a Document,
}

impl<T: RenderTree + ?Sized> Reader<'_, T> {
    fn position(&self, position: TreePosition) -> Option<ModelPosition> {
        let TreePosition { container, offset } = position;
        match self.index.get(container) {
            Some(IndexEntry::Text(location)) => Some(ModelPosition::in_text(
                location.block.clone(),
                location.index,
                offset,
            )),
            Some(IndexEntry::Delimiter { owner, before }) => {
                Some(delimiter_position(owner, *before))
            }
            Some(IndexEntry::Segment(location)) => Some(ModelPosition::at(
                location.block.clone(),
                location.index + usize::from(offset > 0),
            )),
            _ if self.tree.is_text(container) => self.inside_unindexed(container),
            entry => {
                let children = self.tree.children(container);
                if let Some(child) = children.get(offset) {
                    return self.before(*child);
                }
                if let Some(child) = offset.checked_sub(1).and_then(|i| children.get(i)) {
                    return self.after(*child);
                }
                match entry {
                    Some(IndexEntry::Group(path)) => Some(ModelPosition::before_block(
                        BlockLocation::new(path.clone(), 0),
                    )),
                    Some(IndexEntry::Block(location)) => Some(self.start_of_block(location)),
                    _ => self.inside_unindexed(container),
                }
            }
        }
    }

    /// A position inside a node the sync did not index (entity content,
    /// host text) resolves against its nearest indexed ancestor.
    fn inside_unindexed(&self, node: RenderNodeId) -> Option<ModelPosition> {
        let mut current = self.tree.parent(node);
        while let Some(ancestor) = current {
            match self.index.get(ancestor) {
                Some(IndexEntry::Segment(location)) => {
                    return Some(ModelPosition::at(location.block.clone(), location.index));
                }
                Some(IndexEntry::Delimiter { owner, before }) => {
                    return Some(delimiter_position(owner, *before));
                }
                Some(IndexEntry::Block(location)) => return Some(self.start_of_block(location)),
                Some(IndexEntry::Text(_) | IndexEntry::Group(_)) => return None,
                None => current = self.tree.parent(ancestor),
            }
        }
        None
    }

    fn start_of_block(&self, location: &BlockLocation) -> ModelPosition {
        match self.doc.block_at(location) {
            Some(Block::Paragraph(_)) => ModelPosition::at(location.clone(), 0),
            _ => ModelPosition::before_block(location.clone()),
        }
    }

    fn end_of_block(&self, location: &BlockLocation) -> ModelPosition {
        match self.doc.block_at(location) {
            Some(Block::Paragraph(p)) => ModelPosition::at(location.clone(), p.segments.len()),
            _ => ModelPosition::before_block(location.with_index(location.index + 1)),
        }
    }

    fn before(&self, node: RenderNodeId) -> Option<ModelPosition> {
        match self.index.get(node) {
            Some(IndexEntry::Segment(location)) => {
                Some(ModelPosition::at(location.block.clone(), location.index))
            }
            Some(IndexEntry::Text(location)) => Some(ModelPosition::in_text(
                location.block.clone(),
                location.index,
                0,
            )),
            Some(IndexEntry::Delimiter { owner, before }) => {
                Some(delimiter_position(owner, *before))
            }
            Some(IndexEntry::Block(location)) => Some(self.start_of_block(location)),
            Some(IndexEntry::Group(path)) => match self.tree.first_child(node) {
                Some(child) => self.before(child),
                None => Some(ModelPosition::before_block(BlockLocation::new(path.clone(), 0))),
            },
            None => self.before(self.tree.first_child(node)?),
        }
    }

    fn after(&self, node: RenderNodeId) -> Option<ModelPosition> {
        match self.index.get(node) {
            Some(IndexEntry::Segment(location)) => {
                Some(ModelPosition::at(location.block.clone(), location.index + 1))
            }
            Some(IndexEntry::Text(location)) => {
                let len = self.tree.text_content(node)?.chars().count();
                Some(ModelPosition::in_text(
                    location.block.clone(),
                    location.index,
                    len,
                ))
            }
            Some(IndexEntry::Delimiter { owner, before }) => {
                Some(delimiter_position(owner, *before))
            }
            Some(IndexEntry::Block(location)) => Some(self.end_of_block(location)),
            Some(IndexEntry::Group(path)) => match self.tree.children(node).last() {
                Some(child) => self.after(*child),
                None => Some(ModelPosition::before_block(BlockLocation::new(path.clone(), 0))),
            },
            None => self.after(*self.tree.children(node).last()?),
        }
    }
}

/// A caret in a delimiter sits just outside its entity.
pub(crate) fn delimiter_position(owner: &DelimiterOwner, before: bool) -> ModelPosition {
    match owner {
        DelimiterOwner::Inline(location) => ModelPosition::at(
            location.block.clone(),
            location.index + usize::from(!before),
        ),
        DelimiterOwner::Block(location) => ModelPosition::before_block(if before {
            location.clone()
        } else {
            location.with_index(location.index + 1)
        }),
    }
}

/// Whether a delete should go through the model rather than the host.
///
/// A collapsed single-character delete well inside a text node is left to the
/// host; everything else (ranges, word and line gestures, deletes that reach a
/// node boundary, carets in delimiters) runs through the model.
pub fn should_delete_with_model<T: RenderTree + ?Sized>(
    tree: &T,
    selection: &TreeSelection,
    raw_event: &RawEvent,
    policy: &dyn DeleteGesturePolicy,
) -> bool {
    let TreeSelection::Range { start, end, .. } = selection else {
        return true;
    };
    if start != end
        || policy.should_delete_word(raw_event)
        || policy.should_delete_all_segments_before(raw_event)
    {
        return true;
    }
    let node = start.container;
    if !tree.is_text(node) {
        return true;
    }
    let in_delimiter = tree.parent(node).is_some_and(|p| {
        tree.has_class(p, DELIMITER_BEFORE_CLASS) || tree.has_class(p, DELIMITER_AFTER_CLASS)
    });
    if in_delimiter {
        return true;
    }
    let len = tree
        .text_content(node)
        .map(|t| t.chars().count())
        .unwrap_or(0);
    if policy.is_delete_after(raw_event) {
        start.offset + 1 >= len
    } else {
        start.offset <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_editor_core::{
        EditorOptions, Entity, Key, KeyboardEvent, Platform, Segment, SegmentLocation,
        content_model_to_tree,
    };
    use trellis_editor_core::model::BlockGroup;

    use crate::tree::MemoryTree;

    fn rendered(doc: &mut Document) -> (MemoryTree, RenderNodeId, RenderIndex) {
        let mut tree = MemoryTree::new();
        let root = tree.create_element("div");
        let result = content_model_to_tree(&mut tree, root, doc, &EditorOptions::default())
            .expect("render");
        (tree, root, result.index)
    }

    #[test]
    fn test_text_position_maps_to_segment_offset() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("abc"),
        ])]);
        let (tree, root, index) = rendered(&mut doc);
        let paragraph = tree.first_child(root).unwrap();
        let span = tree.first_child(paragraph).unwrap();
        let text = tree.first_child(span).unwrap();

        let selection = TreeSelection::caret(TreePosition::new(text, 2));
        assert_eq!(
            tree_selection_to_model(&tree, &index, &doc, &selection),
            Some(SelectionContext::caret(ModelPosition::in_text(
                BlockLocation::top(0),
                0,
                2
            )))
        );
    }

    #[test]
    fn test_delimiter_maps_outside_entity() {
        let mut tree = MemoryTree::new();
        let root = tree.create_element("div");
        let wrapper = tree.create_element("span");
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("a"),
            Segment::entity(Entity::new("e1", "mention", true, wrapper)),
        ])]);
        let result = content_model_to_tree(&mut tree, root, &mut doc, &EditorOptions::default())
            .expect("render");

        let after = tree.next_sibling(wrapper).unwrap();
        let after_text = tree.first_child(after).unwrap();
        let selection = TreeSelection::caret(TreePosition::new(after_text, 1));
        assert_eq!(
            tree_selection_to_model(&tree, &result.index, &doc, &selection),
            Some(SelectionContext::caret(ModelPosition::Segment {
                location: SegmentLocation::new(BlockLocation::top(0), 2),
                offset: 0,
            }))
        );
    }

    #[test]
    fn test_caret_inside_text_is_left_to_host() {
        let mut tree = MemoryTree::new();
        let root = tree.create_element("div");
        let text = tree.create_text("hello");
        tree.append_child(root, text).unwrap();
        let policy = Platform::new(false);
        let backspace: RawEvent = KeyboardEvent::new(Key::Backspace).into();
        let delete: RawEvent = KeyboardEvent::new(Key::Delete).into();

        let mid = TreeSelection::caret(TreePosition::new(text, 3));
        assert!(!should_delete_with_model(&tree, &mid, &backspace, &policy));
        assert!(!should_delete_with_model(&tree, &mid, &delete, &policy));

        let start = TreeSelection::caret(TreePosition::new(text, 1));
        assert!(should_delete_with_model(&tree, &start, &backspace, &policy));
        let end = TreeSelection::caret(TreePosition::new(text, 4));
        assert!(should_delete_with_model(&tree, &end, &delete, &policy));
    }
}

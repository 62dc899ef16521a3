//! Model-side handling of entities and the caret anchors around them.
//!
//! The render side keeps a zero-width delimiter on each side of a read-only
//! inline entity so the caret has somewhere to sit. These handlers cover the
//! edits that land in or next to those delimiters.

use crate::actions::Key;
use crate::error::{ModelError, Result};
use crate::execute::FormatContext;
use crate::model::{
    Block, BlockGroupKind, Document, Paragraph, Segment, SegmentKind, ZERO_WIDTH_SPACE,
};
use crate::selection::find_insert_point;

/// A keypress in the gap before or after a block entity.
///
/// The implicit paragraph hosting the caret there becomes an explicit one
/// with a line break ahead of the caret, so typed content gets a real line.
pub fn handle_key_down_in_block_delimiter(doc: &mut Document) -> Result<bool> {
    let Some(insert_point) = find_insert_point(doc) else {
        return Ok(false);
    };
    let location = &insert_point.paragraph;
    let group = doc
        .group_at(&location.group)
        .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
    let next_to_entity = [location.index.checked_sub(1), Some(location.index + 1)]
        .into_iter()
        .flatten()
        .any(|i| matches!(group.blocks.get(i), Some(Block::Entity(_))));
    if !next_to_entity {
        return Ok(false);
    }

    let paragraph = doc
        .paragraph_at_mut(location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;
    if !paragraph.is_implicit {
        return Ok(false);
    }
    let format = paragraph.segments[insert_point.marker_index].format.clone();
    paragraph
        .segments
        .insert(insert_point.marker_index, Segment::br().with_format(format));
    paragraph.is_implicit = false;
    tracing::debug!(target: "trellis::entity", ?location, "block delimiter keydown");
    Ok(true)
}

/// Enter pressed in the delimiter of an inline entity.
///
/// Splits the caret paragraph in two. Declines inside list items, where the
/// host's own list continuation applies.
pub fn handle_enter_inline_entity(doc: &mut Document) -> Result<bool> {
    let Some(insert_point) = find_insert_point(doc) else {
        return Ok(false);
    };
    let location = insert_point.paragraph.clone();
    if doc
        .closest_ancestor(
            &location.group,
            BlockGroupKind::is_list_item,
            BlockGroupKind::is_table_cell,
        )
        .is_some()
    {
        return Ok(false);
    }

    let paragraph = doc
        .paragraph_at_mut(&location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;
    let after = paragraph.segments.split_off(insert_point.marker_index);
    let mut new_paragraph = Paragraph {
        format: paragraph.format.clone(),
        segment_format: paragraph.segment_format.clone(),
        decorator: paragraph.decorator.clone(),
        ..Paragraph::new(false)
    };
    let before_is_blank = paragraph
        .segments
        .iter()
        .all(|s| s.is_marker() || s.is_br());
    let after_is_blank = after.iter().all(Segment::is_marker);
    if before_is_blank || after_is_blank {
        new_paragraph.segments.push(Segment::br());
    }
    new_paragraph.segments.extend(after);
    paragraph.is_implicit = false;

    let group = doc
        .group_at_mut(&location.group)
        .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
    group
        .blocks
        .insert(location.index + 1, Block::Paragraph(new_paragraph));
    tracing::debug!(target: "trellis::entity", ?location, "enter next to inline entity");
    Ok(true)
}

/// Strip zero-width spaces that were typed through into delimiter text.
pub fn prevent_type_in_delimiter(doc: &mut Document, context: &mut FormatContext) -> bool {
    context.skip_undo_snapshot = true;
    let mut changed = false;
    for location in doc.paragraph_locations() {
        let Some(paragraph) = doc.paragraph_at_mut(&location) else {
            continue;
        };
        if !paragraph.has_selection() {
            continue;
        }
        for segment in &mut paragraph.segments {
            if let SegmentKind::Text(text) = &mut segment.kind {
                if text.contains(ZERO_WIDTH_SPACE) {
                    text.retain(|c| c != ZERO_WIDTH_SPACE);
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Move the caret over an inline entity as a single unit.
///
/// With `shift`, the entity becomes the selection instead.
pub fn adjust_selection_around_entity(doc: &mut Document, key: &Key, shift: bool) -> Result<bool> {
    let forward = match key {
        Key::ArrowRight => true,
        Key::ArrowLeft => false,
        _ => return Ok(false),
    };
    let Some(insert_point) = find_insert_point(doc) else {
        return Ok(false);
    };
    let marker = insert_point.marker_index;
    let paragraph = doc
        .paragraph_at_mut(&insert_point.paragraph)
        .ok_or_else(|| ModelError::NotAParagraph(insert_point.paragraph.clone()))?;
    let neighbour = if forward {
        marker + 1
    } else {
        match marker.checked_sub(1) {
            Some(i) => i,
            None => return Ok(false),
        }
    };
    if !paragraph
        .segments
        .get(neighbour)
        .is_some_and(|s| s.as_entity().is_some())
    {
        return Ok(false);
    }

    if shift {
        paragraph.segments.remove(marker);
        let entity_index = if forward { neighbour - 1 } else { neighbour };
        paragraph.segments[entity_index].is_selected = true;
    } else {
        paragraph.segments.swap(marker, neighbour);
    }
    tracing::trace!(target: "trellis::entity", forward, shift, "caret moved over entity");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ListLevel, ListType};
    use crate::model::{BlockGroup, BlockLocation, Entity, RenderNodeId};
    use crate::selection::InsertPoint;

    fn entity() -> Entity {
        Entity::new("e1", "mention", true, RenderNodeId(7))
    }

    fn segments(doc: &Document, index: usize) -> Vec<Segment> {
        doc.blocks[index].as_paragraph().unwrap().segments.clone()
    }

    #[test]
    fn test_block_delimiter_keydown_adds_line() {
        let mut doc = BlockGroup::document().with_blocks(vec![
            Block::entity(entity()),
            Block::Paragraph(Paragraph::implicit(vec![Segment::marker()])),
        ]);
        assert!(handle_key_down_in_block_delimiter(&mut doc).unwrap());
        let p = doc.blocks[1].as_paragraph().unwrap();
        assert!(!p.is_implicit);
        assert_eq!(p.segments, vec![Segment::br(), Segment::marker()]);
    }

    #[test]
    fn test_block_delimiter_ignores_plain_paragraphs() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("x"),
            Segment::marker(),
        ])]);
        assert!(!handle_key_down_in_block_delimiter(&mut doc).unwrap());
    }

    #[test]
    fn test_enter_after_inline_entity_at_end() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("a"),
            Segment::entity(entity()),
            Segment::marker(),
        ])]);
        assert!(handle_enter_inline_entity(&mut doc).unwrap());
        assert_eq!(
            segments(&doc, 0),
            vec![Segment::text("a"), Segment::entity(entity())]
        );
        assert_eq!(segments(&doc, 1), vec![Segment::br(), Segment::marker()]);
    }

    #[test]
    fn test_enter_declines_in_list_item() {
        let item = BlockGroup::list_item(vec![ListLevel::new(ListType::Unordered)]).with_blocks(
            vec![Block::paragraph(vec![
                Segment::entity(entity()),
                Segment::marker(),
            ])],
        );
        let mut doc = BlockGroup::document().with_blocks(vec![Block::Group(item)]);
        assert!(!handle_enter_inline_entity(&mut doc).unwrap());
    }

    #[test]
    fn test_prevent_type_strips_zero_width_space() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::entity(entity()),
            Segment::text("\u{200B}x"),
            Segment::marker(),
        ])]);
        let mut ctx = FormatContext::default();
        assert!(prevent_type_in_delimiter(&mut doc, &mut ctx));
        assert!(ctx.skip_undo_snapshot);
        assert_eq!(segments(&doc, 0)[1], Segment::text("x"));
    }

    #[test]
    fn test_arrow_jumps_over_entity() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::marker(),
            Segment::entity(entity()),
            Segment::text("b"),
        ])]);
        assert!(adjust_selection_around_entity(&mut doc, &Key::ArrowRight, false).unwrap());
        assert_eq!(
            find_insert_point(&doc).unwrap(),
            InsertPoint {
                paragraph: BlockLocation::top(0),
                marker_index: 1
            }
        );
        assert!(!adjust_selection_around_entity(&mut doc, &Key::ArrowRight, false).unwrap());
    }

    #[test]
    fn test_shift_arrow_selects_entity() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("a"),
            Segment::entity(entity()),
            Segment::marker(),
        ])]);
        assert!(adjust_selection_around_entity(&mut doc, &Key::ArrowLeft, true).unwrap());
        let segs = segments(&doc, 0);
        assert_eq!(segs.len(), 2);
        assert!(segs[1].is_selected);
        assert!(find_insert_point(&doc).is_none());
    }
}

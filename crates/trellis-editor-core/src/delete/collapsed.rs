use super::list::list_item_at_caret_start;
use super::segment::{
    delete_unit, has_invisible_trailing_br, pop_invisible_trailing_br, record_removed,
};
use super::{DeleteResult, DeleteStepContext};
use crate::edit::{merge_paragraphs, remove_block};
use crate::error::{ModelError, Result};
use crate::execute::EntityRemoval;
use crate::model::{Block, BlockLocation, Document, Segment};

pub fn backward_delete_collapsed_selection(
    ctx: &mut DeleteStepContext<'_>,
) -> Result<DeleteResult> {
    delete_collapsed(ctx, false)
}

pub fn forward_delete_collapsed_selection(ctx: &mut DeleteStepContext<'_>) -> Result<DeleteResult> {
    delete_collapsed(ctx, true)
}

fn delete_collapsed(ctx: &mut DeleteStepContext<'_>, forward: bool) -> Result<DeleteResult> {
    let location = ctx.insert_point.paragraph.clone();
    let marker = ctx.insert_point.marker_index;
    let paragraph = ctx
        .model
        .paragraph_at(&location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;

    let visible_len = paragraph.segments.len() - usize::from(has_invisible_trailing_br(paragraph));
    let target = if forward {
        Some(marker + 1).filter(|&i| i < visible_len)
    } else {
        marker.checked_sub(1)
    };

    if let Some(target) = target {
        let paragraph = ctx
            .model
            .paragraph_at_mut(&location)
            .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;
        pop_invisible_trailing_br(paragraph);
        if delete_unit(paragraph, target, marker, forward, ctx.format_context) {
            paragraph.is_implicit = false;
            return Ok(DeleteResult::SingleChar);
        }
        return Ok(DeleteResult::NotDeleted);
    }

    if !forward && list_item_at_caret_start(ctx.model, &ctx.insert_point).is_some() {
        // Outdenting is left to the list step.
        return Ok(DeleteResult::NotDeleted);
    }

    let Some(sibling) = leaf_sibling(ctx.model, &location, forward) else {
        return Ok(DeleteResult::NothingToDelete);
    };

    let removal = if forward {
        EntityRemoval::RemoveFromStart
    } else {
        EntityRemoval::RemoveFromEnd
    };
    match ctx.model.block_at(&sibling) {
        Some(Block::Paragraph(_)) => {
            if let Some(p) = ctx.model.paragraph_at_mut(&location) {
                pop_invisible_trailing_br(p);
            }
            if forward {
                merge_paragraphs(ctx.model, &location, &sibling)?;
            } else {
                merge_paragraphs(ctx.model, &sibling, &location)?;
            }
            tracing::trace!(target: "trellis::delete", forward, ?sibling, "merged paragraphs");
            Ok(DeleteResult::Range)
        }
        Some(Block::Entity(_) | Block::Divider(_)) => {
            if let Some(p) = ctx.model.paragraph_at_mut(&location) {
                pop_invisible_trailing_br(p);
            }
            if let Block::Entity(block) = remove_block(ctx.model, &sibling)? {
                record_removed(ctx.format_context, &Segment::entity(block.entity), removal);
            }
            Ok(DeleteResult::Range)
        }
        _ => Ok(DeleteResult::NothingToDelete),
    }
}

/// The nearest leaf block before or after `location`, not leaving the
/// enclosing table cell.
fn leaf_sibling(doc: &Document, location: &BlockLocation, forward: bool) -> Option<BlockLocation> {
    let mut current = location.clone();
    loop {
        let group = doc.group_at(&current.group)?;
        let next = if forward {
            Some(current.index + 1).filter(|&i| i < group.blocks.len())
        } else {
            current.index.checked_sub(1)
        };
        if let Some(index) = next {
            return Some(descend(doc, current.with_index(index), forward));
        }
        if group.kind.is_table_cell() {
            return None;
        }
        current = current.group.as_block_location()?;
    }
}

fn descend(doc: &Document, mut location: BlockLocation, forward: bool) -> BlockLocation {
    while let Some(Block::Group(group)) = doc.block_at(&location) {
        if group.blocks.is_empty() {
            break;
        }
        let index = if forward { 0 } else { group.blocks.len() - 1 };
        location = BlockLocation::new(location.as_group_path(), index);
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ListLevel, ListType};
    use crate::model::{BlockGroup, GroupPath, PathStep, Table};

    #[test]
    fn test_leaf_sibling_descends_into_groups() {
        let item = BlockGroup::list_item(vec![ListLevel::new(ListType::Ordered)]).with_blocks(vec![
            Block::paragraph(vec![Segment::text("a")]),
            Block::paragraph(vec![Segment::text("b")]),
        ]);
        let doc = BlockGroup::document().with_blocks(vec![
            Block::Group(item),
            Block::paragraph(vec![Segment::text("c")]),
        ]);
        let item_path = GroupPath::root().child(PathStep::Block(0));
        assert_eq!(
            leaf_sibling(&doc, &BlockLocation::top(1), false),
            Some(BlockLocation::new(item_path.clone(), 1))
        );
        assert_eq!(
            leaf_sibling(&doc, &BlockLocation::new(item_path, 1), true),
            Some(BlockLocation::top(1))
        );
        assert_eq!(leaf_sibling(&doc, &BlockLocation::top(1), true), None);
    }

    #[test]
    fn test_leaf_sibling_stays_in_cell() {
        let doc = BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("before")]),
            Block::Table(Table::new(1, 1)),
        ]);
        let in_cell = BlockLocation::new(BlockLocation::top(1).cell_path(0, 0), 0);
        assert_eq!(leaf_sibling(&doc, &in_cell, false), None);
        assert_eq!(
            leaf_sibling(&doc, &BlockLocation::top(0), true),
            Some(BlockLocation::top(1))
        );
    }
}

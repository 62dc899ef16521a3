use super::{DeleteResult, DeleteStepContext};
use crate::edit::outdent_list_item;
use crate::error::Result;
use crate::model::{BlockGroupKind, Document, GroupPath};
use crate::selection::InsertPoint;

/// Depth of the list item whose first line holds the caret at its very
/// start, if there is one with levels left to drop.
pub(super) fn list_item_at_caret_start(
    doc: &Document,
    insert_point: &InsertPoint,
) -> Option<usize> {
    if insert_point.marker_index != 0 {
        return None;
    }
    let location = &insert_point.paragraph;
    let depth = doc.closest_ancestor(
        &location.group,
        BlockGroupKind::is_list_item,
        BlockGroupKind::is_table_cell,
    )?;
    let item = doc.group_at(&location.group.prefix(depth))?;
    if item.list_levels().is_none_or(Vec::is_empty) {
        return None;
    }
    let first_line = location.index == 0
        && location.group.steps()[depth..]
            .iter()
            .all(|step| step.block_index() == 0);
    first_line.then_some(depth)
}

/// Backward delete at the start of a list item outdents it by one level.
/// Outdenting the last level turns the item into plain paragraphs.
pub fn delete_list(ctx: &mut DeleteStepContext<'_>) -> Result<DeleteResult> {
    let Some(depth) = list_item_at_caret_start(ctx.model, &ctx.insert_point) else {
        return Ok(DeleteResult::NotDeleted);
    };
    let item: GroupPath = ctx.insert_point.paragraph.group.prefix(depth);
    if outdent_list_item(ctx.model, &item)? {
        Ok(DeleteResult::Range)
    } else {
        Ok(DeleteResult::NotDeleted)
    }
}

use super::DeleteResult;
use super::segment::record_removed;
use crate::edit::remove_block;
use crate::error::{ModelError, Result};
use crate::execute::{EntityRemoval, FormatContext};
use crate::format::SegmentFormat;
use crate::model::{
    Block, BlockGroup, BlockLocation, Document, GroupPath, Paragraph, Segment,
    SegmentLocation,
};
use crate::selection::{
    InsertPoint, IterateOptions, SelectionItem, find_insert_point, iterate_selections,
};

/// Where the caret lands once the selected content is gone.
enum Landing {
    /// Into a trimmed paragraph, at the first removed index.
    Segments {
        block: BlockLocation,
        index: usize,
        format: SegmentFormat,
    },
    /// A new implicit paragraph replaces the removed block.
    ReplaceBlock(BlockLocation),
    /// The start of a cleared table cell.
    Cell(GroupPath),
}

/// Delete an expanded selection.
///
/// Returns `NotDeleted` with the caret as insert point when the selection is
/// just a marker, `Range` with the new caret otherwise.
pub fn delete_expanded_selection(
    model: &mut Document,
    context: &mut FormatContext,
) -> Result<(DeleteResult, Option<InsertPoint>)> {
    let items = iterate_selections(
        model,
        IterateOptions {
            skip_selected_cell_content: true,
            ..Default::default()
        },
    );
    if items.is_empty() {
        return Ok((DeleteResult::NotDeleted, None));
    }

    if let [SelectionItem::Segments { block, indices, .. }] = items.as_slice() {
        if let [index] = indices.as_slice() {
            let location = SegmentLocation::new(block.clone(), *index);
            if model.segment_at(&location).is_some_and(Segment::is_marker) {
                return Ok((
                    DeleteResult::NotDeleted,
                    Some(InsertPoint {
                        paragraph: block.clone(),
                        marker_index: *index,
                    }),
                ));
            }
        }
    }

    let mut landing: Option<Landing> = None;
    let mut removals: Vec<BlockLocation> = Vec::new();
    let mut emptied: Vec<BlockLocation> = Vec::new();
    let mut last_paragraph: Option<BlockLocation> = None;
    let mut handled_tables: Vec<BlockLocation> = Vec::new();

    for item in &items {
        match item {
            SelectionItem::Segments { block, indices, .. } => {
                let paragraph = model
                    .paragraph_at_mut(block)
                    .ok_or_else(|| ModelError::NotAParagraph(block.clone()))?;
                let format = indices
                    .first()
                    .and_then(|&i| paragraph.segments.get(i))
                    .map(|s| s.format.clone())
                    .unwrap_or_default();
                for &i in indices.iter().rev() {
                    if i < paragraph.segments.len() {
                        let removed = paragraph.segments.remove(i);
                        record_removed(context, &removed, EntityRemoval::Overwrite);
                    }
                }
                paragraph.is_implicit = false;
                if paragraph.segments.is_empty() {
                    emptied.push(block.clone());
                }
                if landing.is_none() {
                    landing = Some(Landing::Segments {
                        block: block.clone(),
                        index: indices.first().copied().unwrap_or(0),
                        format,
                    });
                }
                last_paragraph = Some(block.clone());
            }
            SelectionItem::Block { block } => {
                if let Some(Block::Entity(e)) = model.block_at(block) {
                    record_removed(
                        context,
                        &Segment::entity(e.entity.clone()),
                        EntityRemoval::Overwrite,
                    );
                }
                if landing.is_none() {
                    landing = Some(Landing::ReplaceBlock(block.clone()));
                } else {
                    removals.push(block.clone());
                }
            }
            SelectionItem::Cell {
                table,
                row,
                col,
                is_whole_table_selected,
            } => {
                if *is_whole_table_selected {
                    if handled_tables.contains(table) {
                        continue;
                    }
                    handled_tables.push(table.clone());
                    if let Some(Block::Table(t)) = model.block_at(table) {
                        for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                            record_group_entities(context, cell);
                        }
                    }
                    if landing.is_none() {
                        landing = Some(Landing::ReplaceBlock(table.clone()));
                    } else {
                        removals.push(table.clone());
                    }
                } else {
                    let path = table.cell_path(*row, *col);
                    let cell = model
                        .group_at_mut(&path)
                        .ok_or_else(|| ModelError::GroupNotFound(path.clone()))?;
                    record_group_entities(context, cell);
                    cell.blocks = vec![Block::Paragraph(Paragraph::implicit(vec![Segment::br()]))];
                    if landing.is_none() {
                        landing = Some(Landing::Cell(path));
                    }
                }
            }
            SelectionItem::ListFormatHolder { .. } => {}
        }
    }

    let Some(landing) = landing else {
        return Ok((DeleteResult::NotDeleted, find_insert_point(model)));
    };

    let insert_paragraph = match landing {
        Landing::Segments {
            block,
            index,
            format,
        } => {
            let paragraph = model
                .paragraph_at_mut(&block)
                .ok_or_else(|| ModelError::NotAParagraph(block.clone()))?;
            let index = index.min(paragraph.segments.len());
            paragraph
                .segments
                .insert(index, Segment::marker().with_format(format));
            block
        }
        Landing::ReplaceBlock(block) => {
            let slot = model
                .block_at_mut(&block)
                .ok_or_else(|| ModelError::BlockNotFound(block.clone()))?;
            *slot = Block::Paragraph(Paragraph::implicit(vec![Segment::marker()]));
            block
        }
        Landing::Cell(path) => {
            let paragraph_location = BlockLocation::new(path, 0);
            if let Some(p) = model.paragraph_at_mut(&paragraph_location) {
                p.segments.insert(0, Segment::marker());
            }
            paragraph_location
        }
    };

    if let Some(last) = last_paragraph.filter(|last| *last != insert_paragraph) {
        if last.group.table_cell_scope() == insert_paragraph.group.table_cell_scope() {
            let tail = std::mem::take(
                &mut model
                    .paragraph_at_mut(&last)
                    .ok_or_else(|| ModelError::NotAParagraph(last.clone()))?
                    .segments,
            );
            if let Some(p) = model.paragraph_at_mut(&insert_paragraph) {
                p.segments.extend(tail);
            }
            emptied.push(last);
        }
    }

    removals.extend(emptied.into_iter().filter(|b| *b != insert_paragraph));
    removals.sort();
    removals.dedup();
    for location in removals.iter().rev() {
        remove_block(model, location)?;
    }

    tracing::debug!(
        target: "trellis::delete",
        items = items.len(),
        removed_blocks = removals.len(),
        "deleted expanded selection"
    );
    Ok((DeleteResult::Range, find_insert_point(model)))
}

fn record_group_entities(context: &mut FormatContext, group: &BlockGroup) {
    group.walk(&mut |_, block| match block {
        Block::Entity(e) => record_removed(
            context,
            &Segment::entity(e.entity.clone()),
            EntityRemoval::Overwrite,
        ),
        Block::Paragraph(p) => {
            for segment in &p.segments {
                record_removed(context, segment, EntityRemoval::Overwrite);
            }
        }
        _ => {}
    });
}

//! Structural editors: paragraph split and merge, list outdent, clear format.

use crate::error::{ModelError, Result};
use crate::format::{ParagraphFormat, SegmentFormat, TableCellFormat, TableFormat};
use crate::model::{
    Block, BlockGroup, BlockGroupKind, BlockLocation, Document, GroupPath, Paragraph, Segment,
    normalize, normalize_paragraph,
};
use crate::selection::{InsertPoint, IterateOptions, SelectionItem, iterate_selections};

/// Split the paragraph at the caret.
///
/// Everything from the marker onward moves into a new explicit paragraph
/// inserted right after the original, which keeps its formats. Returns the
/// location of the new paragraph.
pub fn split_paragraph(doc: &mut Document, insert_point: &InsertPoint) -> Result<BlockLocation> {
    let location = &insert_point.paragraph;
    let paragraph = doc
        .paragraph_at_mut(location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;

    let at = insert_point.marker_index.min(paragraph.segments.len());
    let tail = paragraph.segments.split_off(at);
    let mut new_paragraph = Paragraph {
        segments: tail,
        format: paragraph.format.clone(),
        segment_format: paragraph.segment_format.clone(),
        decorator: paragraph.decorator.clone(),
        is_implicit: false,
        cached_element: None,
    };

    if paragraph.segments.is_empty() {
        let format = new_paragraph
            .segments
            .first()
            .map(|s| s.format.clone())
            .unwrap_or_default();
        paragraph.segments.push(Segment::br().with_format(format));
    }
    paragraph.is_implicit = false;
    normalize_paragraph(paragraph);
    normalize_paragraph(&mut new_paragraph);

    let group = doc
        .group_at_mut(&location.group)
        .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
    let new_index = location.index + 1;
    group
        .blocks
        .insert(new_index, Block::Paragraph(new_paragraph));

    tracing::trace!(target: "trellis::editor", at, ?location, "split paragraph");
    Ok(location.with_index(new_index))
}

/// Append the segments of `second` to `first` and remove `second`.
///
/// `second` must come after `first` in document order. A trailing line break
/// of `first` is dropped before the join.
pub fn merge_paragraphs(
    doc: &mut Document,
    first: &BlockLocation,
    second: &BlockLocation,
) -> Result<()> {
    if first >= second {
        return Err(ModelError::InvalidPosition(format!(
            "cannot merge {second:?} into later paragraph {first:?}"
        )));
    }
    if doc.paragraph_at(first).is_none() {
        return Err(ModelError::NotAParagraph(first.clone()));
    }
    let segments = std::mem::take(
        &mut doc
            .paragraph_at_mut(second)
            .ok_or_else(|| ModelError::NotAParagraph(second.clone()))?
            .segments,
    );

    let target = doc
        .paragraph_at_mut(first)
        .ok_or_else(|| ModelError::NotAParagraph(first.clone()))?;
    if target.segments.last().is_some_and(Segment::is_br) {
        target.segments.pop();
    }
    target.segments.extend(segments);
    normalize_paragraph(target);

    remove_block(doc, second)?;
    Ok(())
}

/// Remove and return the block at `location`.
pub(crate) fn remove_block(doc: &mut Document, location: &BlockLocation) -> Result<Block> {
    let group = doc
        .group_at_mut(&location.group)
        .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
    if location.index >= group.blocks.len() {
        return Err(ModelError::BlockNotFound(location.clone()));
    }
    Ok(group.blocks.remove(location.index))
}

/// Drop the innermost level of the list item at `item`. An item left with no
/// levels is unwrapped into plain paragraphs.
///
/// Returns `false` when `item` is not a list item or has no level to drop.
pub fn outdent_list_item(doc: &mut Document, item: &GroupPath) -> Result<bool> {
    let group = doc
        .group_at_mut(item)
        .ok_or_else(|| ModelError::GroupNotFound(item.clone()))?;
    let BlockGroupKind::ListItem(props) = &mut group.kind else {
        return Ok(false);
    };
    if props.levels.pop().is_none() {
        return Ok(false);
    }
    let now_empty = props.levels.is_empty();
    tracing::debug!(
        target: "trellis::editor",
        ?item,
        levels = props.levels.len(),
        "outdent list item"
    );

    if now_empty {
        let location = item
            .as_block_location()
            .ok_or_else(|| ModelError::InvalidPosition("list item path is empty".into()))?;
        unwrap_list_item(doc, &location)?;
    }
    Ok(true)
}

/// Replace the list item at `location` with its blocks. Implicit paragraphs
/// become explicit so they keep rendering as separate paragraphs.
pub fn unwrap_list_item(doc: &mut Document, location: &BlockLocation) -> Result<()> {
    let group = doc
        .group_at_mut(&location.group)
        .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
    if !matches!(group.blocks.get(location.index), Some(Block::Group(g)) if g.kind.is_list_item()) {
        return Err(ModelError::BlockNotFound(location.clone()));
    }
    let Block::Group(item) = group.blocks.remove(location.index) else {
        return Err(ModelError::BlockNotFound(location.clone()));
    };
    let blocks = item.blocks.into_iter().map(|mut block| {
        if let Block::Paragraph(p) = &mut block {
            p.is_implicit = false;
        }
        block
    });
    group.blocks.splice(location.index..location.index, blocks);
    Ok(())
}

/// Strip formatting from the selection.
///
/// Selected segments lose their format and link. Block formats are reset when
/// the selection covers more than one block, a whole block, or is a bare
/// caret; that also drops list levels, removes dividers and lifts blocks out
/// of quotes. Selected table cells and wholly selected tables are reset too.
pub fn clear_format(doc: &mut Document, default_format: &SegmentFormat) -> Result<bool> {
    let items = iterate_selections(
        doc,
        IterateOptions {
            include_list_format_holder: true,
            ..Default::default()
        },
    );
    if items.is_empty() {
        return Ok(false);
    }

    let mut blocks: Vec<BlockLocation> = Vec::new();
    let mut only_marker = false;
    let mut any_whole_block = false;
    for item in &items {
        match item {
            SelectionItem::Segments {
                block,
                indices,
                whole_block,
            } => {
                blocks.push(block.clone());
                any_whole_block |= *whole_block;
                only_marker = indices.len() == 1
                    && doc
                        .paragraph_at(block)
                        .and_then(|p| p.segments.get(indices[0]))
                        .is_some_and(Segment::is_marker);
            }
            SelectionItem::Block { block } => {
                blocks.push(block.clone());
                any_whole_block = true;
            }
            SelectionItem::Cell { .. } | SelectionItem::ListFormatHolder { .. } => {}
        }
    }
    let clear_blocks = blocks.len() > 1 || any_whole_block || (blocks.len() == 1 && only_marker);

    for item in &items {
        match item {
            SelectionItem::Segments { block, indices, .. } => {
                let Some(p) = doc.paragraph_at_mut(block) else {
                    continue;
                };
                if clear_blocks {
                    p.segment_format = None;
                    p.segments
                        .iter_mut()
                        .for_each(|s| clear_segment(s, default_format));
                } else {
                    for &i in indices {
                        if let Some(s) = p.segments.get_mut(i) {
                            clear_segment(s, default_format);
                        }
                    }
                }
            }
            SelectionItem::ListFormatHolder { item } => {
                if let Some(BlockGroupKind::ListItem(props)) =
                    doc.group_at_mut(item).map(|g| &mut g.kind)
                {
                    clear_segment(&mut props.format_holder, default_format);
                }
            }
            _ => {}
        }
    }

    if clear_blocks {
        clear_block_formats(doc, &blocks)?;
    }
    clear_table_formats(doc, &items);

    normalize(doc);
    tracing::debug!(
        target: "trellis::editor",
        items = items.len(),
        clear_blocks,
        "clear format"
    );
    Ok(true)
}

fn clear_segment(segment: &mut Segment, default_format: &SegmentFormat) {
    segment.format = default_format.clone();
    segment.link = None;
}

fn clear_block_formats(doc: &mut Document, blocks: &[BlockLocation]) -> Result<()> {
    // Paths stay valid while nothing moves: reset formats and list levels
    // first, then remove dividers and split quotes back to front.
    for location in blocks {
        if let Some(p) = doc.paragraph_at_mut(location) {
            p.format = ParagraphFormat::default();
            p.decorator = None;
        }
        if let Some(depth) = doc.closest_ancestor(
            &location.group,
            BlockGroupKind::is_list_item,
            BlockGroupKind::is_table_cell,
        ) {
            if let Some(BlockGroupKind::ListItem(props)) = doc
                .group_at_mut(&location.group.prefix(depth))
                .map(|g| &mut g.kind)
            {
                props.levels.clear();
            }
        }
    }

    let mut lifted: Vec<BlockLocation> = Vec::new();
    for location in blocks.iter().rev() {
        if matches!(doc.block_at(location), Some(Block::Divider(_))) {
            remove_block(doc, location)?;
            continue;
        }
        let Some(depth) = doc.closest_ancestor(
            &location.group,
            BlockGroupKind::is_quote,
            BlockGroupKind::is_table_cell,
        ) else {
            continue;
        };
        // Lift the child of the quote that contains this block.
        let unit = if depth == location.group.len() {
            location.clone()
        } else {
            location.group.prefix(depth + 1).as_block_location().ok_or_else(|| {
                ModelError::InvalidPosition(format!("no quote child above {location:?}"))
            })?
        };
        if lifted.contains(&unit) {
            continue;
        }
        split_quote_around(doc, &unit)?;
        lifted.push(unit);
    }
    Ok(())
}

/// Move the block at `unit` out of its parent quote. Blocks after it go into
/// a new quote with the same tag and format placed after the lifted block.
fn split_quote_around(doc: &mut Document, unit: &BlockLocation) -> Result<()> {
    let quote_location = unit
        .group
        .as_block_location()
        .ok_or_else(|| ModelError::InvalidPosition("quote child at document root".into()))?;
    let parent = doc
        .group_at_mut(&quote_location.group)
        .ok_or_else(|| ModelError::GroupNotFound(quote_location.group.clone()))?;
    let Some(Block::Group(quote)) = parent.blocks.get_mut(quote_location.index) else {
        return Err(ModelError::BlockNotFound(quote_location));
    };
    if unit.index >= quote.blocks.len() {
        return Err(ModelError::BlockNotFound(unit.clone()));
    }

    let mut rest = quote.blocks.split_off(unit.index);
    let block = rest.remove(0);
    let quote_is_empty = quote.blocks.is_empty();
    let tail = (!rest.is_empty()).then(|| {
        let mut new_quote = BlockGroup::new(quote.kind.clone());
        new_quote.blocks = rest;
        Block::Group(new_quote)
    });

    let mut index = quote_location.index;
    if quote_is_empty {
        parent.blocks.remove(index);
    } else {
        index += 1;
    }
    parent.blocks.insert(index, block);
    if let Some(tail) = tail {
        parent.blocks.insert(index + 1, tail);
    }
    Ok(())
}

fn clear_table_formats(doc: &mut Document, items: &[SelectionItem]) {
    for item in items {
        let SelectionItem::Cell {
            table,
            row,
            col,
            is_whole_table_selected,
        } = item
        else {
            continue;
        };
        let Some(Block::Table(t)) = doc.block_at_mut(table) else {
            continue;
        };
        if let Some(BlockGroupKind::TableCell(props)) = t.cell_mut(*row, *col).map(|c| &mut c.kind)
        {
            props.dataset.clear();
            props.is_header = false;
            props.format = TableCellFormat::cleared();
        }
        if *is_whole_table_selected {
            t.format = TableFormat::cleared();
            t.dataset.clear();
        }
    }
}

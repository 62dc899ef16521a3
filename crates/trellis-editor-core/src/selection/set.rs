use super::{ModelPosition, SelectionContext};
use crate::error::{ModelError, Result};
use crate::model::{
    Block, BlockGroup, BlockGroupKind, BlockLocation, Document, Paragraph, PathStep, Segment,
    SegmentKind, split_text_segment,
};

/// Remove every selection flag and marker from the document.
pub fn clear_selection(doc: &mut Document) {
    clear_group(doc);
}

fn clear_group(group: &mut BlockGroup) {
    match &mut group.kind {
        BlockGroupKind::ListItem(item) => item.format_holder.is_selected = false,
        BlockGroupKind::TableCell(cell) => cell.is_selected = false,
        BlockGroupKind::General { is_selected, .. } => *is_selected = false,
        BlockGroupKind::Document { .. } | BlockGroupKind::FormatContainer(_) => {}
    }
    for block in &mut group.blocks {
        match block {
            Block::Paragraph(p) => {
                p.segments.retain(|s| !s.is_marker());
                for segment in &mut p.segments {
                    segment.is_selected = false;
                    if let SegmentKind::Image(img) = &mut segment.kind {
                        img.is_selected_as_image_selection = false;
                    }
                }
            }
            Block::Entity(e) => e.is_selected = false,
            Block::Divider(d) => d.is_selected = false,
            Block::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    clear_group(cell);
                }
            }
            Block::Group(g) => clear_group(g),
        }
    }
}

/// Replace the document's selection.
///
/// Positions refer to the document as passed in, markers included. Passing
/// `None` clears the selection.
pub fn set_selection(doc: &mut Document, selection: Option<&SelectionContext>) -> Result<()> {
    let resolved = match selection {
        Some(sel) => Some(without_markers(doc, sel)?),
        None => None,
    };
    clear_selection(doc);
    let Some(selection) = resolved else {
        return Ok(());
    };

    match selection {
        SelectionContext::Range { start, end } if start == end => insert_marker(doc, &start),
        SelectionContext::Range { start, end } => {
            let (start, end) = if start <= end { (start, end) } else { (end, start) };
            select_range(doc, start, end)
        }
        SelectionContext::Table {
            table,
            first_cell,
            last_cell,
        } => {
            let Some(Block::Table(t)) = doc.block_at_mut(&table) else {
                return Err(ModelError::InvalidPosition(format!("no table at {table:?}")));
            };
            for row in first_cell.row.min(last_cell.row)..=first_cell.row.max(last_cell.row) {
                for col in first_cell.col.min(last_cell.col)..=first_cell.col.max(last_cell.col) {
                    if let Some(BlockGroupKind::TableCell(props)) =
                        t.cell_mut(row, col).map(|c| &mut c.kind)
                    {
                        props.is_selected = true;
                    }
                }
            }
            Ok(())
        }
        SelectionContext::Image { image } => {
            let segment = doc
                .paragraph_at_mut(&image.block)
                .and_then(|p| p.segments.get_mut(image.index));
            match segment {
                Some(Segment {
                    kind: SegmentKind::Image(img),
                    is_selected,
                    ..
                }) => {
                    *is_selected = true;
                    img.is_selected_as_image_selection = true;
                    Ok(())
                }
                _ => Err(ModelError::InvalidPosition(format!("no image at {image:?}"))),
            }
        }
    }
}

/// Rewrite segment indices so they stay valid once markers are removed.
fn without_markers(doc: &Document, selection: &SelectionContext) -> Result<SelectionContext> {
    let shift = |block: &BlockLocation, index: usize| -> Result<usize> {
        let p = doc
            .paragraph_at(block)
            .ok_or_else(|| ModelError::InvalidPosition(format!("no paragraph at {block:?}")))?;
        let markers = p
            .segments
            .iter()
            .take(index)
            .filter(|s| s.is_marker())
            .count();
        Ok(index - markers)
    };
    let position = |pos: &ModelPosition| -> Result<ModelPosition> {
        Ok(match pos {
            ModelPosition::Segment { location, offset } => {
                let mut location = location.clone();
                location.index = shift(&location.block, location.index)?;
                ModelPosition::Segment {
                    location,
                    offset: *offset,
                }
            }
            other => other.clone(),
        })
    };
    Ok(match selection {
        SelectionContext::Range { start, end } => SelectionContext::Range {
            start: position(start)?,
            end: position(end)?,
        },
        SelectionContext::Image { image } => {
            let mut image = image.clone();
            image.index = shift(&image.block, image.index)?;
            SelectionContext::Image { image }
        }
        table @ SelectionContext::Table { .. } => table.clone(),
    })
}

fn insert_marker(doc: &mut Document, position: &ModelPosition) -> Result<()> {
    match position {
        ModelPosition::Segment { location, offset } => {
            let p = doc
                .paragraph_at_mut(&location.block)
                .ok_or_else(|| ModelError::NotAParagraph(location.block.clone()))?;
            let index = split_point(p, location.index, *offset);
            let format = marker_format(p, index);
            p.segments.insert(index, Segment::marker().with_format(format));
            Ok(())
        }
        ModelPosition::BlockBoundary { location } => {
            let group = doc
                .group_at_mut(&location.group)
                .ok_or_else(|| ModelError::GroupNotFound(location.group.clone()))?;
            let index = location.index.min(group.blocks.len());
            group.blocks.insert(
                index,
                Block::Paragraph(Paragraph::implicit(vec![Segment::marker()])),
            );
            Ok(())
        }
    }
}

/// Turn `(index, offset)` into a segment boundary, splitting text if needed.
fn split_point(p: &mut Paragraph, index: usize, offset: usize) -> usize {
    let index = index.min(p.segments.len());
    if offset == 0 {
        return index;
    }
    let Some(segment) = p.segments.get_mut(index) else {
        return index;
    };
    if let Some(right) = split_text_segment(segment, offset) {
        p.segments.insert(index + 1, right);
        index + 1
    } else if segment.len() <= offset {
        index + 1
    } else {
        index
    }
}

/// Format a new marker at `index` takes from its neighbours.
fn marker_format(p: &Paragraph, index: usize) -> crate::format::SegmentFormat {
    let before = index.checked_sub(1).and_then(|i| p.segments.get(i));
    let after = p.segments.get(index);
    before
        .filter(|s| s.as_text().is_some())
        .or(after.filter(|s| s.as_text().is_some()))
        .map(|s| s.format.clone())
        .or_else(|| p.segment_format.clone())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
enum Bound {
    /// Segment boundary inside a paragraph.
    Segment(BlockLocation, usize),
    /// Gap before a block.
    Block(BlockLocation),
}

fn to_bound(doc: &mut Document, position: &ModelPosition) -> Result<(Bound, bool)> {
    match position {
        ModelPosition::Segment { location, offset } => {
            let p = doc
                .paragraph_at_mut(&location.block)
                .ok_or_else(|| ModelError::NotAParagraph(location.block.clone()))?;
            let before = p.segments.len();
            let index = split_point(p, location.index, *offset);
            let did_split = p.segments.len() != before;
            Ok((Bound::Segment(location.block.clone(), index), did_split))
        }
        ModelPosition::BlockBoundary { location } => Ok((Bound::Block(location.clone()), false)),
    }
}

fn is_inside_table(loc: &BlockLocation, table: &BlockLocation) -> bool {
    let depth = table.group.len();
    let steps = loc.group.steps();
    steps.len() > depth
        && steps[..depth] == *table.group.steps()
        && matches!(steps[depth], PathStep::Cell { block, .. } if block == table.index)
}

fn select_range(doc: &mut Document, start: ModelPosition, end: ModelPosition) -> Result<()> {
    // Split the end first so the start's indices stay valid.
    let (mut end_bound, _) = to_bound(doc, &end)?;
    let (start_bound, start_split) = to_bound(doc, &start)?;
    if let (Bound::Segment(sb, si), Bound::Segment(eb, ei)) = (&start_bound, &mut end_bound) {
        if start_split && sb == eb && *si <= *ei {
            *ei += 1;
        }
    }

    let after_start = |loc: &BlockLocation| match &start_bound {
        Bound::Segment(b, _) => loc >= b,
        Bound::Block(b) => loc >= b,
    };
    let before_end = |loc: &BlockLocation| match &end_bound {
        Bound::Segment(b, _) => loc <= b,
        Bound::Block(b) => loc < b,
    };
    let strictly_inside = |loc: &BlockLocation| {
        let past_start = match &start_bound {
            Bound::Segment(b, _) => loc > b && !is_inside_table(b, loc),
            Bound::Block(b) => loc >= b,
        };
        let before = match &end_bound {
            Bound::Segment(b, _) => loc < b && !is_inside_table(b, loc),
            Bound::Block(b) => loc < b && !is_inside_table(b, loc),
        };
        past_start && before
    };

    let mut selected_any = false;
    for loc in doc.leaf_locations() {
        if !after_start(&loc) || !before_end(&loc) {
            continue;
        }
        let whole = strictly_inside(&loc);
        let Some(block) = doc.block_at_mut(&loc) else {
            continue;
        };
        match block {
            Block::Paragraph(p) => {
                let lo = match &start_bound {
                    Bound::Segment(b, i) if *b == loc => *i,
                    _ => 0,
                };
                let hi = match &end_bound {
                    Bound::Segment(b, i) if *b == loc => (*i).min(p.segments.len()),
                    _ => p.segments.len(),
                };
                for segment in p.segments.iter_mut().take(hi).skip(lo) {
                    segment.is_selected = true;
                    selected_any = true;
                }
            }
            Block::Entity(e) if whole => {
                e.is_selected = true;
                selected_any = true;
            }
            Block::Divider(d) if whole => {
                d.is_selected = true;
                selected_any = true;
            }
            Block::Table(t) if whole => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    if let BlockGroupKind::TableCell(props) = &mut cell.kind {
                        props.is_selected = true;
                    }
                }
                selected_any = true;
            }
            _ => {}
        }
    }

    if !selected_any {
        let caret = match start_bound {
            Bound::Segment(b, i) => ModelPosition::at(b, i),
            Bound::Block(b) => ModelPosition::before_block(b),
        };
        insert_marker(doc, &caret)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;
    use crate::selection::{get_selection, CellCoordinate};

    fn doc_ab_cd() -> Document {
        BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("abc")]),
            Block::paragraph(vec![Segment::text("def")]),
        ])
    }

    #[test]
    fn test_collapsed_splits_text() {
        let mut doc = doc_ab_cd();
        let caret = SelectionContext::caret(ModelPosition::in_text(BlockLocation::top(0), 0, 1));
        set_selection(&mut doc, Some(&caret)).unwrap();
        let p = doc.paragraph_at(&BlockLocation::top(0)).unwrap();
        assert_eq!(
            p.segments,
            vec![Segment::text("a"), Segment::marker(), Segment::text("bc")]
        );
    }

    #[test]
    fn test_range_within_one_segment() {
        let mut doc = doc_ab_cd();
        let range = SelectionContext::Range {
            start: ModelPosition::in_text(BlockLocation::top(0), 0, 1),
            end: ModelPosition::in_text(BlockLocation::top(0), 0, 2),
        };
        set_selection(&mut doc, Some(&range)).unwrap();
        let p = doc.paragraph_at(&BlockLocation::top(0)).unwrap();
        assert_eq!(
            p.segments,
            vec![
                Segment::text("a"),
                Segment::text("b").selected(),
                Segment::text("c")
            ]
        );
    }

    #[test]
    fn test_range_across_paragraphs() {
        let mut doc = doc_ab_cd();
        let range = SelectionContext::Range {
            start: ModelPosition::in_text(BlockLocation::top(0), 0, 2),
            end: ModelPosition::in_text(BlockLocation::top(1), 0, 1),
        };
        set_selection(&mut doc, Some(&range)).unwrap();
        assert_eq!(
            doc.paragraph_at(&BlockLocation::top(0)).unwrap().segments,
            vec![Segment::text("ab"), Segment::text("c").selected()]
        );
        assert_eq!(
            doc.paragraph_at(&BlockLocation::top(1)).unwrap().segments,
            vec![Segment::text("d").selected(), Segment::text("ef")]
        );
    }

    #[test]
    fn test_reselect_replaces_marker() {
        let mut doc = doc_ab_cd();
        let first = SelectionContext::caret(ModelPosition::at(BlockLocation::top(0), 0));
        set_selection(&mut doc, Some(&first)).unwrap();
        // Index 2 counts the marker inserted above, so this addresses the
        // end of "abc".
        let second = SelectionContext::caret(ModelPosition::at(BlockLocation::top(0), 2));
        set_selection(&mut doc, Some(&second)).unwrap();
        let p = doc.paragraph_at(&BlockLocation::top(0)).unwrap();
        assert_eq!(p.segments, vec![Segment::text("abc"), Segment::marker()]);
    }

    #[test]
    fn test_block_boundary_caret_creates_paragraph() {
        let mut doc = doc_ab_cd();
        let caret = SelectionContext::caret(ModelPosition::before_block(BlockLocation::top(1)));
        set_selection(&mut doc, Some(&caret)).unwrap();
        let p = doc.paragraph_at(&BlockLocation::top(1)).unwrap();
        assert!(p.is_implicit);
        assert_eq!(p.segments, vec![Segment::marker()]);
    }

    #[test]
    fn test_range_covering_table_selects_cells() {
        let mut doc = BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("a")]),
            Block::Table(Table::new(1, 2)),
            Block::paragraph(vec![Segment::text("b")]),
        ]);
        let range = SelectionContext::Range {
            start: ModelPosition::at(BlockLocation::top(0), 0),
            end: ModelPosition::at(BlockLocation::top(2), 1),
        };
        set_selection(&mut doc, Some(&range)).unwrap();
        let table = doc.blocks[1].as_table().unwrap();
        assert_eq!(table.cell_selection_state(), (true, true));
    }

    #[test]
    fn test_table_selection_roundtrip() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::Table(Table::new(3, 3))]);
        let sel = SelectionContext::Table {
            table: BlockLocation::top(0),
            first_cell: CellCoordinate::new(0, 0),
            last_cell: CellCoordinate::new(1, 1),
        };
        set_selection(&mut doc, Some(&sel)).unwrap();
        assert_eq!(get_selection(&doc), Some(sel));
    }

    #[test]
    fn test_clear() {
        let mut doc = doc_ab_cd();
        let caret = SelectionContext::caret(ModelPosition::at(BlockLocation::top(0), 0));
        set_selection(&mut doc, Some(&caret)).unwrap();
        set_selection(&mut doc, None).unwrap();
        assert_eq!(doc, doc_ab_cd());
    }
}

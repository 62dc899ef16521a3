//! Structural normalization.
//!
//! Run after every mutation. The pass is idempotent: normalizing a normalized
//! model changes nothing.

use super::block::{Block, Paragraph, Table};
use super::group::{BlockGroup, BlockGroupKind};
use super::segment::{Segment, SegmentKind};

/// Normalize `group` and everything below it.
pub fn normalize(group: &mut BlockGroup) {
    normalize_group(group);
    if group.is_document() && group.blocks.is_empty() {
        group
            .blocks
            .push(Block::paragraph(vec![Segment::br()]));
    }
}

fn normalize_group(group: &mut BlockGroup) {
    for block in &mut group.blocks {
        match block {
            Block::Paragraph(p) => normalize_paragraph(p),
            Block::Table(t) => normalize_table(t),
            Block::Group(g) => normalize_group(g),
            Block::Entity(_) | Block::Divider(_) => {}
        }
    }

    flatten_unleveled_list_items(&mut group.blocks);

    group.blocks.retain(|block| match block {
        Block::Group(g) => {
            !g.blocks.is_empty()
                || !matches!(
                    g.kind,
                    BlockGroupKind::ListItem(_) | BlockGroupKind::FormatContainer(_)
                )
        }
        Block::Table(t) => !t.rows.is_empty(),
        _ => true,
    });

    fix_empty_paragraphs(&mut group.blocks);

    for i in 1..group.blocks.len() {
        let previous_implicit =
            matches!(&group.blocks[i - 1], Block::Paragraph(p) if p.is_implicit);
        if let Block::Paragraph(p) = &mut group.blocks[i] {
            if p.is_implicit && previous_implicit {
                p.is_implicit = false;
                normalize_paragraph(p);
            }
        }
    }

    if matches!(
        group.kind,
        BlockGroupKind::ListItem(_) | BlockGroupKind::TableCell(_)
    ) && group.blocks.len() == 1
    {
        if let Block::Paragraph(p) = &mut group.blocks[0] {
            if !p.is_implicit
                && p.format.is_empty()
                && p.decorator.is_none()
                && p.segment_format.is_none()
            {
                p.is_implicit = true;
            }
        }
    }
}

/// Replace list items that lost their last level with their content.
fn flatten_unleveled_list_items(blocks: &mut Vec<Block>) {
    let needs_flatten = blocks.iter().any(|b| match b {
        Block::Group(g) => {
            matches!(&g.kind, BlockGroupKind::ListItem(item) if item.levels.is_empty())
        }
        _ => false,
    });
    if !needs_flatten {
        return;
    }
    let old = std::mem::take(blocks);
    for block in old {
        match block {
            Block::Group(g)
                if matches!(&g.kind, BlockGroupKind::ListItem(item) if item.levels.is_empty()) =>
            {
                blocks.extend(g.blocks);
            }
            other => blocks.push(other),
        }
    }
}

fn fix_empty_paragraphs(blocks: &mut Vec<Block>) {
    let is_empty_implicit =
        |b: &Block| matches!(b, Block::Paragraph(p) if p.is_implicit && p.segments.is_empty());
    let all_empty_implicit = !blocks.is_empty() && blocks.iter().all(is_empty_implicit);
    if all_empty_implicit {
        blocks.truncate(1);
    } else if blocks.len() > 1 {
        blocks.retain(|b| !is_empty_implicit(b));
    }
    for block in blocks.iter_mut() {
        if let Block::Paragraph(p) = block {
            if p.segments.is_empty() {
                p.segments.push(Segment::br());
            }
        }
    }
}

/// Segment-level cleanup of a single paragraph.
///
/// Drops empty text, merges compatible neighbouring text, and keeps the
/// trailing line break of an explicit paragraph only where it is visible.
pub fn normalize_paragraph(paragraph: &mut Paragraph) {
    let segments = &mut paragraph.segments;
    segments.retain(|s| !matches!(&s.kind, SegmentKind::Text(t) if t.is_empty()));

    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments.drain(..) {
        match merged.last_mut() {
            Some(last) if last.can_merge_with(&segment) => {
                if let (SegmentKind::Text(a), SegmentKind::Text(b)) = (&mut last.kind, segment.kind)
                {
                    a.push_str(&b);
                }
            }
            _ => merged.push(segment),
        }
    }
    *segments = merged;

    if paragraph.is_implicit || segments.is_empty() {
        return;
    }
    let len = segments.len();
    let last_is_marker = segments[len - 1].is_marker();
    let second_last_is_br_or_none = len < 2 || segments[len - 2].is_br();
    if last_is_marker && second_last_is_br_or_none {
        let format = segments[len - 1].format.clone();
        segments.push(Segment::br().with_format(format));
    } else if len > 1 && segments[len - 1].is_br() {
        let visible: Vec<&Segment> = segments.iter().filter(|s| !s.is_marker()).collect();
        if visible.len() > 1 && !visible[visible.len() - 2].is_br() {
            segments.pop();
        }
    }
}

fn normalize_table(table: &mut Table) {
    table.rows.retain(|row| !row.cells.is_empty());
    let cols = table.column_count();
    for (row_index, row) in table.rows.iter_mut().enumerate() {
        while row.cells.len() < cols {
            row.cells.push(BlockGroup::table_cell());
        }
        for (col_index, cell) in row.cells.iter_mut().enumerate() {
            if let BlockGroupKind::TableCell(props) = &mut cell.kind {
                if row_index == 0 {
                    props.span_above = false;
                }
                if col_index == 0 {
                    props.span_left = false;
                }
            }
            normalize_group(cell);
            if cell.blocks.is_empty() {
                cell.blocks
                    .push(Block::Paragraph(Paragraph::implicit(vec![Segment::br()])));
            }
        }
    }
    if !table.widths.is_empty() {
        table.widths.resize(cols, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ListLevel, ListType};
    use crate::model::Table;

    fn para(segments: Vec<Segment>) -> Paragraph {
        Paragraph::with_segments(segments)
    }

    #[test]
    fn test_merges_adjacent_text() {
        let mut p = para(vec![
            Segment::text("ab"),
            Segment::text(""),
            Segment::text("cd"),
        ]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments, vec![Segment::text("abcd")]);
    }

    #[test]
    fn test_keeps_format_boundaries() {
        let bold = crate::format::SegmentFormat {
            font_weight: Some("bold".into()),
            ..Default::default()
        };
        let mut p = para(vec![
            Segment::text("ab"),
            Segment::text("cd").with_format(bold),
        ]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments.len(), 2);
    }

    #[test]
    fn test_trailing_br_after_text_dropped() {
        let mut p = para(vec![Segment::text("a"), Segment::marker(), Segment::br()]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments, vec![Segment::text("a"), Segment::marker()]);
    }

    #[test]
    fn test_lone_marker_gets_br() {
        let mut p = para(vec![Segment::marker()]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments, vec![Segment::marker(), Segment::br()]);
    }

    #[test]
    fn test_double_br_kept() {
        let mut p = para(vec![Segment::text("a"), Segment::br(), Segment::br()]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments.len(), 3);
    }

    #[test]
    fn test_implicit_paragraph_keeps_trailing_br() {
        let mut p = Paragraph::implicit(vec![Segment::text("a"), Segment::br()]);
        normalize_paragraph(&mut p);
        assert_eq!(p.segments.len(), 2);
    }

    #[test]
    fn test_empty_document_gets_paragraph() {
        let mut doc = BlockGroup::document();
        normalize(&mut doc);
        assert_eq!(doc.blocks, vec![Block::paragraph(vec![Segment::br()])]);
    }

    #[test]
    fn test_empty_groups_removed() {
        let mut doc = BlockGroup::document().with_blocks(vec![
            Block::paragraph(vec![Segment::text("a")]),
            Block::Group(BlockGroup::quote()),
            Block::Group(BlockGroup::list_item(vec![ListLevel::new(ListType::Ordered)])),
        ]);
        normalize(&mut doc);
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_unleveled_list_item_flattened() {
        let item = BlockGroup::list_item(vec![])
            .with_blocks(vec![Block::paragraph(vec![Segment::marker()])]);
        let mut doc = BlockGroup::document().with_blocks(vec![Block::Group(item)]);
        normalize(&mut doc);
        let p = doc.blocks[0].as_paragraph().unwrap();
        assert!(p.marker_index().is_some());
    }

    #[test]
    fn test_implicit_neighbours_promoted() {
        let mut doc = BlockGroup::document().with_blocks(vec![
            Block::Paragraph(Paragraph::implicit(vec![Segment::text("a")])),
            Block::Paragraph(Paragraph::implicit(vec![Segment::text("b"), Segment::br()])),
        ]);
        normalize(&mut doc);
        let second = doc.blocks[1].as_paragraph().unwrap();
        assert!(!second.is_implicit);
        assert_eq!(second.segments, vec![Segment::text("b")]);
    }

    #[test]
    fn test_table_made_rectangular() {
        let mut table = Table::new(2, 2);
        table.rows[1].cells.pop();
        table.widths = vec![10];
        if let BlockGroupKind::TableCell(props) = &mut table.rows[0].cells[1].kind {
            props.span_above = true;
        }
        let mut doc = BlockGroup::document().with_blocks(vec![Block::Table(table)]);
        normalize(&mut doc);
        let table = doc.blocks[0].as_table().unwrap();
        assert_eq!(table.rows[1].cells.len(), 2);
        assert_eq!(table.widths, vec![10, 0]);
        assert!(!table.rows[0].cells[1].is_selected_cell());
        assert_eq!(table.rows[1].cells[1].blocks.len(), 1);
        match &table.rows[0].cells[1].kind {
            BlockGroupKind::TableCell(props) => assert!(!props.span_above),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_is_idempotent_on_mixed_content() {
        let item = BlockGroup::list_item(vec![ListLevel::new(ListType::Unordered)]).with_blocks(
            vec![Block::paragraph(vec![Segment::text("x"), Segment::br()])],
        );
        let mut doc = BlockGroup::document().with_blocks(vec![
            Block::Paragraph(Paragraph::implicit(vec![])),
            Block::paragraph(vec![Segment::marker()]),
            Block::Group(item),
            Block::Paragraph(Paragraph::implicit(vec![Segment::text("t")])),
            Block::Paragraph(Paragraph::implicit(vec![Segment::text("u"), Segment::br()])),
        ]);
        normalize(&mut doc);
        let once = doc.clone();
        normalize(&mut doc);
        assert_eq!(doc, once);
    }
}

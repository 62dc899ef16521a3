use crate::model::{Block, BlockGroup, BlockGroupKind, BlockLocation, Document, GroupPath, PathStep};

/// One unit of selected content, reported in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionItem {
    /// Selected segments of one paragraph.
    Segments {
        block: BlockLocation,
        indices: Vec<usize>,
        /// Every segment of the paragraph is selected.
        whole_block: bool,
    },
    /// A selected entity block or divider.
    Block { block: BlockLocation },
    /// A selected table cell.
    Cell {
        table: BlockLocation,
        row: usize,
        col: usize,
        is_whole_table_selected: bool,
    },
    /// The bullet/number format holder of a list item with selected content.
    ListFormatHolder { item: GroupPath },
}

impl SelectionItem {
    /// Location of the block the item lives in (the table for cells).
    pub fn block_location(&self) -> Option<&BlockLocation> {
        match self {
            SelectionItem::Segments { block, .. } | SelectionItem::Block { block } => Some(block),
            SelectionItem::Cell { table, .. } => Some(table),
            SelectionItem::ListFormatHolder { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IterateOptions {
    /// Report list format holders of items containing selected segments.
    pub include_list_format_holder: bool,
    /// Skip the content of selected table cells.
    pub skip_selected_cell_content: bool,
}

/// Collect every selected piece of content.
pub fn iterate_selections(doc: &Document, options: IterateOptions) -> Vec<SelectionItem> {
    let mut items = Vec::new();
    iterate_group(doc, &GroupPath::root(), options, &mut items);
    items
}

fn iterate_group(
    group: &BlockGroup,
    path: &GroupPath,
    options: IterateOptions,
    items: &mut Vec<SelectionItem>,
) {
    for (index, block) in group.blocks.iter().enumerate() {
        let loc = BlockLocation::new(path.clone(), index);
        match block {
            Block::Paragraph(p) => {
                let indices: Vec<usize> = p
                    .segments
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_selected)
                    .map(|(i, _)| i)
                    .collect();
                if !indices.is_empty() {
                    items.push(SelectionItem::Segments {
                        block: loc,
                        whole_block: indices.len() == p.segments.len(),
                        indices,
                    });
                }
            }
            Block::Entity(e) if e.is_selected => items.push(SelectionItem::Block { block: loc }),
            Block::Divider(d) if d.is_selected => items.push(SelectionItem::Block { block: loc }),
            Block::Entity(_) | Block::Divider(_) => {}
            Block::Table(table) => {
                let (_, whole) = table.cell_selection_state();
                for (row, r) in table.rows.iter().enumerate() {
                    for (col, cell) in r.cells.iter().enumerate() {
                        let selected = cell.is_selected_cell();
                        if selected {
                            items.push(SelectionItem::Cell {
                                table: loc.clone(),
                                row,
                                col,
                                is_whole_table_selected: whole,
                            });
                        }
                        if !(selected && options.skip_selected_cell_content) {
                            iterate_group(cell, &loc.cell_path(row, col), options, items);
                        }
                    }
                }
            }
            Block::Group(child) => {
                let child_path = path.child(PathStep::Block(index));
                let start = items.len();
                iterate_group(child, &child_path, options, items);
                let has_segments = items[start..]
                    .iter()
                    .any(|i| matches!(i, SelectionItem::Segments { .. }));
                if options.include_list_format_holder
                    && has_segments
                    && matches!(child.kind, BlockGroupKind::ListItem(_))
                {
                    items.insert(start, SelectionItem::ListFormatHolder { item: child_path });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ListLevel, ListType};
    use crate::model::{Segment, Table};

    #[test]
    fn test_reports_segments_blocks_and_holders() {
        let item = BlockGroup::list_item(vec![ListLevel::new(ListType::Ordered)]).with_blocks(
            vec![Block::paragraph(vec![
                Segment::text("a").selected(),
                Segment::text("b"),
            ])],
        );
        let mut divider = Block::divider();
        if let Block::Divider(d) = &mut divider {
            d.is_selected = true;
        }
        let doc = BlockGroup::document().with_blocks(vec![Block::Group(item), divider]);

        let items = iterate_selections(
            &doc,
            IterateOptions {
                include_list_format_holder: true,
                ..Default::default()
            },
        );
        let item_path = GroupPath::root().child(PathStep::Block(0));
        assert_eq!(
            items,
            vec![
                SelectionItem::ListFormatHolder {
                    item: item_path.clone()
                },
                SelectionItem::Segments {
                    block: BlockLocation::new(item_path, 0),
                    indices: vec![0],
                    whole_block: false,
                },
                SelectionItem::Block {
                    block: BlockLocation::top(1)
                },
            ]
        );
    }

    #[test]
    fn test_whole_table_flag() {
        let mut table = Table::new(1, 2);
        for cell in table.rows[0].cells.iter_mut() {
            if let BlockGroupKind::TableCell(props) = &mut cell.kind {
                props.is_selected = true;
            }
        }
        let doc = BlockGroup::document().with_blocks(vec![Block::Table(table)]);
        let items = iterate_selections(&doc, IterateOptions::default());
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| matches!(
            i,
            SelectionItem::Cell {
                is_whole_table_selected: true,
                ..
            }
        )));
    }
}

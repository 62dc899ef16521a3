//! Block groups: the document root, list items, table cells, format
//! containers and opaque host groups.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use super::block::{Block, Paragraph};
use super::path::{BlockLocation, GroupPath, PathStep, SegmentLocation};
use super::segment::Segment;
use super::{CachedElement, RenderNodeId};
use crate::format::{ListLevel, ParagraphFormat, SegmentFormat, TableCellFormat};

#[derive(Debug, Clone, PartialEq)]
pub struct ListItemProps {
    pub levels: Vec<ListLevel>,
    /// Carries the bullet/number format of the item.
    pub format_holder: Segment,
    pub format: ParagraphFormat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCellProps {
    pub span_left: bool,
    pub span_above: bool,
    pub is_header: bool,
    pub is_selected: bool,
    pub format: TableCellFormat,
    pub dataset: BTreeMap<SmolStr, SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatContainerProps {
    pub tag_name: SmolStr,
    pub format: ParagraphFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockGroupKind {
    /// The root. Never nested.
    Document { format: SegmentFormat },
    ListItem(ListItemProps),
    TableCell(TableCellProps),
    /// Quote or other styled wrapper element.
    FormatContainer(FormatContainerProps),
    /// Host element with block children the model does not interpret.
    General { element: RenderNodeId, is_selected: bool },
}

impl BlockGroupKind {
    pub fn name(&self) -> &'static str {
        match self {
            BlockGroupKind::Document { .. } => "Document",
            BlockGroupKind::ListItem(_) => "ListItem",
            BlockGroupKind::TableCell(_) => "TableCell",
            BlockGroupKind::FormatContainer(_) => "FormatContainer",
            BlockGroupKind::General { .. } => "General",
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockGroupKind::ListItem(_))
    }

    pub fn is_table_cell(&self) -> bool {
        matches!(self, BlockGroupKind::TableCell(_))
    }

    pub fn is_quote(&self) -> bool {
        matches!(self, BlockGroupKind::FormatContainer(c) if c.tag_name == "blockquote")
    }
}

/// An ordered container of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGroup {
    pub kind: BlockGroupKind,
    pub blocks: Vec<Block>,
    /// Element rendered for list items and format containers.
    pub cached_element: Option<CachedElement>,
}

/// The root block group.
pub type Document = BlockGroup;

impl BlockGroup {
    pub fn new(kind: BlockGroupKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            cached_element: None,
        }
    }

    pub fn document() -> Self {
        Self::new(BlockGroupKind::Document {
            format: SegmentFormat::default(),
        })
    }

    pub fn list_item(levels: Vec<ListLevel>) -> Self {
        Self::new(BlockGroupKind::ListItem(ListItemProps {
            levels,
            format_holder: Segment {
                is_selected: false,
                ..Segment::marker()
            },
            format: ParagraphFormat::default(),
        }))
    }

    pub fn table_cell() -> Self {
        Self::new(BlockGroupKind::TableCell(TableCellProps::default()))
    }

    pub fn format_container(tag_name: impl Into<SmolStr>) -> Self {
        Self::new(BlockGroupKind::FormatContainer(FormatContainerProps {
            tag_name: tag_name.into(),
            format: ParagraphFormat::default(),
        }))
    }

    pub fn quote() -> Self {
        Self::format_container("blockquote")
    }

    pub fn general(element: RenderNodeId) -> Self {
        Self::new(BlockGroupKind::General {
            element,
            is_selected: false,
        })
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn is_document(&self) -> bool {
        matches!(self.kind, BlockGroupKind::Document { .. })
    }

    pub fn is_selected_cell(&self) -> bool {
        matches!(&self.kind, BlockGroupKind::TableCell(c) if c.is_selected)
    }

    pub fn list_levels(&self) -> Option<&Vec<ListLevel>> {
        match &self.kind {
            BlockGroupKind::ListItem(item) => Some(&item.levels),
            _ => None,
        }
    }

    fn child_group(&self, step: PathStep) -> Option<&BlockGroup> {
        match step {
            PathStep::Block(i) => match self.blocks.get(i)? {
                Block::Group(g) => Some(g),
                _ => None,
            },
            PathStep::Cell { block, row, col } => match self.blocks.get(block)? {
                Block::Table(t) => t.cell(row, col),
                _ => None,
            },
        }
    }

    fn child_group_mut(&mut self, step: PathStep) -> Option<&mut BlockGroup> {
        match step {
            PathStep::Block(i) => match self.blocks.get_mut(i)? {
                Block::Group(g) => Some(g),
                _ => None,
            },
            PathStep::Cell { block, row, col } => match self.blocks.get_mut(block)? {
                Block::Table(t) => t.cell_mut(row, col),
                _ => None,
            },
        }
    }

    pub fn group_at(&self, path: &GroupPath) -> Option<&BlockGroup> {
        let mut group = self;
        for step in path.steps() {
            group = group.child_group(*step)?;
        }
        Some(group)
    }

    pub fn group_at_mut(&mut self, path: &GroupPath) -> Option<&mut BlockGroup> {
        let mut group = self;
        for step in path.steps() {
            group = group.child_group_mut(*step)?;
        }
        Some(group)
    }

    pub fn block_at(&self, loc: &BlockLocation) -> Option<&Block> {
        self.group_at(&loc.group)?.blocks.get(loc.index)
    }

    pub fn block_at_mut(&mut self, loc: &BlockLocation) -> Option<&mut Block> {
        self.group_at_mut(&loc.group)?.blocks.get_mut(loc.index)
    }

    pub fn paragraph_at(&self, loc: &BlockLocation) -> Option<&Paragraph> {
        self.block_at(loc)?.as_paragraph()
    }

    pub fn paragraph_at_mut(&mut self, loc: &BlockLocation) -> Option<&mut Paragraph> {
        self.block_at_mut(loc)?.as_paragraph_mut()
    }

    pub fn segment_at(&self, loc: &SegmentLocation) -> Option<&Segment> {
        self.paragraph_at(&loc.block)?.segments.get(loc.index)
    }

    /// Groups along `path`, root first. The result has `path.len() + 1`
    /// entries when the path resolves.
    pub fn groups_along(&self, path: &GroupPath) -> Option<Vec<&BlockGroup>> {
        let mut out = Vec::with_capacity(path.len() + 1);
        let mut group = self;
        out.push(group);
        for step in path.steps() {
            group = group.child_group(*step)?;
            out.push(group);
        }
        Some(out)
    }

    /// Depth (prefix length of `path`) of the closest ancestor accepted by
    /// `want`, searching from the innermost group outwards. Returns `None` if
    /// a group accepted by `stop` is met first.
    pub fn closest_ancestor(
        &self,
        path: &GroupPath,
        want: impl Fn(&BlockGroupKind) -> bool,
        stop: impl Fn(&BlockGroupKind) -> bool,
    ) -> Option<usize> {
        let groups = self.groups_along(path)?;
        for (depth, group) in groups.iter().enumerate().rev() {
            if stop(&group.kind) {
                return None;
            }
            if want(&group.kind) {
                return Some(depth);
            }
        }
        None
    }

    /// Visit every block in document order, groups before their children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&BlockLocation, &'a Block)) {
        self.walk_at(&GroupPath::root(), f);
    }

    fn walk_at<'a>(&'a self, path: &GroupPath, f: &mut impl FnMut(&BlockLocation, &'a Block)) {
        for (index, block) in self.blocks.iter().enumerate() {
            let loc = BlockLocation::new(path.clone(), index);
            f(&loc, block);
            match block {
                Block::Group(group) => group.walk_at(&path.child(PathStep::Block(index)), f),
                Block::Table(table) => {
                    for (row_index, row) in table.rows.iter().enumerate() {
                        for (col_index, cell) in row.cells.iter().enumerate() {
                            let cell_path = path.child(PathStep::Cell {
                                block: index,
                                row: row_index,
                                col: col_index,
                            });
                            cell.walk_at(&cell_path, f);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Locations of every paragraph, in document order.
    pub fn paragraph_locations(&self) -> Vec<BlockLocation> {
        let mut out = Vec::new();
        self.walk(&mut |loc, block| {
            if matches!(block, Block::Paragraph(_)) {
                out.push(loc.clone());
            }
        });
        out
    }

    /// Locations of every leaf block (anything but a group), in document order.
    pub fn leaf_locations(&self) -> Vec<BlockLocation> {
        let mut out = Vec::new();
        self.walk(&mut |loc, block| {
            if !matches!(block, Block::Group(_)) {
                out.push(loc.clone());
            }
        });
        out
    }

    /// Remove every cached render element below this group.
    pub fn clear_cached_elements(&mut self) {
        self.cached_element = None;
        for block in &mut self.blocks {
            block.clear_cache();
            match block {
                Block::Group(g) => g.clear_cached_elements(),
                Block::Table(t) => {
                    for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                        cell.clear_cached_elements();
                    }
                }
                _ => {}
            }
        }
    }
}

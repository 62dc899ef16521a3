//! Block-level nodes.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use super::group::BlockGroup;
use super::segment::{Entity, Segment};
use super::CachedElement;
use crate::format::{ParagraphDecorator, ParagraphFormat, SegmentFormat, TableFormat};

/// An ordered run of segments.
///
/// An implicit paragraph renders without its own wrapper element; it exists to
/// host inline content that sits directly inside a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
    pub format: ParagraphFormat,
    pub segment_format: Option<SegmentFormat>,
    pub decorator: Option<ParagraphDecorator>,
    pub is_implicit: bool,
    pub cached_element: Option<CachedElement>,
}

impl Paragraph {
    pub fn new(is_implicit: bool) -> Self {
        Self {
            is_implicit,
            ..Default::default()
        }
    }

    /// Explicit paragraph holding `segments`.
    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    /// Implicit paragraph holding `segments`.
    pub fn implicit(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            is_implicit: true,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: ParagraphFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_decorator(mut self, decorator: ParagraphDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn marker_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_marker)
    }

    pub fn has_selection(&self) -> bool {
        self.segments.iter().any(|s| s.is_selected)
    }

    /// True when every segment is selected (an empty paragraph never is).
    pub fn is_fully_selected(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.is_selected)
    }

    /// Concatenated text content, for diagnostics and tests.
    pub fn text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }

    /// Whether the paragraph could render without a wrapper element.
    pub fn renders_without_wrapper(&self) -> bool {
        self.is_implicit && self.decorator.is_none() && self.format.is_empty()
    }
}

/// A block-level entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBlock {
    pub entity: Entity,
    pub format: ParagraphFormat,
    pub is_selected: bool,
}

impl EntityBlock {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            format: ParagraphFormat::default(),
            is_selected: false,
        }
    }
}

/// Horizontal rule or similar separator.
#[derive(Debug, Clone, PartialEq)]
pub struct Divider {
    pub tag_name: SmolStr,
    pub format: ParagraphFormat,
    pub is_selected: bool,
    pub cached_element: Option<CachedElement>,
}

impl Default for Divider {
    fn default() -> Self {
        Self {
            tag_name: SmolStr::new_static("hr"),
            format: ParagraphFormat::default(),
            is_selected: false,
            cached_element: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<BlockGroup>,
    pub height: Option<u32>,
}

/// A rectangular grid of table cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub widths: Vec<u32>,
    pub format: TableFormat,
    pub dataset: BTreeMap<SmolStr, SmolStr>,
    pub cached_element: Option<CachedElement>,
}

impl Table {
    /// A `rows` x `cols` table whose cells each hold an empty paragraph.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = (0..rows)
            .map(|_| TableRow {
                cells: (0..cols)
                    .map(|_| {
                        let mut cell = BlockGroup::table_cell();
                        cell.blocks
                            .push(Block::Paragraph(Paragraph::implicit(vec![Segment::br()])));
                        cell
                    })
                    .collect(),
                height: None,
            })
            .collect();
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&BlockGroup> {
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut BlockGroup> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    /// Whether any cell is selected, and whether all of them are.
    pub fn cell_selection_state(&self) -> (bool, bool) {
        let mut any = false;
        let mut all = true;
        for cell in self.rows.iter().flat_map(|r| r.cells.iter()) {
            if cell.is_selected_cell() {
                any = true;
            } else {
                all = false;
            }
        }
        (any, any && all)
    }
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Entity(EntityBlock),
    Divider(Divider),
    Group(BlockGroup),
}

impl Block {
    pub fn paragraph(segments: Vec<Segment>) -> Self {
        Block::Paragraph(Paragraph::with_segments(segments))
    }

    pub fn divider() -> Self {
        Block::Divider(Divider::default())
    }

    pub fn entity(entity: Entity) -> Self {
        Block::Entity(EntityBlock::new(entity))
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&BlockGroup> {
        match self {
            Block::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "Paragraph",
            Block::Table(_) => "Table",
            Block::Entity(_) => "Entity",
            Block::Divider(_) => "Divider",
            Block::Group(_) => "BlockGroup",
        }
    }

    /// Whether the whole block is selected as a unit.
    pub fn is_block_selected(&self) -> bool {
        match self {
            Block::Paragraph(p) => p.is_fully_selected(),
            Block::Entity(e) => e.is_selected,
            Block::Divider(d) => d.is_selected,
            Block::Table(t) => t.cell_selection_state().1,
            Block::Group(_) => false,
        }
    }

    /// Drop cached render elements held directly by this block.
    pub fn clear_cache(&mut self) {
        match self {
            Block::Paragraph(p) => p.cached_element = None,
            Block::Table(t) => t.cached_element = None,
            Block::Divider(d) => d.cached_element = None,
            Block::Group(g) => g.cached_element = None,
            Block::Entity(_) => {}
        }
    }
}

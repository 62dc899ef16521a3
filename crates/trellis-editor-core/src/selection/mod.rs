//! Selection model.
//!
//! The selection lives in the model itself: selected segments and blocks
//! carry `is_selected`, a collapsed caret is a `SelectionMarker` segment,
//! selected table cells carry their own flag. `SelectionContext` is the
//! transferable description of a selection used to set or read it back.

mod iterate;
mod set;

pub use iterate::{IterateOptions, SelectionItem, iterate_selections};
pub use set::{clear_selection, set_selection};

use crate::model::{Block, BlockLocation, Document, SegmentKind, SegmentLocation};

/// A position in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelPosition {
    /// Before char `offset` of segment `location.index`. The index may equal
    /// the segment count to address the end of the paragraph.
    Segment {
        location: SegmentLocation,
        offset: usize,
    },
    /// The gap before block `location.index` of a group.
    BlockBoundary { location: BlockLocation },
}

impl ModelPosition {
    pub fn at(block: BlockLocation, index: usize) -> Self {
        ModelPosition::Segment {
            location: SegmentLocation::new(block, index),
            offset: 0,
        }
    }

    pub fn in_text(block: BlockLocation, index: usize, offset: usize) -> Self {
        ModelPosition::Segment {
            location: SegmentLocation::new(block, index),
            offset,
        }
    }

    pub fn before_block(location: BlockLocation) -> Self {
        ModelPosition::BlockBoundary { location }
    }

    /// Sort key in document order.
    fn order_key(&self) -> (BlockLocation, usize, usize) {
        match self {
            ModelPosition::Segment { location, offset } => {
                (location.block.clone(), location.index, *offset)
            }
            ModelPosition::BlockBoundary { location } => (location.clone(), 0, 0),
        }
    }
}

impl PartialOrd for ModelPosition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModelPosition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoordinate {
    pub row: usize,
    pub col: usize,
}

impl CellCoordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A transferable description of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionContext {
    /// Collapsed when `start == end`.
    Range {
        start: ModelPosition,
        end: ModelPosition,
    },
    Table {
        table: BlockLocation,
        first_cell: CellCoordinate,
        last_cell: CellCoordinate,
    },
    Image {
        image: SegmentLocation,
    },
}

impl SelectionContext {
    pub fn caret(position: ModelPosition) -> Self {
        SelectionContext::Range {
            start: position.clone(),
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, SelectionContext::Range { start, end } if start == end)
    }
}

/// Where content goes next: the paragraph holding the caret marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPoint {
    pub paragraph: BlockLocation,
    pub marker_index: usize,
}

impl InsertPoint {
    pub fn marker_location(&self) -> SegmentLocation {
        SegmentLocation::new(self.paragraph.clone(), self.marker_index)
    }
}

/// Locate the first selection marker in document order.
pub fn find_insert_point(doc: &Document) -> Option<InsertPoint> {
    doc.paragraph_locations().into_iter().find_map(|loc| {
        let marker_index = doc.paragraph_at(&loc)?.marker_index()?;
        Some(InsertPoint {
            paragraph: loc,
            marker_index,
        })
    })
}

/// Whether anything in the document is selected.
pub fn has_selection(doc: &Document) -> bool {
    !iterate_selections(doc, IterateOptions::default()).is_empty()
}

/// Read the active selection back from the flags in the model.
pub fn get_selection(doc: &Document) -> Option<SelectionContext> {
    let mut image = None;
    let mut first: Option<ModelPosition> = None;
    let mut last: Option<ModelPosition> = None;
    let mut marker = None;
    let mut tables: Vec<BlockLocation> = Vec::new();

    doc.walk(&mut |loc, block| match block {
        Block::Paragraph(p) => {
            for (index, segment) in p.segments.iter().enumerate() {
                if !segment.is_selected {
                    continue;
                }
                match &segment.kind {
                    SegmentKind::Image(img) if img.is_selected_as_image_selection => {
                        image = Some(SegmentLocation::new(loc.clone(), index));
                    }
                    SegmentKind::SelectionMarker => {
                        if marker.is_none() {
                            marker = Some(ModelPosition::at(loc.clone(), index));
                        }
                    }
                    _ => {
                        if first.is_none() {
                            first = Some(ModelPosition::at(loc.clone(), index));
                        }
                        last = Some(ModelPosition::at(loc.clone(), index + 1));
                    }
                }
            }
        }
        Block::Entity(e) if e.is_selected => {
            if first.is_none() {
                first = Some(ModelPosition::before_block(loc.clone()));
            }
            last = Some(ModelPosition::before_block(loc.with_index(loc.index + 1)));
        }
        Block::Divider(d) if d.is_selected => {
            if first.is_none() {
                first = Some(ModelPosition::before_block(loc.clone()));
            }
            last = Some(ModelPosition::before_block(loc.with_index(loc.index + 1)));
        }
        Block::Table(t) if t.cell_selection_state().0 => tables.push(loc.clone()),
        _ => {}
    });

    if let Some(image) = image {
        return Some(SelectionContext::Image { image });
    }
    if let (Some(start), Some(end)) = (first.clone(), last) {
        // A selected marker at the very start of a range is part of it.
        let start = match marker {
            Some(m) if m < start => m,
            _ => start,
        };
        return Some(SelectionContext::Range { start, end });
    }
    if let Some(table_loc) = tables.first() {
        let table = doc.block_at(table_loc)?.as_table()?;
        let mut first_cell: Option<CellCoordinate> = None;
        let mut last_cell = CellCoordinate::new(0, 0);
        for (row, r) in table.rows.iter().enumerate() {
            for (col, cell) in r.cells.iter().enumerate() {
                if cell.is_selected_cell() {
                    let fc = first_cell.get_or_insert(CellCoordinate::new(row, col));
                    fc.row = fc.row.min(row);
                    fc.col = fc.col.min(col);
                    last_cell.row = last_cell.row.max(row);
                    last_cell.col = last_cell.col.max(col);
                }
            }
        }
        return Some(SelectionContext::Table {
            table: table_loc.clone(),
            first_cell: first_cell?,
            last_cell,
        });
    }
    marker.map(SelectionContext::caret)
}

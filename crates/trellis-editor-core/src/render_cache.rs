//! Render caching: content hashes, the rewrite ledger and the node index.
//!
//! Model nodes remember the element rendered for them together with a hash
//! of what went into it. A later sync reuses the element while the hash still
//! matches and the element is still in the tree.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::model::{
    BlockGroup, BlockGroupKind, BlockLocation, Divider, GroupPath, Paragraph, RenderNodeId,
    Segment, SegmentKind, SegmentLocation, Table,
};

/// Hash of everything a paragraph renders. Markers and selection flags do
/// not render and are left out.
pub fn hash_paragraph(paragraph: &Paragraph, with_delimiters: bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    paragraph.format.hash(&mut hasher);
    paragraph.segment_format.hash(&mut hasher);
    paragraph.decorator.hash(&mut hasher);
    paragraph.is_implicit.hash(&mut hasher);
    with_delimiters.hash(&mut hasher);
    for segment in paragraph.segments.iter().filter(|s| !s.is_marker()) {
        hash_segment(segment, &mut hasher);
    }
    hasher.finish()
}

fn hash_segment(segment: &Segment, hasher: &mut DefaultHasher) {
    match &segment.kind {
        SegmentKind::Image(image) => {
            "img".hash(hasher);
            image.src.hash(hasher);
            image.alt.hash(hasher);
        }
        kind => kind.hash(hasher),
    }
    segment.format.hash(hasher);
    segment.link.hash(hasher);
}

/// Hash of the table shell: everything but cell content.
pub fn hash_table_shell(table: &Table) -> u64 {
    let mut hasher = DefaultHasher::new();
    table.format.hash(&mut hasher);
    table.dataset.hash(&mut hasher);
    table.widths.hash(&mut hasher);
    for row in &table.rows {
        row.height.hash(&mut hasher);
        row.cells.len().hash(&mut hasher);
        for cell in &row.cells {
            if let BlockGroupKind::TableCell(props) = &cell.kind {
                props.span_left.hash(&mut hasher);
                props.span_above.hash(&mut hasher);
                props.is_header.hash(&mut hasher);
                props.format.hash(&mut hasher);
                props.dataset.hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

/// Hash of a group's own element, excluding its children.
pub fn hash_group_shell(group: &BlockGroup) -> u64 {
    let mut hasher = DefaultHasher::new();
    group.kind.name().hash(&mut hasher);
    match &group.kind {
        BlockGroupKind::ListItem(item) => {
            item.levels.hash(&mut hasher);
            item.format_holder.format.hash(&mut hasher);
            item.format.hash(&mut hasher);
        }
        BlockGroupKind::FormatContainer(container) => {
            container.tag_name.hash(&mut hasher);
            container.format.hash(&mut hasher);
        }
        BlockGroupKind::General { element, .. } => element.hash(&mut hasher),
        BlockGroupKind::Document { .. } | BlockGroupKind::TableCell(_) => {}
    }
    hasher.finish()
}

pub fn hash_divider(divider: &Divider) -> u64 {
    let mut hasher = DefaultHasher::new();
    divider.tag_name.hash(&mut hasher);
    divider.format.hash(&mut hasher);
    hasher.finish()
}

/// Block elements a sync added to or removed from the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteLedger {
    pub added_block_elements: Vec<RenderNodeId>,
    pub removed_block_elements: Vec<RenderNodeId>,
}

impl RewriteLedger {
    pub fn is_empty(&self) -> bool {
        self.added_block_elements.is_empty() && self.removed_block_elements.is_empty()
    }

    pub fn extend(&mut self, other: RewriteLedger) {
        self.added_block_elements.extend(other.added_block_elements);
        self.removed_block_elements.extend(other.removed_block_elements);
    }
}

/// What a delimiter anchors to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DelimiterOwner {
    Inline(SegmentLocation),
    Block(BlockLocation),
}

/// The model node a render node was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEntry {
    /// Element of a block group (the root, a list item, a cell, a container).
    Group(GroupPath),
    /// Element of a paragraph, table, divider or block entity container.
    Block(BlockLocation),
    /// Top-level node of a segment.
    Segment(SegmentLocation),
    /// Text node holding a text segment's characters.
    Text(SegmentLocation),
    /// Caret anchor beside an entity.
    Delimiter { owner: DelimiterOwner, before: bool },
}

/// Map from render nodes to the model nodes they came from, rebuilt on every
/// sync.
#[derive(Debug, Clone, Default)]
pub struct RenderIndex {
    entries: HashMap<RenderNodeId, IndexEntry>,
    blocks: HashMap<BlockLocation, RenderNodeId>,
    groups: HashMap<GroupPath, RenderNodeId>,
    segments: HashMap<SegmentLocation, RenderNodeId>,
}

impl RenderIndex {
    pub fn get(&self, node: RenderNodeId) -> Option<&IndexEntry> {
        self.entries.get(&node)
    }

    pub fn block_node(&self, location: &BlockLocation) -> Option<RenderNodeId> {
        self.blocks.get(location).copied()
    }

    pub fn group_node(&self, path: &GroupPath) -> Option<RenderNodeId> {
        self.groups.get(path).copied()
    }

    pub fn segment_node(&self, location: &SegmentLocation) -> Option<RenderNodeId> {
        self.segments.get(location).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, node: RenderNodeId, entry: IndexEntry) {
        match &entry {
            IndexEntry::Group(path) => {
                self.groups.insert(path.clone(), node);
            }
            IndexEntry::Block(location) => {
                self.blocks.insert(location.clone(), node);
            }
            IndexEntry::Segment(location) => {
                self.segments.insert(location.clone(), node);
            }
            IndexEntry::Text(_) | IndexEntry::Delimiter { .. } => {}
        }
        self.entries.insert(node, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SegmentFormat;
    use crate::model::Segment;

    #[test]
    fn test_paragraph_hash_ignores_selection() {
        let plain = Paragraph::with_segments(vec![Segment::text("ab"), Segment::text("c")]);
        let selected = Paragraph::with_segments(vec![
            Segment::text("ab").selected(),
            Segment::marker(),
            Segment::text("c"),
        ]);
        assert_eq!(hash_paragraph(&plain, true), hash_paragraph(&selected, true));
    }

    #[test]
    fn test_paragraph_hash_sees_format_and_options() {
        let plain = Paragraph::with_segments(vec![Segment::text("ab")]);
        let bold = Paragraph::with_segments(vec![Segment::text("ab").with_format(SegmentFormat {
            font_weight: Some("bold".into()),
            ..Default::default()
        })]);
        assert_ne!(hash_paragraph(&plain, true), hash_paragraph(&bold, true));
        assert_ne!(hash_paragraph(&plain, true), hash_paragraph(&plain, false));
    }

    #[test]
    fn test_table_shell_ignores_cell_selection() {
        let table = Table::new(2, 2);
        let mut selected = table.clone();
        if let Some(BlockGroupKind::TableCell(props)) =
            selected.cell_mut(1, 1).map(|c| &mut c.kind)
        {
            props.is_selected = true;
        }
        assert_eq!(hash_table_shell(&table), hash_table_shell(&selected));
    }

    #[test]
    fn test_index_reverse_lookup() {
        let mut index = RenderIndex::default();
        let location = SegmentLocation::new(BlockLocation::top(0), 2);
        index.insert(RenderNodeId(4), IndexEntry::Segment(location.clone()));
        assert_eq!(index.segment_node(&location), Some(RenderNodeId(4)));
        assert_eq!(
            index.get(RenderNodeId(4)),
            Some(&IndexEntry::Segment(location))
        );
        assert_eq!(index.len(), 1);
    }
}

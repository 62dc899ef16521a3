//! The document model: block groups, blocks, segments, tables and entities.
//!
//! Ownership is strictly downward. A group owns its blocks, a paragraph owns
//! its segments, a table owns its rows and cells. Render nodes are referenced
//! by [`RenderNodeId`] and are never owned by the model.

mod block;
mod group;
pub mod normalize;
mod path;
mod segment;
pub mod validate;

pub use block::{Block, Divider, EntityBlock, Paragraph, Table, TableRow};
pub use group::{
    BlockGroup, BlockGroupKind, Document, FormatContainerProps, ListItemProps, TableCellProps,
};
pub use normalize::{normalize, normalize_paragraph};
pub use path::{BlockLocation, GroupPath, PathStep, SegmentLocation};
pub use segment::{Entity, Image, Segment, SegmentKind, ZERO_WIDTH_SPACE};
pub(crate) use segment::split_text_segment;
pub use validate::validate;

/// Handle to a node of the external render tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderNodeId(pub u32);

impl std::fmt::Display for RenderNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A render element produced for a model node on an earlier sync.
///
/// `content_hash` is the hash of the node's rendered content at the time the
/// element was built; the synchronizer reuses the element only while it still
/// matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedElement {
    pub node: RenderNodeId,
    pub content_hash: u64,
}

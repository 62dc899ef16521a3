//! Index-based addressing of model nodes.
//!
//! Nodes do not point at their parents. Any code that needs ancestry walks a
//! `GroupPath` down from the root instead. Locations are only valid until the
//! next structural mutation of the groups they pass through.

use std::cmp::Ordering;

/// One step from a group into a child group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Into the block group at this index.
    Block(usize),
    /// Into a cell of the table at `block`.
    Cell { block: usize, row: usize, col: usize },
}

impl PathStep {
    pub fn block_index(&self) -> usize {
        match *self {
            PathStep::Block(i) => i,
            PathStep::Cell { block, .. } => block,
        }
    }

    fn order_key(&self) -> (usize, usize, usize) {
        match *self {
            PathStep::Block(i) => (i, 0, 0),
            PathStep::Cell { block, row, col } => (block, row, col),
        }
    }
}

/// Path from the document root to a block group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupPath {
    steps: Vec<PathStep>,
}

impl GroupPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// The first `depth` steps.
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            steps: self.steps[..depth.min(self.steps.len())].to_vec(),
        }
    }

    /// The location of this group as a block of its parent, if it is one.
    ///
    /// Table cells are not blocks, so a path ending in a cell step yields
    /// the location of the table instead.
    pub fn as_block_location(&self) -> Option<BlockLocation> {
        let (last, parent) = self.steps.split_last()?;
        Some(BlockLocation::new(
            Self {
                steps: parent.to_vec(),
            },
            last.block_index(),
        ))
    }

    /// Prefix up to and including the innermost table cell step, if any.
    pub fn table_cell_scope(&self) -> GroupPath {
        let end = self
            .steps
            .iter()
            .rposition(|s| matches!(s, PathStep::Cell { .. }))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.prefix(end)
    }

    fn cmp_keys(&self, other: &Self) -> Ordering {
        let a = self.steps.iter().map(PathStep::order_key);
        let b = other.steps.iter().map(PathStep::order_key);
        a.cmp(b)
    }
}

impl PartialOrd for GroupPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_keys(other)
    }
}

/// A block inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockLocation {
    pub group: GroupPath,
    pub index: usize,
}

impl BlockLocation {
    pub fn new(group: GroupPath, index: usize) -> Self {
        Self { group, index }
    }

    pub fn top(index: usize) -> Self {
        Self::new(GroupPath::root(), index)
    }

    /// Path into this block when it is a block group.
    pub fn as_group_path(&self) -> GroupPath {
        self.group.child(PathStep::Block(self.index))
    }

    /// Path into a cell when this block is a table.
    pub fn cell_path(&self, row: usize, col: usize) -> GroupPath {
        self.group.child(PathStep::Cell {
            block: self.index,
            row,
            col,
        })
    }

    pub fn with_index(&self, index: usize) -> Self {
        Self::new(self.group.clone(), index)
    }

    fn order_keys(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.group
            .steps()
            .iter()
            .map(PathStep::order_key)
            .chain(std::iter::once((self.index, 0, 0)))
    }
}

impl PartialOrd for BlockLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockLocation {
    /// Document order. A block sorts before anything nested inside it.
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_keys().cmp(other.order_keys())
    }
}

/// A segment inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentLocation {
    pub block: BlockLocation,
    pub index: usize,
}

impl SegmentLocation {
    pub fn new(block: BlockLocation, index: usize) -> Self {
        Self { block, index }
    }
}

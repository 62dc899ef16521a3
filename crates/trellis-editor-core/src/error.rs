//! Error types for model operations.

use thiserror::Error;

use crate::model::{BlockLocation, GroupPath};
use crate::platform::PlatformError;

/// Errors raised by model operations.
///
/// Structural invariant violations are reported rather than repaired; the
/// mutation that hit them is abandoned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    #[error("no block group at {0:?}")]
    GroupNotFound(GroupPath),

    #[error("no block at {0:?}")]
    BlockNotFound(BlockLocation),

    #[error("expected a paragraph at {0:?}")]
    NotAParagraph(BlockLocation),

    #[error("paragraph at {location:?} holds {count} selection markers")]
    DuplicateMarker { location: BlockLocation, count: usize },

    #[error("document root must be a Document group, found {0}")]
    InvalidRoot(&'static str),

    #[error("Document group nested at {0:?}")]
    NestedDocument(GroupPath),

    #[error("table at {0:?} is not rectangular")]
    RaggedTable(BlockLocation),

    #[error("image selection coexists with other selected content")]
    ConflictingSelection,

    #[error("selection endpoint does not resolve: {0}")]
    InvalidPosition(String),

    #[error("invalid editor options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("render tree error: {0}")]
    Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, ModelError>;

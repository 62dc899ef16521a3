//! trellis-editor-core: structured rich-text editing without a render backend.
//!
//! This crate provides:
//! - The document model (`BlockGroup`, `Block`, `Segment`) with normalization
//!   and validation
//! - Selection iteration, setting and retrieval over that model
//! - The keyboard delete pipeline and structural editors
//! - Entity delimiter handling on the model side
//! - Synchronization of the model into any `RenderTree`, in one pass or in
//!   chunks

pub mod actions;
pub mod delete;
pub mod edit;
pub mod entity;
pub mod error;
pub mod events;
pub mod execute;
pub mod format;
pub mod model;
pub mod options;
pub mod platform;
pub mod render;
pub mod render_cache;
pub mod selection;
pub mod undo;

pub use actions::{InputEvent, InputType, Key, KeyboardEvent, KeydownResult, Modifiers, RawEvent};
pub use delete::{
    DeleteResult, DeleteSelectionResult, DeleteStep, DeleteStepContext, delete_selection,
    delete_steps_for, handle_keyboard_event_result, keyboard_delete,
};
pub use edit::{
    clear_format, merge_paragraphs, outdent_list_item, split_paragraph, unwrap_list_item,
};
pub use error::{ModelError, Result};
pub use events::{EntityOperation, Notification, NotificationSink, NullSink, RecordingSink};
pub use execute::{
    ChangeSource, DeletedEntity, EntityRemoval, FormatContext, ModelMutation, MutationFlags,
    execute,
};
pub use format::{
    Link, ListLevel, ListType, ParagraphDecorator, ParagraphFormat, SegmentFormat,
    TableCellFormat, TableFormat,
};
pub use model::{
    Block, BlockGroup, BlockGroupKind, BlockLocation, CachedElement, Divider, Document, Entity,
    EntityBlock, GroupPath, Image, Paragraph, PathStep, RenderNodeId, Segment, SegmentKind,
    SegmentLocation, Table, TableRow, ZERO_WIDTH_SPACE, normalize, validate,
};
pub use options::{EditorOptions, ExperimentalFeature};
pub use platform::{
    DeleteGesturePolicy, NodeKind, Platform, PlatformError, RenderTree, TreePosition,
    TreeSelection,
};
pub use render::{ChunkedConversion, RenderResult, content_model_to_tree};
pub use render_cache::{DelimiterOwner, IndexEntry, RenderIndex, RewriteLedger};
pub use selection::{
    CellCoordinate, InsertPoint, ModelPosition, SelectionContext, find_insert_point,
    get_selection, set_selection,
};
pub use smol_str::SmolStr;
pub use undo::{SnapshotLog, UndoCollaborator};

//! trellis-editor-dom: the host side of trellis.
//!
//! This crate provides:
//! - `MemoryTree`, an in-memory `RenderTree` used as the reference host
//! - Selection readback from the render tree into the model (`dom_sync`)
//! - Delimiter maintenance and the delimiter keydown state machine
//! - `Editor`, the facade running mutate, sync and notify cycles
//! - Async chunked rendering and HTML export on tokio
//! - Tracing setup
//!
//! Re-exports all of `trellis-editor-core` for convenience.

pub mod delimiter;
pub mod dom_sync;
pub mod editor;
pub mod error;
pub mod export;
pub mod telemetry;
pub mod tree;

pub use trellis_editor_core;
pub use trellis_editor_core::*;

pub use delimiter::{
    DelimiterKeyAction, DelimiterScan, ExcisedText, handle_delimiter_content_changed,
    handle_delimiter_keydown, is_entity_delimiter, parse_entity_format,
};
pub use dom_sync::{should_delete_with_model, tree_selection_to_model};
pub use editor::Editor;
pub use error::EditorError;
pub use export::{content_model_to_tree_async, export_html_async};
pub use tree::MemoryTree;

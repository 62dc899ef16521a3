use thiserror::Error;
use trellis_editor_core::{ModelError, PlatformError};

/// Errors surfaced by the editor facade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("render tree error: {0}")]
    Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, EditorError>;

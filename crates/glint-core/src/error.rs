//! Error types for Glint

use thiserror::Error;

/// The main error type for Glint operations
#[derive(Debug, Error)]
pub enum GlintError {
    /// Malformed or incomplete asset file. Non-fatal; prior scene state is
    /// left untouched by the caller.
    #[error("Import error: {0}")]
    Import(String),

    /// Missing or corrupt 2D image. Degrades one material slot, never
    /// aborts the frame.
    #[error("Texture load error: {0}")]
    TextureLoad(String),

    /// Missing or corrupt HDR panorama or cubemap face set. Callers fall
    /// back to the procedural gradient sky.
    #[error("Environment load error: {0}")]
    Environment(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Glint operations
pub type Result<T> = std::result::Result<T, GlintError>;

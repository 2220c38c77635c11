use crate::Depth;

/// Result alias that carries the custom [`VideoError`] type.
pub type Result<T> = std::result::Result<T, VideoError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// A required input was absent, most often a surface without pixel memory.
    #[error("missing argument: {0}")]
    NullArgument(&'static str),
    /// The pixel format is unsupported for the operation, or the two
    /// surfaces involved disagree on it.
    #[error("invalid or mismatched depth for this operation")]
    InvalidDepth,
    /// A region is not contained within the surface it refers to.
    #[error("region is out of bounds")]
    OutOfBounds,
    /// An indexed surface was used without a palette.
    #[error("indexed surface has no palette")]
    PaletteMissing,
    /// A palette would exceed 256 entries.
    #[error("palette of {0} entries exceeds the 256 entry limit")]
    PaletteSize(usize),
    /// A custom compose strategy has no function for the depth pair.
    #[error("no compose function registered for {dest:?} <- {src:?}")]
    NoComposeFunction { dest: Depth, src: Depth },
    /// The pixel buffer could not be allocated.
    #[error("failed to allocate a pixel buffer of {0} bytes")]
    AllocationFailure(usize),
    /// Two surfaces that must share dimension, depth or pitch do not.
    #[error("surfaces are not identical: {0}")]
    AttributeMismatch(&'static str),
    /// Rejected configuration or argument value.
    #[error("{0}")]
    InvalidInput(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around configuration parse errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl VideoError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::InvalidInput(msg.into())
    }
}

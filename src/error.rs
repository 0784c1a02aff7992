//! Error taxonomy, implemented with `thiserror` following the style of
//! `strawlab-strand-braid/convert-image`'s `Error` enum.

use thiserror::Error;

/// Raised when an "image expression" or a destination image's shape does not
/// match the operation's expected dimensions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("shape mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
pub struct ShapeMismatch {
    pub expected_width: u32,
    pub expected_height: u32,
    pub actual_width: u32,
    pub actual_height: u32,
}

/// Raised by `reallocate` when the image is currently backed by external
/// (non-owned) memory and `allow_view_reallocation` is `false`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot reallocate an image backed by a view with allow_view_reallocation = false")]
pub struct CannotReallocateView;

/// Errors surfaced by the PNG decode cycle.
#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decoder method called out of state-machine order")]
    InvalidPhase,
    #[error("malformed PNG stream or decompression parameter conflict: {0}")]
    Malformed(String),
    #[error("I/O failure reading source: {0}")]
    Io(#[from] std::io::Error),
    #[error("destination does not match the negotiated output shape")]
    Shape(#[from] ShapeMismatch),
}

/// Errors surfaced by the PNG encode path.
#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O failure writing sink: {0}")]
    Io(#[from] std::io::Error),
    #[error("pixel format {0:?} has no PNG encoding")]
    UnsupportedFormat(crate::format::PixelFormat),
    #[error("interlaced PNG output is not supported by this encoder backend")]
    InterlacingUnsupported,
}

/// Raised when an allocator cannot produce the requested block.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("allocation of {requested} bytes (align {align}) failed")]
pub struct AllocError {
    pub requested: usize,
    pub align: usize,
}

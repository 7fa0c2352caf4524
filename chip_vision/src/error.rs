// THEORY:
// Error types for the chip vision engine.
//
// Classification misses and unmatched colors are not errors; they are valid
// negative results (`None` or an empty detection list). Errors are reserved
// for invalid inputs, bad configuration and I/O.

use thiserror::Error;

/// Top-level error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied data the operation cannot work with
    /// (e.g. calibrating from an empty region, a digit list of the wrong length).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration failed validation or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A frame could not be acquired.
    #[error("frame source error: {0}")]
    Frame(#[from] FrameError),

    /// Image decoding/encoding failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame acquisition failures. All of them are recoverable for the tick loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// No physical or file-backed source is attached.
    #[error("no frame source attached")]
    Unavailable,

    /// A finite source has delivered its last frame.
    #[error("frame source exhausted")]
    Exhausted,

    /// A frame was read but could not be decoded.
    #[error("could not decode frame: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

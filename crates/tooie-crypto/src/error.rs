//! Error types for checksum operations

use thiserror::Error;

/// Errors that can occur while computing the cartridge checksum
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    /// The checksum window or the bookkeeping words lie past the end of the image
    #[error("checksum window out of bounds: needs 0x{required:X} bytes, image has 0x{len:X}")]
    WindowOutOfBounds {
        /// Number of bytes the computation needs
        required: usize,
        /// Actual image length
        len: usize,
    },

    /// The checksum window is empty, reversed, or not a whole number of words
    #[error("invalid checksum window 0x{start:X}..0x{end:X}")]
    InvalidWindow {
        /// Window start offset
        start: usize,
        /// Window end offset
        end: usize,
    },
}

/// Result type for checksum operations
pub type ChecksumResult<T> = Result<T, ChecksumError>;

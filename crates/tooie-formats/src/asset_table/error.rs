//! Asset table error types

use crate::buffer::BufferError;
use thiserror::Error;

/// Errors raised while resolving pointer table entries
#[derive(Debug, Error)]
pub enum TableError {
    /// A pointer word resolves to an address outside the image
    #[error(
        "malformed pointer for asset 0x{id:X}: word 0x{word:08X} at 0x{pointer_offset:X} resolves to 0x{address:X}, image length is 0x{len:X}"
    )]
    MalformedPointer {
        /// Table index
        id: usize,
        /// Byte offset of the pointer word
        pointer_offset: usize,
        /// Raw pointer word
        word: u32,
        /// Resolved address
        address: usize,
        /// Image length
        len: usize,
    },

    /// An entry ends before it starts
    #[error("asset 0x{id:X} range is inverted: 0x{start:X}..0x{end:X}")]
    InvertedRange {
        /// Table index
        id: usize,
        /// Resolved start address
        start: usize,
        /// Resolved end address
        end: usize,
    },

    /// An id walk was requested with a zero step
    #[error("id interval must be non-zero")]
    ZeroInterval,

    /// Reading the pointer word itself failed
    #[error("pointer table read failed: {0}")]
    Buffer(#[from] BufferError),
}

/// Result type for asset table operations
pub type TableResult<T> = Result<T, TableError>;

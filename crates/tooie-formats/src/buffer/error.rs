//! Byte buffer error types

use thiserror::Error;

/// Errors raised by [`ByteBuffer`](super::ByteBuffer) accessors
#[derive(Debug, Error)]
pub enum BufferError {
    /// Access past the end of the buffer
    #[error("out of bounds: 0x{offset:X} + 0x{width:X} exceeds buffer length 0x{len:X}")]
    OutOfBounds {
        /// Requested start offset
        offset: usize,
        /// Requested width in bytes
        width: usize,
        /// Buffer length
        len: usize,
    },

    /// Integer width outside 1..=8 bytes
    #[error("invalid integer width: {0} bytes (must be 1-8)")]
    InvalidWidth(usize),

    /// Value does not fit in the requested width
    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange {
        /// Value that was to be written
        value: i128,
        /// Target width in bytes
        width: usize,
    },

    /// String longer than its target field
    #[error("string of {len} characters exceeds field width {width}")]
    StringTooLong {
        /// String length in characters
        len: usize,
        /// Field width in bytes
        width: usize,
    },

    /// Character outside the single-byte range
    #[error("character {0:?} cannot be encoded as Latin-1")]
    NotLatin1(char),

    /// Malformed hexadecimal input
    #[error("invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// I/O error while loading or saving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

//! Compression codec error types

use thiserror::Error;

/// Errors raised while framing, inflating or deflating asset blobs
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The raw deflate stream is malformed or truncated
    #[error("inflate failed: {0}")]
    Inflate(String),

    /// The raw deflate encoder could not be run
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Encoder output did not have the expected container layout
    #[error("encoder framing not found: {0}")]
    FramingNotFound(String),

    /// Category name with no padding rule
    #[error("unknown asset category: {0:?}")]
    UnknownCategory(String),

    /// Blob too short to carry the size header
    #[error("compressed blob of {0} bytes is shorter than its size header")]
    FramingTooShort(usize),

    /// Payload too large for the 16-bit size header
    #[error("payload of {0} bytes does not fit the size header")]
    PayloadTooLarge(usize),

    /// Inflated output passed the safety limit
    #[error("decompressed size exceeds limit of {0} bytes")]
    DecompressedTooLarge(usize),

    /// I/O error while driving the encoder
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for compression operations
pub type CompressionResult<T> = Result<T, CompressionError>;

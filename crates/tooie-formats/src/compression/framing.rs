//! On-ROM framing of compressed assets
//!
//! ```text
//! +--------+----------------------+------------------+
//! | u16 BE | raw deflate stream   | padding          |
//! | size   |                      | (category byte)  |
//! +--------+----------------------+------------------+
//! ```
//!
//! The size field holds `ceil(decompressed_len / 16)`. Padding extends the
//! whole blob to the category's alignment.

use super::category::AssetCategory;
use super::error::{CompressionError, CompressionResult};

/// Trailing byte stripped when unframing
pub const PADDING_SENTINEL: u8 = 0xAA;

/// Width of the size header
pub const SIZE_HEADER_LEN: usize = 2;

/// A compressed blob split into its framing parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramedAsset<'a> {
    /// Stored size field
    pub size_header: u16,
    /// Everything after the size field, padding included
    pub body: &'a [u8],
    /// Number of trailing sentinel bytes at the end of `body`
    pub padding_len: usize,
}

impl<'a> FramedAsset<'a> {
    /// Body with the trailing sentinel run removed.
    ///
    /// A stream that genuinely ends in `0xAA` loses those bytes here; see
    /// [`AssetCodec::decode`](super::AssetCodec::decode), which inflates the
    /// full body instead.
    pub fn payload(&self) -> &'a [u8] {
        &self.body[..self.body.len() - self.padding_len]
    }
}

/// Count the run of sentinel bytes at the end of `bytes`
pub fn trailing_padding(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rev()
        .take_while(|&&byte| byte == PADDING_SENTINEL)
        .count()
}

/// Split a compressed blob into size header, body and padding
pub fn unframe(blob: &[u8]) -> CompressionResult<FramedAsset<'_>> {
    if blob.len() < SIZE_HEADER_LEN {
        return Err(CompressionError::FramingTooShort(blob.len()));
    }

    let size_header = u16::from_be_bytes([blob[0], blob[1]]);
    let body = &blob[SIZE_HEADER_LEN..];
    Ok(FramedAsset {
        size_header,
        body,
        padding_len: trailing_padding(body),
    })
}

/// Size field for a payload of `decompressed_len` bytes
pub fn size_header(decompressed_len: usize) -> CompressionResult<u16> {
    u16::try_from(decompressed_len.div_ceil(16))
        .map_err(|_| CompressionError::PayloadTooLarge(decompressed_len))
}

/// Prefix the size field and pad the blob to the category's alignment
pub fn frame(
    stream: &[u8],
    decompressed_len: usize,
    category: AssetCategory,
) -> CompressionResult<Vec<u8>> {
    let header = size_header(decompressed_len)?;
    let interval = category.padding_interval();

    let unpadded = SIZE_HEADER_LEN + stream.len();
    let mut blob = Vec::with_capacity(unpadded.next_multiple_of(interval));
    blob.extend_from_slice(&header.to_be_bytes());
    blob.extend_from_slice(stream);
    while blob.len() % interval != 0 {
        blob.push(category.padding_byte());
    }
    Ok(blob)
}

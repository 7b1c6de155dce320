//! Offset-addressed access to a loaded binary image
//!
//! [`ByteBuffer`] owns the bytes of a ROM or extracted asset and exposes
//! typed accessors over them. Every accessor takes an explicit offset and
//! width; nothing ever grows or truncates the buffer, and any range that
//! leaves the buffer is reported as [`BufferError::OutOfBounds`].
//!
//! Integers are big-endian with an arbitrary width of one to eight bytes.
//! Floats are four-byte big-endian IEEE-754. Strings use one byte per
//! character (Latin-1) and carry no length prefix.

mod error;

pub use error::{BufferError, BufferResult};

use std::fs;
use std::ops::Range;
use std::path::Path;

/// Largest integer width handled by the accessors
pub const MAX_INT_WIDTH: usize = 8;

/// Format `value` as upper-case hex, zero-padded to `width` bytes
pub fn hex_string(value: u64, width: usize) -> String {
    format!("{value:0digits$X}", digits = width * 2)
}

/// Mutable, fixed-length byte sequence with typed accessors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ByteBuffer {
    /// Wrap an owned byte vector
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Read a whole file into a buffer
    pub fn load(path: impl AsRef<Path>) -> BufferResult<Self> {
        Ok(Self::new(fs::read(path)?))
    }

    /// Write the buffer verbatim to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> BufferResult<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn checked_range(&self, offset: usize, width: usize) -> BufferResult<Range<usize>> {
        match offset.checked_add(width) {
            Some(end) if end <= self.data.len() => Ok(offset..end),
            _ => Err(BufferError::OutOfBounds {
                offset,
                width,
                len: self.data.len(),
            }),
        }
    }

    /// Borrow `width` bytes starting at `offset`
    pub fn slice(&self, offset: usize, width: usize) -> BufferResult<&[u8]> {
        let range = self.checked_range(offset, width)?;
        Ok(&self.data[range])
    }

    /// Overwrite bytes starting at `offset`
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> BufferResult<()> {
        let range = self.checked_range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Set `width` bytes starting at `offset` to `value`
    pub fn fill(&mut self, offset: usize, width: usize, value: u8) -> BufferResult<()> {
        let range = self.checked_range(offset, width)?;
        self.data[range].fill(value);
        Ok(())
    }

    /// Read an unsigned big-endian integer of `width` bytes
    pub fn read_uint(&self, offset: usize, width: usize) -> BufferResult<u64> {
        check_width(width)?;
        let bytes = self.slice(offset, width)?;
        Ok(bytes
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
    }

    /// Read a two's-complement signed big-endian integer of `width` bytes
    pub fn read_signed_int(&self, offset: usize, width: usize) -> BufferResult<i64> {
        let raw = self.read_uint(offset, width)?;
        let shift = 64 - 8 * width as u32;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Write an unsigned big-endian integer of `width` bytes
    pub fn write_uint(&mut self, offset: usize, value: u64, width: usize) -> BufferResult<()> {
        check_width(width)?;
        if value & !width_mask(width) != 0 {
            return Err(BufferError::ValueOutOfRange {
                value: i128::from(value),
                width,
            });
        }
        let bytes = value.to_be_bytes();
        self.write_bytes(offset, &bytes[MAX_INT_WIDTH - width..])
    }

    /// Write a signed integer of `width` bytes.
    ///
    /// Non-negative values are stored as-is (the full unsigned range of the
    /// width is accepted). Negative values are re-biased by `2^(8 * width)`
    /// before serialization.
    pub fn write_int(&mut self, offset: usize, value: i64, width: usize) -> BufferResult<()> {
        check_width(width)?;
        if value >= 0 {
            return self.write_uint(offset, value as u64, width);
        }

        let bits = 8 * width as u32;
        let min = i128::from(i64::MIN) >> (64 - bits);
        if i128::from(value) < min {
            return Err(BufferError::ValueOutOfRange {
                value: i128::from(value),
                width,
            });
        }

        let biased = (value as u64) & width_mask(width);
        self.write_uint(offset, biased, width)
    }

    /// Read a 4-byte big-endian IEEE-754 float
    pub fn read_f32(&self, offset: usize) -> BufferResult<f32> {
        let bytes = self.slice(offset, 4)?;
        Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write a 4-byte big-endian IEEE-754 float
    pub fn write_f32(&mut self, offset: usize, value: f32) -> BufferResult<()> {
        self.write_bytes(offset, &value.to_be_bytes())
    }

    /// Decode `length` bytes as Latin-1 text
    pub fn read_latin_string(&self, offset: usize, length: usize) -> BufferResult<String> {
        let bytes = self.slice(offset, length)?;
        Ok(bytes.iter().copied().map(char::from).collect())
    }

    /// Encode `value` as Latin-1 into a field of `width` bytes.
    ///
    /// Only the string's own bytes are written; the rest of the field is left
    /// untouched. Strings longer than the field are rejected.
    pub fn write_latin_string(
        &mut self,
        offset: usize,
        value: &str,
        width: usize,
    ) -> BufferResult<()> {
        let encoded = value
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| BufferError::NotLatin1(c)))
            .collect::<BufferResult<Vec<u8>>>()?;

        if encoded.len() > width {
            return Err(BufferError::StringTooLong {
                len: encoded.len(),
                width,
            });
        }
        // The whole field must exist even if the string is shorter
        self.checked_range(offset, width)?;
        self.write_bytes(offset, &encoded)
    }

    /// Render `width` bytes as zero-padded upper-case hex (diagnostics only)
    pub fn read_hex(&self, offset: usize, width: usize) -> BufferResult<String> {
        Ok(hex::encode_upper(self.slice(offset, width)?))
    }

    /// Decode a hex string and write the bytes at `offset`
    pub fn write_hex(&mut self, offset: usize, value: &str) -> BufferResult<()> {
        let bytes = hex::decode(value)?;
        self.write_bytes(offset, &bytes)
    }
}

fn check_width(width: usize) -> BufferResult<()> {
    if (1..=MAX_INT_WIDTH).contains(&width) {
        Ok(())
    } else {
        Err(BufferError::InvalidWidth(width))
    }
}

fn width_mask(width: usize) -> u64 {
    u64::MAX >> (64 - 8 * width as u32)
}

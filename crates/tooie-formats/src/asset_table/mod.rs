//! Asset pointer table
//!
//! The ROM carries a table of big-endian 32-bit words, one per asset id, at
//! `table_origin + 4 * id`. Each word encodes a pool offset in its upper 24
//! bits (in 4-byte units); the low byte carries flags that play no part in
//! addressing:
//!
//! ```text
//! address(id) = ((word(id) >> 8) * 4) + pool_base
//! ```
//!
//! An asset's compressed bytes span `address(id)..address(id + 1)`.
//!
//! [`AssetTable`] borrows the image for the duration of each lookup and
//! keeps no state between calls.

mod error;

pub use error::{TableError, TableResult};

use crate::buffer::{ByteBuffer, hex_string};
use crate::layout::TableLayout;
use std::fmt;
use std::ops::Range;

/// Width of one pointer table entry
pub const POINTER_WIDTH: usize = 4;

/// Resolve a pointer word against the pool base; `None` if the address overflows
pub fn resolve_pointer(word: u32, pool_base: usize) -> Option<usize> {
    ((word >> 8) as usize)
        .checked_mul(4)?
        .checked_add(pool_base)
}

/// Artifact name for the asset whose pointer word sits at `pointer_offset`
pub fn asset_name(pointer_offset: usize) -> String {
    hex_string(pointer_offset as u64, 2)
}

/// Byte range of one asset inside the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRange {
    /// Table index
    pub id: usize,
    /// Byte offset of the entry's pointer word
    pub pointer_offset: usize,
    /// First byte of the asset
    pub start: usize,
    /// One past the last byte of the asset
    pub end: usize,
}

impl AssetRange {
    /// Size of the compressed blob
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the entry holds no bytes
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// As a slice range
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Artifact name derived from the pointer offset
    pub fn name(&self) -> String {
        asset_name(self.pointer_offset)
    }
}

impl fmt::Display for AssetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset 0x{:04X} (pointer 0x{:08X}, pool 0x{:08X}..0x{:08X})",
            self.id, self.pointer_offset, self.start, self.end
        )
    }
}

/// Read-only view over the pointer table of a loaded image
#[derive(Debug, Clone, Copy)]
pub struct AssetTable<'a> {
    buffer: &'a ByteBuffer,
    layout: &'a TableLayout,
}

impl<'a> AssetTable<'a> {
    /// Borrow `buffer` using the given table geometry
    pub fn new(buffer: &'a ByteBuffer, layout: &'a TableLayout) -> Self {
        Self { buffer, layout }
    }

    /// Byte offset of the pointer word for `id`
    pub fn pointer_offset(&self, id: usize) -> usize {
        self.layout
            .table_origin
            .saturating_add(id.saturating_mul(POINTER_WIDTH))
    }

    /// Raw pointer word for `id`
    pub fn word(&self, id: usize) -> TableResult<u32> {
        let word = self
            .buffer
            .read_uint(self.pointer_offset(id), POINTER_WIDTH)?;
        Ok(word as u32)
    }

    /// Absolute address encoded by entry `id`
    pub fn compute_address(&self, id: usize) -> TableResult<usize> {
        let word = self.word(id)?;
        match resolve_pointer(word, self.layout.pool_base) {
            Some(address) if address <= self.buffer.len() => Ok(address),
            resolved => Err(TableError::MalformedPointer {
                id,
                pointer_offset: self.pointer_offset(id),
                word,
                address: resolved.unwrap_or(usize::MAX),
                len: self.buffer.len(),
            }),
        }
    }

    /// Byte range of entry `id`, bounded by the next entry's address
    pub fn extract_range(&self, id: usize) -> TableResult<AssetRange> {
        let start = self.compute_address(id)?;
        let end = self.compute_address(id + 1)?;
        if end < start {
            return Err(TableError::InvertedRange { id, start, end });
        }
        Ok(AssetRange {
            id,
            pointer_offset: self.pointer_offset(id),
            start,
            end,
        })
    }

    /// Compressed bytes of entry `id`
    pub fn extract(&self, id: usize) -> TableResult<&'a [u8]> {
        let range = self.extract_range(id)?;
        Ok(self.buffer.slice(range.start, range.len())?)
    }

    /// The id walk declared by the layout
    pub fn entries(&self) -> TableResult<EntryIter> {
        iterate_entries(
            self.layout.id_start,
            self.layout.id_end,
            self.layout.id_interval,
            self.layout.excluded_ids.clone(),
        )
    }
}

/// Ascending walk over `start..end` in steps of `interval`, skipping `exclude`.
///
/// The iterator is lazy and finite; clone it to restart from the same point.
pub fn iterate_entries(
    start: usize,
    end: usize,
    interval: usize,
    exclude: Range<usize>,
) -> TableResult<EntryIter> {
    if interval == 0 {
        return Err(TableError::ZeroInterval);
    }
    Ok(EntryIter {
        next: start,
        end,
        interval,
        exclude,
    })
}

/// Iterator returned by [`iterate_entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryIter {
    next: usize,
    end: usize,
    interval: usize,
    exclude: Range<usize>,
}

impl Iterator for EntryIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.next < self.end {
            let id = self.next;
            self.next = self.next.saturating_add(self.interval);
            if !self.exclude.contains(&id) {
                return Some(id);
            }
        }
        None
    }
}

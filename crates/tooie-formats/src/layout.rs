//! ROM layout configuration
//!
//! Every offset and list the asset pipeline depends on lives in an explicit
//! [`RomLayout`] value that is handed to each component. `Default` yields the
//! layout of the retail Banjo-Tooie image; alternate layouts (and tests) can
//! load a JSON document whose missing fields fall back to those defaults.
//!
//! ```
//! use tooie_formats::layout::RomLayout;
//!
//! let layout = RomLayout::from_json_str(r#"{ "table": { "id_end": 64 } }"#).unwrap();
//! assert_eq!(layout.table.id_end, 64);
//! assert_eq!(layout.table.pool_base, 0x12B24);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tooie_crypto::ChecksumEngine;
use tooie_crypto::checksum::{CIC_6105_SEED, DEFAULT_AUX_BASE, DEFAULT_WINDOW};

/// Largest offset a cartridge image can address
pub const MAX_IMAGE_OFFSET: usize = u32::MAX as usize;

/// Layout loading errors
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Layout file could not be read
    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),

    /// Layout file is not valid JSON for this schema
    #[error("failed to parse layout: {0}")]
    Json(#[from] serde_json::Error),

    /// Layout values are inconsistent
    #[error("invalid layout: {0}")]
    Invalid(String),
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Pointer table and asset pool geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableLayout {
    /// Byte offset of pointer table entry 0
    pub table_origin: usize,
    /// Byte offset the decoded pointer words are relative to
    pub pool_base: usize,
    /// First asset id walked
    pub id_start: usize,
    /// Asset id the walk stops before
    pub id_end: usize,
    /// Step between walked ids
    pub id_interval: usize,
    /// Ids skipped by the walk
    pub excluded_ids: Range<usize>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table_origin: 0x5188,
            pool_base: 0x12B24,
            id_start: 0x000,
            id_end: 0x3666,
            id_interval: 0x4,
            excluded_ids: 0x9F4..0xB34,
        }
    }
}

/// Checksum seed, window and header placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChecksumLayout {
    /// Accumulator seed for the boot chip
    pub cic_seed: u32,
    /// Byte window hashed by the boot code
    pub window: Range<usize>,
    /// Offset of the bookkeeping words mixed into the second checksum
    pub aux_base: usize,
    /// Header offset of `crc1`
    pub crc1_offset: usize,
    /// Header offset of `crc2`
    pub crc2_offset: usize,
}

impl Default for ChecksumLayout {
    fn default() -> Self {
        Self {
            cic_seed: CIC_6105_SEED,
            window: DEFAULT_WINDOW,
            aux_base: DEFAULT_AUX_BASE,
            crc1_offset: 0x10,
            crc2_offset: 0x14,
        }
    }
}

impl ChecksumLayout {
    /// Build the checksum engine for this layout
    pub fn engine(&self) -> ChecksumEngine {
        ChecksumEngine::new(self.cic_seed, self.window.clone(), self.aux_base)
    }
}

/// Complete layout of one ROM image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RomLayout {
    /// Pointer table geometry
    pub table: TableLayout,
    /// Asset names stored uncompressed in the pool
    pub raw_assets: Vec<String>,
    /// Asset ids whose compressed stream is CIC-encrypted
    pub encrypted_ids: BTreeSet<usize>,
    /// Checksum parameters
    pub checksum: ChecksumLayout,
}

impl Default for RomLayout {
    fn default() -> Self {
        Self {
            table: TableLayout::default(),
            raw_assets: vec!["78B4".to_string(), "78B8".to_string()],
            encrypted_ids: BTreeSet::new(),
            checksum: ChecksumLayout::default(),
        }
    }
}

impl RomLayout {
    /// Parse a layout from JSON, filling omitted fields with defaults
    pub fn from_json_str(json: &str) -> LayoutResult<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> LayoutResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the layout for values no walk or checksum could use
    pub fn validate(&self) -> LayoutResult<()> {
        let table = &self.table;
        if table.id_interval == 0 {
            return Err(LayoutError::Invalid("id_interval must be non-zero".into()));
        }
        if table.id_start > table.id_end {
            return Err(LayoutError::Invalid(format!(
                "id_start 0x{:X} is past id_end 0x{:X}",
                table.id_start, table.id_end
            )));
        }

        let offsets = [
            ("table_origin", table.table_origin),
            ("pool_base", table.pool_base),
            ("checksum.window.end", self.checksum.window.end),
            ("checksum.aux_base", self.checksum.aux_base),
            ("checksum.crc1_offset", self.checksum.crc1_offset),
            ("checksum.crc2_offset", self.checksum.crc2_offset),
        ];
        for (field, offset) in offsets {
            if offset > MAX_IMAGE_OFFSET {
                return Err(LayoutError::Invalid(format!(
                    "{field} 0x{offset:X} is outside the 32-bit cartridge address space"
                )));
            }
        }

        let window = &self.checksum.window;
        if window.start >= window.end || window.len() % 4 != 0 {
            return Err(LayoutError::Invalid(format!(
                "checksum window 0x{:X}..0x{:X} is not a whole number of words",
                window.start, window.end
            )));
        }
        Ok(())
    }

    /// Whether the asset with this id is stored encrypted
    pub fn is_encrypted(&self, asset_id: usize) -> bool {
        self.encrypted_ids.contains(&asset_id)
    }
}

//! Asset categories and blob classification

use super::error::{CompressionError, CompressionResult};
use std::fmt;
use std::str::FromStr;

/// Category of a decompressed asset, which fixes its re-compression padding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    /// Models, textures, setups and other data assets
    Asset,
    /// Overlay code
    Assembly,
}

impl AssetCategory {
    /// Byte appended after the compressed stream
    pub const fn padding_byte(self) -> u8 {
        match self {
            Self::Asset => 0xAA,
            Self::Assembly => 0x00,
        }
    }

    /// Total blob length (header included) is padded to a multiple of this
    pub const fn padding_interval(self) -> usize {
        match self {
            Self::Asset => 0x08,
            Self::Assembly => 0x10,
        }
    }

    /// Canonical name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Assembly => "assembly",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = CompressionError;

    fn from_str(s: &str) -> CompressionResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "assembly" => Ok(Self::Assembly),
            _ => Err(CompressionError::UnknownCategory(s.to_string())),
        }
    }
}

/// How an extracted blob must be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Zero-length entry; nothing to inflate
    Empty,
    /// Stored uncompressed; copied verbatim
    Raw,
    /// Framed raw-deflate stream
    Compressed,
}

/// Classify a blob by length and name alone, without touching its contents
pub fn classify(blob: &[u8], name: &str, raw_assets: &[String]) -> AssetKind {
    if blob.is_empty() {
        AssetKind::Empty
    } else if raw_assets.iter().any(|raw| raw == name) {
        AssetKind::Raw
    } else {
        AssetKind::Compressed
    }
}

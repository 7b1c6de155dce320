//! Asset and image formats for Banjo-Tooie ROMs
//!
//! This crate reads, edits and rebuilds the asset pool of a big-endian
//! Banjo-Tooie cartridge image.
//!
//! # Components
//!
//! - **Buffer**: [`ByteBuffer`] with offset-addressed big-endian accessors
//! - **Layout**: [`RomLayout`], every offset and list the pipeline depends on
//! - **Asset table**: pointer table resolution into pool byte ranges
//! - **Compression**: classification, decode and encode of asset blobs
//! - **Header**: the 0x40-byte cartridge header
//! - **Artifacts**: per-asset files on disk
//! - **ROM**: whole-image extraction, insertion and checksum workflows
//!
//! # Example
//!
//! ```no_run
//! use tooie_formats::{ArtifactStore, AssetCodec, FailurePolicy, RomImage, RomLayout};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rom = RomImage::load("Banjo-Tooie.z64", RomLayout::default())?;
//! let store = ArtifactStore::open("extracted_files")?;
//! let report = rom.extract_all(&AssetCodec::native(), &store, FailurePolicy::Abort)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifact;
pub mod asset_table;
pub mod buffer;
pub mod compression;
pub mod header;
pub mod layout;
pub mod rom;

pub use artifact::{ArtifactError, ArtifactKind, ArtifactResult, ArtifactStore};
pub use asset_table::{AssetRange, AssetTable, TableError, TableResult, iterate_entries};
pub use buffer::{BufferError, BufferResult, ByteBuffer, hex_string};
pub use compression::{
    AssetCategory, AssetCodec, AssetKind, CompressionError, CompressionResult,
    GzipProcessEncoder, NativeEncoder, RawDeflateEncoder, classify,
};
pub use header::RomHeader;
pub use layout::{ChecksumLayout, LayoutError, LayoutResult, RomLayout, TableLayout};
pub use rom::{
    AssetFailure, ChecksumStatus, ExtractedAsset, ExtractionReport, FailurePolicy, InsertedAsset,
    RomError, RomImage, RomResult,
};

//! ROM image error types

use crate::artifact::ArtifactError;
use crate::asset_table::TableError;
use crate::buffer::BufferError;
use crate::compression::CompressionError;
use thiserror::Error;
use tooie_crypto::ChecksumError;

/// Errors raised by whole-image operations
#[derive(Debug, Error)]
pub enum RomError {
    /// Byte access failed
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Pointer table resolution failed
    #[error(transparent)]
    Table(#[from] TableError),

    /// Decode or encode failed
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// Checksum computation failed
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// Artifact file access failed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Cartridge header could not be parsed or built
    #[error("header error: {0}")]
    Header(#[from] binrw::Error),

    /// A blob is longer than its table slot
    #[error("asset 0x{id:X} blob of {len} bytes does not fit its {capacity} byte slot")]
    AssetTooLarge {
        /// Table index
        id: usize,
        /// Blob length
        len: usize,
        /// Slot length
        capacity: usize,
    },

    /// A table id too large to select a CIC keystream
    #[error("asset id 0x{0:X} does not fit a 32-bit keystream selector")]
    IdOutOfRange(usize),

    /// A single asset failed; `location` carries its table and pool coordinates
    #[error("asset 0x{id:04X} ({location}): {source}")]
    Asset {
        /// Table index
        id: usize,
        /// Pointer offset and, when resolved, pool range
        location: String,
        /// Underlying failure
        #[source]
        source: Box<RomError>,
    },
}

/// Result type for ROM operations
pub type RomResult<T> = Result<T, RomError>;

//! Whole-image workflows
//!
//! [`RomImage`] ties a loaded image to its [`RomLayout`] and drives the
//! per-asset pipeline: resolve the table entry, store the compressed blob,
//! classify it, then decode (or copy) it into the artifact store. Edited
//! artifacts go back the other way through [`RomImage::insert_from_artifacts`].

mod error;

pub use error::{RomError, RomResult};

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::asset_table::{AssetRange, AssetTable};
use crate::buffer::ByteBuffer;
use crate::compression::{AssetCategory, AssetCodec, AssetKind, RawDeflateEncoder, classify};
use crate::header::{HEADER_LEN, RomHeader};
use crate::layout::RomLayout;
use std::fmt;
use std::path::Path;
use tooie_crypto::RomChecksum;
use tracing::{debug, error, info, warn};

/// Table ids between progress messages during a full extraction
const PROGRESS_INTERVAL: usize = 500;

/// What a full extraction does when one asset fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing asset and return its error
    #[default]
    Abort,
    /// Record the failure and carry on with the next id
    KeepGoing,
}

/// Result of extracting one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedAsset {
    /// Where the asset lives
    pub range: AssetRange,
    /// How it was handled
    pub kind: AssetKind,
    /// Bytes written to the decompressed or raw artifact
    pub output_len: usize,
}

/// One asset that failed during a [`FailurePolicy::KeepGoing`] extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    /// Table index
    pub id: usize,
    /// Rendered error
    pub message: String,
}

/// Summary of a full-table extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Assets inflated
    pub compressed: usize,
    /// Assets copied verbatim
    pub raw: usize,
    /// Zero-length entries
    pub empty: usize,
    /// Assets that failed
    pub failures: Vec<AssetFailure>,
}

impl ExtractionReport {
    fn record(&mut self, kind: AssetKind) {
        match kind {
            AssetKind::Compressed => self.compressed += 1,
            AssetKind::Raw => self.raw += 1,
            AssetKind::Empty => self.empty += 1,
        }
    }

    /// Assets visited, failed ones included
    pub fn total(&self) -> usize {
        self.compressed + self.raw + self.empty + self.failures.len()
    }

    /// Whether every visited asset succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ExtractionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} assets: {} decompressed, {} raw, {} empty, {} failed",
            self.total(),
            self.compressed,
            self.raw,
            self.empty,
            self.failures.len()
        )
    }
}

/// Result of writing one asset back into the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedAsset {
    /// Slot the blob was written into
    pub range: AssetRange,
    /// How the blob was produced
    pub kind: AssetKind,
    /// Blob length before slack filling
    pub blob_len: usize,
}

/// Computed and stored checksums side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumStatus {
    /// Checksum of the image as it is now
    pub computed: RomChecksum,
    /// Checksum recorded in the header
    pub stored: RomChecksum,
}

impl ChecksumStatus {
    /// Whether the header is up to date
    pub fn matches(&self) -> bool {
        self.computed == self.stored
    }
}

/// A loaded ROM image and the layout describing it
#[derive(Debug, Clone)]
pub struct RomImage {
    buffer: ByteBuffer,
    layout: RomLayout,
}

impl RomImage {
    /// Wrap an in-memory image
    pub fn new(buffer: ByteBuffer, layout: RomLayout) -> Self {
        Self { buffer, layout }
    }

    /// Load an image from disk
    pub fn load(path: impl AsRef<Path>, layout: RomLayout) -> RomResult<Self> {
        let path = path.as_ref();
        let buffer = ByteBuffer::load(path)?;
        info!("loaded {} ({} bytes)", path.display(), buffer.len());

        let image = Self::new(buffer, layout);
        match image.header() {
            Ok(header) if !header.is_big_endian() => warn!(
                "first word 0x{:08X} is not a big-endian image; offsets will not line up",
                header.pi_config
            ),
            Ok(header) => debug!("image title {:?}, code {}", header.title(), header.game_code()),
            Err(e) => warn!("no readable header: {e}"),
        }
        Ok(image)
    }

    /// Write the image to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> RomResult<()> {
        let path = path.as_ref();
        self.buffer.save(path)?;
        info!("saved {} bytes to {}", self.buffer.len(), path.display());
        Ok(())
    }

    /// Image bytes
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Layout in use
    pub fn layout(&self) -> &RomLayout {
        &self.layout
    }

    /// Give up the image bytes
    pub fn into_buffer(self) -> ByteBuffer {
        self.buffer
    }

    /// Pointer table view
    pub fn table(&self) -> AssetTable<'_> {
        AssetTable::new(&self.buffer, &self.layout.table)
    }

    /// Parse the cartridge header
    pub fn header(&self) -> RomResult<RomHeader> {
        Ok(RomHeader::parse(self.buffer.slice(0, HEADER_LEN)?)?)
    }

    /// Extract one asset into `store`.
    ///
    /// The compressed blob is always written. Compressed assets are then
    /// inflated (after CIC decryption when `decrypt` is set) into the
    /// decompressed artifact, raw assets are copied to the raw artifact and
    /// empty entries produce an empty decompressed artifact.
    pub fn extract_asset<E: RawDeflateEncoder>(
        &self,
        id: usize,
        codec: &AssetCodec<E>,
        store: &ArtifactStore,
        decrypt: bool,
    ) -> RomResult<ExtractedAsset> {
        let range = self
            .table()
            .extract_range(id)
            .map_err(|e| self.asset_error(id, None, e.into()))?;

        self.extract_range(&range, codec, store, decrypt)
            .map_err(|e| self.asset_error(id, Some(&range), e))
    }

    fn extract_range<E: RawDeflateEncoder>(
        &self,
        range: &AssetRange,
        codec: &AssetCodec<E>,
        store: &ArtifactStore,
        decrypt: bool,
    ) -> RomResult<ExtractedAsset> {
        let blob = self.buffer.slice(range.start, range.len())?;
        let name = range.name();
        store.write(&name, ArtifactKind::Compressed, blob)?;

        let kind = classify(blob, &name, &self.layout.raw_assets);
        let output_len = match kind {
            AssetKind::Empty => {
                store.write(&name, ArtifactKind::Decompressed, &[])?;
                0
            }
            AssetKind::Raw => {
                store.write(&name, ArtifactKind::Raw, blob)?;
                blob.len()
            }
            AssetKind::Compressed => {
                let decrypt_for = decrypt.then(|| cic_key(range.id)).transpose()?;
                let payload = codec.decode(blob, decrypt_for)?;
                store.write(&name, ArtifactKind::Decompressed, &payload)?;
                payload.len()
            }
        };

        Ok(ExtractedAsset {
            range: *range,
            kind,
            output_len,
        })
    }

    /// Walk the whole table and extract every asset.
    ///
    /// Ids listed in the layout's `encrypted_ids` are decrypted.
    pub fn extract_all<E: RawDeflateEncoder>(
        &self,
        codec: &AssetCodec<E>,
        store: &ArtifactStore,
        policy: FailurePolicy,
    ) -> RomResult<ExtractionReport> {
        let table = self.table();
        let mut report = ExtractionReport::default();

        info!("extracting assets into {}", store.dir().display());
        for id in table.entries()? {
            if id % PROGRESS_INTERVAL == 0 {
                debug!(
                    "asset id 0x{id:04X} -> pointer 0x{:08X}",
                    table.pointer_offset(id)
                );
            }

            match self.extract_asset(id, codec, store, self.layout.is_encrypted(id)) {
                Ok(asset) => report.record(asset.kind),
                Err(e) if policy == FailurePolicy::KeepGoing => {
                    warn!("continuing past failed asset 0x{id:04X}");
                    report.failures.push(AssetFailure {
                        id,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!("extraction complete: {report}");
        Ok(report)
    }

    /// Write `blob` into the slot of asset `id`.
    ///
    /// The pointer table is left untouched, so the blob must fit the slot.
    /// Unused slot bytes are filled with the category's padding byte.
    pub fn insert_asset(
        &mut self,
        id: usize,
        blob: &[u8],
        category: AssetCategory,
    ) -> RomResult<AssetRange> {
        let range = self
            .table()
            .extract_range(id)
            .map_err(|e| self.asset_error(id, None, e.into()))?;

        self.write_slot(&range, blob, category)
            .map_err(|e| self.asset_error(id, Some(&range), e))?;
        Ok(range)
    }

    fn write_slot(
        &mut self,
        range: &AssetRange,
        blob: &[u8],
        category: AssetCategory,
    ) -> RomResult<()> {
        if blob.len() > range.len() {
            return Err(RomError::AssetTooLarge {
                id: range.id,
                len: blob.len(),
                capacity: range.len(),
            });
        }

        self.buffer.write_bytes(range.start, blob)?;
        self.buffer.fill(
            range.start + blob.len(),
            range.len() - blob.len(),
            category.padding_byte(),
        )?;

        info!(
            "inserted {} byte blob into {range} ({} bytes slack)",
            blob.len(),
            range.len() - blob.len()
        );
        Ok(())
    }

    /// Rebuild asset `id` from its artifacts and insert it.
    ///
    /// Raw assets are inserted from their raw artifact as-is. Everything
    /// else is re-encoded from the decompressed artifact (encrypting for
    /// `id` when `encrypt` is set); once the blob is in the image it also
    /// replaces the compressed artifact.
    pub fn insert_from_artifacts<E: RawDeflateEncoder>(
        &mut self,
        id: usize,
        codec: &AssetCodec<E>,
        store: &ArtifactStore,
        category: AssetCategory,
        encrypt: bool,
    ) -> RomResult<InsertedAsset> {
        let range = self
            .table()
            .extract_range(id)
            .map_err(|e| self.asset_error(id, None, e.into()))?;

        self.insert_range_from_artifacts(&range, codec, store, category, encrypt)
            .map_err(|e| self.asset_error(id, Some(&range), e))
    }

    fn insert_range_from_artifacts<E: RawDeflateEncoder>(
        &mut self,
        range: &AssetRange,
        codec: &AssetCodec<E>,
        store: &ArtifactStore,
        category: AssetCategory,
        encrypt: bool,
    ) -> RomResult<InsertedAsset> {
        let name = range.name();

        let (kind, blob) = if self.layout.raw_assets.contains(&name) {
            (AssetKind::Raw, store.read(&name, ArtifactKind::Raw)?)
        } else {
            let payload = store.read(&name, ArtifactKind::Decompressed)?;
            let encrypt_for = encrypt.then(|| cic_key(range.id)).transpose()?;
            let blob = codec.encode(&payload, category, encrypt_for)?;
            let kind = if blob.is_empty() {
                AssetKind::Empty
            } else {
                AssetKind::Compressed
            };
            (kind, blob)
        };

        self.write_slot(range, &blob, category)?;
        if kind != AssetKind::Raw {
            store.write(&name, ArtifactKind::Compressed, &blob)?;
        }

        Ok(InsertedAsset {
            range: *range,
            kind,
            blob_len: blob.len(),
        })
    }

    /// Compute the boot checksum of the image
    pub fn checksum(&self) -> RomResult<RomChecksum> {
        Ok(self
            .layout
            .checksum
            .engine()
            .compute(self.buffer.as_bytes())?)
    }

    /// Checksum words currently stored in the header
    pub fn stored_checksum(&self) -> RomResult<RomChecksum> {
        let layout = &self.layout.checksum;
        Ok(RomChecksum {
            crc1: self.buffer.read_uint(layout.crc1_offset, 4)? as u32,
            crc2: self.buffer.read_uint(layout.crc2_offset, 4)? as u32,
        })
    }

    /// Compare computed and stored checksums
    pub fn verify_checksum(&self) -> RomResult<ChecksumStatus> {
        let status = ChecksumStatus {
            computed: self.checksum()?,
            stored: self.stored_checksum()?,
        };
        if !status.matches() {
            warn!(
                "stored checksum {} differs from computed {}",
                status.stored, status.computed
            );
        }
        Ok(status)
    }

    /// Recompute the checksum and store it in the header
    pub fn write_checksum(&mut self) -> RomResult<RomChecksum> {
        let checksum = self.checksum()?;
        let layout = &self.layout.checksum;
        self.buffer
            .write_uint(layout.crc1_offset, u64::from(checksum.crc1), 4)?;
        self.buffer
            .write_uint(layout.crc2_offset, u64::from(checksum.crc2), 4)?;
        info!("wrote checksum {checksum}");
        Ok(checksum)
    }

    fn asset_error(&self, id: usize, range: Option<&AssetRange>, source: RomError) -> RomError {
        let location = match range {
            Some(range) => format!(
                "pointer 0x{:08X}, pool 0x{:08X}..0x{:08X}",
                range.pointer_offset, range.start, range.end
            ),
            None => format!("pointer 0x{:08X}", self.table().pointer_offset(id)),
        };
        error!("asset 0x{id:04X} ({location}) failed: {source}");
        RomError::Asset {
            id,
            location,
            source: Box::new(source),
        }
    }
}

/// Keystream selector for a table id
fn cic_key(id: usize) -> RomResult<u32> {
    u32::try_from(id).map_err(|_| RomError::IdOutOfRange(id))
}

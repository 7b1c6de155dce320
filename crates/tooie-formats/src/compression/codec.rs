//! Asset blob codec

use super::category::AssetCategory;
use super::encoder::{NativeEncoder, RawDeflateEncoder};
use super::error::{CompressionError, CompressionResult};
use super::framing::{frame, size_header, unframe};
use flate2::{Decompress, FlushDecompress, Status};
use std::borrow::Cow;
use tooie_crypto::CicKeystream;
use tracing::{debug, warn};

/// Maximum allowed decompression size (64 MB)
///
/// Retail images are 32 MB, so no single asset can legitimately inflate
/// past this.
pub const MAX_DECOMPRESSION_SIZE: usize = 64 * 1024 * 1024;

/// Bidirectional transform between decompressed payloads and ROM blobs
#[derive(Debug, Clone, Default)]
pub struct AssetCodec<E = NativeEncoder> {
    encoder: E,
}

impl AssetCodec<NativeEncoder> {
    /// Codec using the in-process deflate encoder
    pub fn native() -> Self {
        Self::with_encoder(NativeEncoder)
    }
}

impl<E: RawDeflateEncoder> AssetCodec<E> {
    /// Codec using a specific raw deflate encoder
    pub fn with_encoder(encoder: E) -> Self {
        Self { encoder }
    }

    /// Encoder used by [`encode`](Self::encode)
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Decode a compressed blob.
    ///
    /// An empty blob decodes to an empty payload without touching the
    /// inflater. When `decrypt_for` names an asset id the body is run through
    /// that asset's CIC keystream before inflating.
    ///
    /// The inflater is handed the whole body rather than the body with its
    /// trailing `0xAA` run removed: a raw deflate stream marks its own end,
    /// so trailing padding is ignored, and a stream that happens to end in
    /// `0xAA` is not truncated.
    pub fn decode(&self, blob: &[u8], decrypt_for: Option<u32>) -> CompressionResult<Vec<u8>> {
        if blob.is_empty() {
            return Ok(Vec::new());
        }

        let framed = unframe(blob)?;
        let stream: Cow<'_, [u8]> = match decrypt_for {
            Some(asset_id) => Cow::Owned(CicKeystream::for_asset(asset_id).transform(framed.body)),
            None => Cow::Borrowed(framed.body),
        };

        let payload = inflate_raw(&stream)?;

        if size_header(payload.len()).ok() != Some(framed.size_header) {
            warn!(
                "size header 0x{:04X} does not match {} decompressed bytes",
                framed.size_header,
                payload.len()
            );
        }
        debug!(
            "decoded {} byte blob ({} padding) into {} bytes",
            blob.len(),
            framed.padding_len,
            payload.len()
        );
        Ok(payload)
    }

    /// Encode a payload into a padded ROM blob.
    ///
    /// When `encrypt_for` names an asset id the deflate stream is run through
    /// that asset's keystream before framing. An empty payload encodes to an
    /// empty blob.
    pub fn encode(
        &self,
        payload: &[u8],
        category: AssetCategory,
        encrypt_for: Option<u32>,
    ) -> CompressionResult<Vec<u8>> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let mut stream = self.encoder.encode(payload)?;
        if let Some(asset_id) = encrypt_for {
            CicKeystream::for_asset(asset_id).apply(&mut stream);
        }

        let blob = frame(&stream, payload.len(), category)?;
        debug!(
            "encoded {} bytes into {} byte {} blob",
            payload.len(),
            blob.len(),
            category
        );
        Ok(blob)
    }
}

/// Inflate a raw deflate stream (no zlib/gzip wrapper, 32 KiB window).
///
/// Bytes after the stream's final block are ignored. A stream that runs out
/// of input before its final block is an error.
pub fn inflate_raw(stream: &[u8]) -> CompressionResult<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(stream.len().saturating_mul(4).max(256));

    loop {
        if out.len() == out.capacity() {
            if out.len() >= MAX_DECOMPRESSION_SIZE {
                return Err(CompressionError::DecompressedTooLarge(
                    MAX_DECOMPRESSION_SIZE,
                ));
            }
            out.reserve(out.len());
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&stream[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CompressionError::Inflate(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let stalled =
                    inflater.total_in() as usize == consumed && inflater.total_out() == produced;
                if stalled {
                    return Err(CompressionError::Inflate(format!(
                        "stream ended after {} bytes without a final block",
                        stream.len()
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::framing::PADDING_SENTINEL;
    use proptest::prelude::*;

    fn sample_payload() -> Vec<u8> {
        (0..600u32).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_empty_blob_short_circuits() {
        let codec = AssetCodec::native();
        assert!(codec.decode(&[], None).unwrap().is_empty());
        assert!(codec.decode(&[], Some(0x9F6)).unwrap().is_empty());
        assert!(codec.encode(&[], AssetCategory::Asset, None).unwrap().is_empty());
    }

    #[test]
    fn test_encode_layout() {
        let codec = AssetCodec::native();
        let payload = sample_payload();
        let blob = codec.encode(&payload, AssetCategory::Asset, None).unwrap();

        assert_eq!(u16::from_be_bytes([blob[0], blob[1]]), 38); // ceil(600 / 16)
        assert_eq!(blob.len() % 8, 0);

        let stream = NativeEncoder.encode(&payload).unwrap();
        assert_eq!(&blob[2..2 + stream.len()], &stream[..]);
        assert!(blob[2 + stream.len()..].iter().all(|&b| b == PADDING_SENTINEL));
    }

    #[test]
    fn test_assembly_round_trip() {
        let codec = AssetCodec::native();
        let payload = sample_payload();
        let blob = codec.encode(&payload, AssetCategory::Assembly, None).unwrap();
        assert_eq!(blob.len() % 16, 0);
        assert_eq!(codec.decode(&blob, None).unwrap(), payload);
    }

    #[test]
    fn test_encrypted_round_trip() {
        let codec = AssetCodec::native();
        let payload = sample_payload();
        let blob = codec
            .encode(&payload, AssetCategory::Asset, Some(0x9F6))
            .unwrap();

        assert_eq!(codec.decode(&blob, Some(0x9F6)).unwrap(), payload);
        // Wrong key: the stream is garbage, or at best decodes to something else
        match codec.decode(&blob, Some(0x9F7)) {
            Ok(other) => assert_ne!(other, payload),
            Err(err) => assert!(matches!(err, CompressionError::Inflate(_))),
        }
    }

    #[test]
    fn test_stream_ending_in_sentinel_survives() {
        // Forge a blob whose deflate stream ends in 0xAA: a stored block
        // (BFINAL=1, BTYPE=00) holding a payload that ends in 0xAA.
        let payload = [0x01, 0xAA, 0xAA];
        let mut blob = vec![0x00, 0x01, 0x01, 0x03, 0x00, 0xFC, 0xFF];
        blob.extend_from_slice(&payload);
        blob.extend_from_slice(&[0xAA; 6]);

        let codec = AssetCodec::native();
        assert_eq!(codec.decode(&blob, None).unwrap(), payload);
    }

    #[test]
    fn test_malformed_stream_is_inflate_error() {
        let codec = AssetCodec::native();
        // BTYPE=11 is reserved
        let blob = [0x00, 0x01, 0x07, 0x00, 0x00, 0x00, 0xAA, 0xAA];
        assert!(matches!(
            codec.decode(&blob, None),
            Err(CompressionError::Inflate(_))
        ));
    }

    #[test]
    fn test_truncated_stream_is_inflate_error() {
        let payload = sample_payload();
        let stream = NativeEncoder.encode(&payload).unwrap();
        let truncated = &stream[..stream.len() / 2];
        assert!(matches!(
            inflate_raw(truncated),
            Err(CompressionError::Inflate(_))
        ));
    }

    #[test]
    fn test_one_byte_blob() {
        let codec = AssetCodec::native();
        assert!(matches!(
            codec.decode(&[0x00], None),
            Err(CompressionError::FramingTooShort(1))
        ));
    }

    #[test]
    fn test_highly_compressible_payload_grows_buffer() {
        let payload = vec![0u8; 256 * 1024];
        let codec = AssetCodec::native();
        let blob = codec.encode(&payload, AssetCategory::Asset, None).unwrap();
        assert!(blob.len() < 2048);
        assert_eq!(codec.decode(&blob, None).unwrap(), payload);
    }

    fn category() -> impl Strategy<Value = AssetCategory> {
        prop_oneof![Just(AssetCategory::Asset), Just(AssetCategory::Assembly)]
    }

    proptest! {
        #[test]
        fn codec_round_trip(
            payload in prop::collection::vec(any::<u8>(), 1..4096),
            category in category(),
            encrypt in prop::option::of(0u32..0x4000)
        ) {
            let codec = AssetCodec::native();
            let blob = codec.encode(&payload, category, encrypt).unwrap();
            prop_assert_eq!(blob.len() % category.padding_interval(), 0);
            prop_assert_eq!(codec.decode(&blob, encrypt).unwrap(), payload);
        }
    }
}

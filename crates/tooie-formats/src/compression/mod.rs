//! Compressed asset container
//!
//! Assets in the pool are raw deflate streams behind a 2-byte size header
//! and padded out to a category-specific alignment. A few are additionally
//! XORed with a CIC keystream. This module classifies extracted blobs,
//! decodes them to their payload, and re-encodes edited payloads into the
//! same framing.
//!
//! # Features
//!
//! - Classification of blobs into empty, raw and compressed
//! - Raw deflate decode with optional CIC decryption
//! - Encode with category padding and optional encryption
//! - Pluggable raw deflate encoder (native `flate2` or an external gzip)
//!
//! ```
//! use tooie_formats::compression::{AssetCategory, AssetCodec};
//!
//! let codec = AssetCodec::native();
//! let blob = codec.encode(b"level setup", AssetCategory::Asset, None).unwrap();
//! assert_eq!(blob.len() % 8, 0);
//! assert_eq!(codec.decode(&blob, None).unwrap(), b"level setup");
//! ```

mod category;
mod codec;
mod encoder;
mod error;
mod framing;

pub use category::{AssetCategory, AssetKind, classify};
pub use codec::{AssetCodec, MAX_DECOMPRESSION_SIZE, inflate_raw};
pub use encoder::{
    GZIP_FOOTER_LEN, GZIP_NAME_MARKER, GzipProcessEncoder, NativeEncoder, RawDeflateEncoder,
    strip_gzip_framing,
};
pub use error::{CompressionError, CompressionResult};
pub use framing::{
    FramedAsset, PADDING_SENTINEL, SIZE_HEADER_LEN, frame, size_header, trailing_padding, unframe,
};

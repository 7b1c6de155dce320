//! CIC-derived routines for Banjo-Tooie cartridge images
//!
//! The console's boot chip (the CIC) authenticates a cartridge by hashing a
//! fixed window of the image and comparing the result against two words
//! stored in the ROM header. Banjo-Tooie additionally reuses the chip's
//! nibble-stream challenge/response algorithm as a keystream for a handful
//! of its compressed assets.
//!
//! # Components
//!
//! - **Checksum**: [`ChecksumEngine`] recomputes `(crc1, crc2)` over the
//!   boot-verified window using the CIC-6105 rules
//! - **Keystream**: [`CicKeystream`] derives the per-asset XOR stream used to
//!   encrypt and decrypt protected assets
//!
//! # Examples
//!
//! ```
//! use tooie_crypto::CicKeystream;
//!
//! let original = vec![0u8; 14];
//! let scrambled = CicKeystream::for_asset(0x9F6).transform(&original);
//! let restored = CicKeystream::for_asset(0x9F6).transform(&scrambled);
//! assert_eq!(original, restored);
//! ```

#![warn(missing_docs)]

pub mod checksum;
pub mod cic;
pub mod error;

pub use checksum::{ChecksumEngine, RomChecksum, rotate_left32};
pub use cic::{CicKeystream, decrypt_asset};
pub use error::{ChecksumError, ChecksumResult};

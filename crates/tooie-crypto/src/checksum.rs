//! Cartridge checksum (CIC-6105 variant)
//!
//! The boot code hashes the first megabyte of game code that follows the
//! 0x1000-byte boot segment and compares the two resulting words against
//! the header. The 6105 chip mixes in a word read from its own boot code on
//! every step, which makes the image itself part of the key.

use crate::error::{ChecksumError, ChecksumResult};
use std::fmt;
use std::ops::Range;

/// Seed loaded into every accumulator for the CIC-6105
pub const CIC_6105_SEED: u32 = 0xDF26_F436;

/// Bytes hashed by the boot code
pub const DEFAULT_WINDOW: Range<usize> = 0x1000..0x10_1000;

/// Start of the bookkeeping words mixed into `t1` (`0x0040 + 0x0710`)
pub const DEFAULT_AUX_BASE: usize = 0x0040 + 0x0710;

/// The two integrity words stored at header offsets 0x10 and 0x14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RomChecksum {
    /// First checksum word
    pub crc1: u32,
    /// Second checksum word
    pub crc2: u32,
}

impl fmt::Display for RomChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} {:08X}", self.crc1, self.crc2)
    }
}

/// 32-bit circular left rotation
pub fn rotate_left32(value: u32, bits: u32) -> u32 {
    (value << (bits & 0x1F)) | (value >> (bits.wrapping_neg() & 0x1F))
}

/// Recomputes the header checksum words from an image snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEngine {
    seed: u32,
    window: Range<usize>,
    aux_base: usize,
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self::new(CIC_6105_SEED, DEFAULT_WINDOW, DEFAULT_AUX_BASE)
    }
}

impl ChecksumEngine {
    /// Create an engine with an explicit seed, window and bookkeeping offset
    pub fn new(seed: u32, window: Range<usize>, aux_base: usize) -> Self {
        Self {
            seed,
            window,
            aux_base,
        }
    }

    /// Accumulator seed
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Byte window hashed by [`compute`](Self::compute)
    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    /// Compute `(crc1, crc2)` over `rom`.
    ///
    /// The image is only read; callers run this after every asset write has
    /// been applied.
    pub fn compute(&self, rom: &[u8]) -> ChecksumResult<RomChecksum> {
        let Range { start, end } = self.window;
        if start >= end || (end - start) % 4 != 0 {
            return Err(ChecksumError::InvalidWindow { start, end });
        }

        let words = (end - start) / 4;
        // The bookkeeping read wraps every 256 steps and is a full word wide
        let aux_end = self
            .aux_base
            .checked_add(words.min(0x100) - 1 + 4)
            .unwrap_or(usize::MAX);
        let required = end.max(aux_end);
        if required > rom.len() {
            return Err(ChecksumError::WindowOutOfBounds {
                required,
                len: rom.len(),
            });
        }

        let mut acc = Accumulators::new(self.seed);
        for (step, chunk) in rom[start..end].chunks_exact(4).enumerate() {
            let aux_offset = self.aux_base + (step & 0xFF);
            let aux = be_word(&rom[aux_offset..aux_offset + 4]);
            acc.step(be_word(chunk), aux);
        }

        Ok(acc.finish())
    }
}

/// Running state `t1..t6`, all arithmetic modulo 2^32
struct Accumulators {
    t1: u32,
    t2: u32,
    t3: u32,
    t4: u32,
    t5: u32,
    t6: u32,
}

impl Accumulators {
    fn new(seed: u32) -> Self {
        Self {
            t1: seed,
            t2: seed,
            t3: seed,
            t4: seed,
            t5: seed,
            t6: seed,
        }
    }

    fn step(&mut self, d: u32, aux: u32) {
        let sum = self.t6.wrapping_add(d);
        if sum < self.t6 {
            self.t4 = self.t4.wrapping_add(1);
        }
        self.t6 = sum;
        self.t3 ^= d;

        let r = rotate_left32(d, d & 0x1F);
        self.t5 = self.t5.wrapping_add(r);

        if self.t2 > d {
            self.t2 ^= r;
        } else {
            self.t2 ^= self.t6 ^ d;
        }

        // Only the low 32 bits of t1 reach the final XOR, so wrapping here
        // is equivalent to masking once at the end.
        self.t1 = self.t1.wrapping_add(aux ^ d);
    }

    fn finish(&self) -> RomChecksum {
        RomChecksum {
            crc1: self.t6 ^ self.t4 ^ self.t3,
            crc2: self.t5 ^ self.t2 ^ self.t1,
        }
    }
}

fn be_word(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

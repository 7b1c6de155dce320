//! Cartridge header (first 0x40 bytes of a big-endian `.z64` image)

use binrw::io::Cursor;
use binrw::{BinRead, BinResult, BinWrite};
use tooie_crypto::RomChecksum;

/// Header size in bytes
pub const HEADER_LEN: usize = 0x40;

/// First word of a big-endian image
pub const Z64_PI_CONFIG: u32 = 0x8037_1240;

/// Cartridge header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct RomHeader {
    /// PI bus domain 1 configuration (`0x80371240` for `.z64`)
    pub pi_config: u32,
    /// Clock rate override
    pub clock_rate: u32,
    /// Entry point of the game code
    pub boot_address: u32,
    /// libultra release
    pub release: u32,
    /// First checksum word
    pub crc1: u32,
    /// Second checksum word
    pub crc2: u32,
    /// Unused
    pub reserved: [u8; 8],
    /// Image name, space padded
    pub title: [u8; 20],
    /// Unused
    pub reserved2: [u8; 7],
    /// Media format ('N' for cartridge)
    pub media_format: u8,
    /// Two-character cartridge id
    pub cartridge_id: [u8; 2],
    /// Region code
    pub country_code: u8,
    /// Revision
    pub version: u8,
}

impl RomHeader {
    /// Parse a header from the start of `data`
    pub fn parse(data: &[u8]) -> BinResult<Self> {
        Self::read(&mut Cursor::new(data))
    }

    /// Serialize back to 0x40 bytes
    pub fn build(&self) -> BinResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Whether the image is in native (big-endian) byte order
    pub fn is_big_endian(&self) -> bool {
        self.pi_config == Z64_PI_CONFIG
    }

    /// Image name with trailing padding removed
    pub fn title(&self) -> String {
        self.title
            .iter()
            .copied()
            .map(char::from)
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    /// Four-character game code (media, cartridge id, region)
    pub fn game_code(&self) -> String {
        [
            self.media_format,
            self.cartridge_id[0],
            self.cartridge_id[1],
            self.country_code,
        ]
        .iter()
        .copied()
        .map(char::from)
        .collect()
    }

    /// Stored checksum words
    pub fn checksum(&self) -> RomChecksum {
        RomChecksum {
            crc1: self.crc1,
            crc2: self.crc2,
        }
    }
}

//! CIC nibble-stream keystream for encrypted Banjo-Tooie assets
//!
//! A small number of assets are XORed with a 14-byte keystream before they
//! are deflated into the ROM. The keystream is the boot chip's
//! challenge/response transducer run over a challenge derived from the
//! asset id. Applying the keystream twice restores the input, so the same
//! transform serves for both directions.

/// Offset subtracted from an asset id before it is spread into the challenge
const ASSET_ID_BIAS: i64 = 0x995;

/// Number of keystream bytes cycled over the payload
pub const KEYSTREAM_PERIOD: usize = 14;

/// Initial transducer state
const INITIAL_KEY: u8 = 0xB;

/// Nibbles fed through the transducer; the final two are forced to zero
const TRANSDUCED_NIBBLES: usize = 30;

/// Transition table used while the transducer is in its first mode
const LUT_A: [u8; 16] = [
    0x4, 0x7, 0xA, 0x7, 0xE, 0x5, 0xE, 0x1, 0xC, 0xF, 0x8, 0xF, 0x6, 0x3, 0x6, 0x9,
];

/// Transition table used while the transducer is in its second mode
const LUT_B: [u8; 16] = [
    0x4, 0x1, 0xA, 0x7, 0xE, 0x5, 0xE, 0x1, 0xC, 0x9, 0x8, 0x5, 0x6, 0x3, 0xC, 0x9,
];

/// Per-asset XOR keystream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CicKeystream {
    bytes: [u8; 16],
}

impl CicKeystream {
    /// Derive the keystream for an asset id
    pub fn for_asset(asset_id: u32) -> Self {
        let challenge = expand_nibbles(&challenge_key(asset_id));
        let response = transduce(&challenge);

        let mut bytes = [0u8; 16];
        for (byte, pair) in bytes.iter_mut().zip(response.chunks_exact(2)) {
            *byte = (pair[0] << 4) | pair[1];
        }

        Self { bytes }
    }

    /// Full 16-byte response; only the first [`KEYSTREAM_PERIOD`] bytes are applied
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// XOR the keystream over `data` in place
    pub fn apply(&self, data: &mut [u8]) {
        for (index, byte) in data.iter_mut().enumerate() {
            *byte ^= self.bytes[index % KEYSTREAM_PERIOD];
        }
    }

    /// XOR the keystream over a copy of `data`
    pub fn transform(&self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply(&mut out);
        out
    }
}

/// Decrypt (or encrypt) an asset payload for the given asset id
pub fn decrypt_asset(asset_id: u32, data: &[u8]) -> Vec<u8> {
    CicKeystream::for_asset(asset_id).transform(data)
}

/// Build the 16-byte challenge from the biased asset id.
///
/// Each even slot takes the low byte of a 16-bit rotation window of the id.
/// The window's high byte is masked away before it is stored, which leaves
/// every odd slot zero.
fn challenge_key(asset_id: u32) -> [u8; 16] {
    let key = i64::from(asset_id) - ASSET_ID_BIAS;
    let mut input = [0u8; 16];

    for shift in (0..KEYSTREAM_PERIOD).step_by(2) {
        let window = (key >> shift) | key.wrapping_shl(16 - shift as u32);
        input[shift] = (window & 0xFF) as u8;
        input[shift + 1] = 0;
    }

    input[14] = 0x00;
    input[15] = 0x02;
    input
}

/// Split bytes into nibbles, high nibble first
fn expand_nibbles(key: &[u8; 16]) -> [u8; 32] {
    let mut nibbles = [0u8; 32];
    for (pair, byte) in nibbles.chunks_exact_mut(2).zip(key) {
        pair[0] = byte >> 4;
        pair[1] = byte & 0xF;
    }
    nibbles
}

fn transduce(challenge: &[u8; 32]) -> [u8; 32] {
    let mut response = [0u8; 32];
    let mut key = INITIAL_KEY;
    let mut on_b = false;

    for (out, &nibble) in response
        .iter_mut()
        .zip(challenge)
        .take(TRANSDUCED_NIBBLES)
    {
        let value = (key + 5 * nibble) & 0xF;
        *out = value;

        key = if on_b {
            LUT_B[usize::from(value)]
        } else {
            LUT_A[usize::from(value)]
        };

        let sign = (value >> 3) & 0x1;
        let magnitude = if sign == 1 { value } else { value & 0x7 };
        let mut switch = if magnitude % 3 == 1 { sign } else { 1 - sign };

        if on_b && matches!(value, 0x1 | 0x9) {
            switch = 1;
        }
        if on_b && matches!(value, 0xB | 0xE) {
            switch = 0;
        }

        on_b = switch == 1;
    }

    response
}

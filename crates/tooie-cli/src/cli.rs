//! Command-line arguments
//!
//! Every option can also be set through a `TOOIE_*` environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tooie_formats::AssetCategory;

/// Extract, edit and re-insert Banjo-Tooie ROM assets
#[derive(Debug, Parser)]
#[command(
    name = "tooie",
    about = "Extract and re-insert Banjo-Tooie ROM assets",
    version
)]
pub struct Cli {
    /// JSON layout file overriding the retail table and checksum offsets
    #[arg(long, global = true, env = "TOOIE_LAYOUT")]
    pub layout: Option<PathBuf>,

    /// Directory holding extracted artifacts
    #[arg(
        long,
        global = true,
        env = "TOOIE_ARTIFACTS",
        default_value = "extracted_files"
    )]
    pub artifacts: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract and decompress every asset in the pointer table
    Extract {
        /// ROM image (big-endian .z64)
        #[arg(env = "TOOIE_ROM")]
        rom: PathBuf,

        /// Record failing assets and continue instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Extract a single asset
    ExtractOne {
        /// ROM image (big-endian .z64)
        #[arg(env = "TOOIE_ROM")]
        rom: PathBuf,

        /// Table id in hex (e.g. 9F6)
        #[arg(long, value_parser = parse_hex_id)]
        id: usize,

        /// Run the CIC keystream over the blob before inflating
        #[arg(long)]
        decrypt: bool,
    },

    /// Re-encode an asset from its artifacts and write it into a copy of the image
    Insert {
        /// ROM image (big-endian .z64)
        #[arg(env = "TOOIE_ROM")]
        rom: PathBuf,

        /// Table id in hex (e.g. 9F6)
        #[arg(long, value_parser = parse_hex_id)]
        id: usize,

        /// Padding rules to compress with (asset or assembly)
        #[arg(long)]
        category: AssetCategory,

        /// Where to write the patched image
        #[arg(long)]
        output: PathBuf,

        /// gzip-compatible program to compress with instead of the built-in encoder
        #[arg(long, env = "TOOIE_ENCODER")]
        encoder: Option<PathBuf>,

        /// Seconds to wait for the external encoder
        #[arg(long, env = "TOOIE_ENCODER_TIMEOUT", default_value_t = 60)]
        encoder_timeout: u64,

        /// Encrypt the compressed stream with the asset's CIC keystream
        #[arg(long)]
        encrypt: bool,

        /// Recompute and store the header checksum before saving
        #[arg(long)]
        write_checksum: bool,
    },

    /// Print the computed and stored header checksums
    Checksum {
        /// ROM image (big-endian .z64)
        #[arg(env = "TOOIE_ROM")]
        rom: PathBuf,

        /// Store the computed checksum in the header
        #[arg(long, requires = "output")]
        write: bool,

        /// Where to write the updated image
        #[arg(long, requires = "write")]
        output: Option<PathBuf>,
    },

    /// Remove artifacts whose file name ends with a suffix
    Clean {
        /// File name suffix to match
        #[arg(long, default_value = ".bin")]
        suffix: String,
    },
}

/// Parse a table id written in hex, with or without a `0x` prefix
pub fn parse_hex_id(value: &str) -> Result<usize, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    usize::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id {value:?}: {e}"))
}

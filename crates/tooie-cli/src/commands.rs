//! Subcommand implementations

use crate::cli::{Cli, Command};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::time::Duration;
use tooie_formats::{
    ArtifactStore, AssetCategory, AssetCodec, ChecksumStatus, ExtractedAsset, ExtractionReport,
    FailurePolicy, GzipProcessEncoder, InsertedAsset, NativeEncoder, RawDeflateEncoder, RomImage,
    RomLayout,
};
use tracing::info;

/// Run the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let layout = load_layout(cli.layout.as_deref())?;

    match cli.command {
        Command::Extract { rom, keep_going } => {
            let report = extract(layout, &cli.artifacts, &rom, keep_going)?;
            println!("{report}");
            for failure in &report.failures {
                println!("  0x{:04X}: {}", failure.id, failure.message);
            }
            if !report.is_clean() {
                bail!("{} assets failed to extract", report.failures.len());
            }
        }
        Command::ExtractOne { rom, id, decrypt } => {
            let asset = extract_one(layout, &cli.artifacts, &rom, id, decrypt)?;
            println!(
                "{}: {:?}, {} bytes written as {}",
                asset.range,
                asset.kind,
                asset.output_len,
                asset.range.name()
            );
        }
        Command::Insert {
            rom,
            id,
            category,
            output,
            encoder,
            encoder_timeout,
            encrypt,
            write_checksum,
        } => {
            let encoder: Box<dyn RawDeflateEncoder> = match encoder {
                Some(program) => Box::new(
                    GzipProcessEncoder::new(program)
                        .with_timeout(Duration::from_secs(encoder_timeout)),
                ),
                None => Box::new(NativeEncoder),
            };
            let options = InsertOptions {
                id,
                category,
                encrypt,
                write_checksum,
            };
            let inserted = insert(
                layout,
                &cli.artifacts,
                &rom,
                &output,
                &AssetCodec::with_encoder(encoder),
                &options,
            )?;
            println!(
                "{}: wrote {} byte {:?} blob to {}",
                inserted.range,
                inserted.blob_len,
                inserted.kind,
                output.display()
            );
        }
        Command::Checksum { rom, write, output } => {
            let status = checksum(layout, &rom, output.as_deref().filter(|_| write))?;
            println!("computed: {}", status.computed);
            println!("stored:   {}", status.stored);
            println!(
                "{}",
                if status.matches() {
                    "checksum matches"
                } else {
                    "checksum MISMATCH"
                }
            );
        }
        Command::Clean { suffix } => {
            let removed = clean(&cli.artifacts, &suffix)?;
            println!("removed {removed} files");
        }
    }
    Ok(())
}

fn load_layout(path: Option<&Path>) -> Result<RomLayout> {
    match path {
        Some(path) => {
            info!("using layout {}", path.display());
            RomLayout::from_json_file(path)
                .with_context(|| format!("failed to load layout {}", path.display()))
        }
        None => Ok(RomLayout::default()),
    }
}

fn load_rom(path: &Path, layout: RomLayout) -> Result<RomImage> {
    RomImage::load(path, layout).with_context(|| format!("failed to load {}", path.display()))
}

fn extract(
    layout: RomLayout,
    artifacts: &Path,
    rom: &Path,
    keep_going: bool,
) -> Result<ExtractionReport> {
    let rom = load_rom(rom, layout)?;
    let store = ArtifactStore::open(artifacts)?;
    let policy = if keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Abort
    };
    Ok(rom.extract_all(&AssetCodec::native(), &store, policy)?)
}

fn extract_one(
    layout: RomLayout,
    artifacts: &Path,
    rom: &Path,
    id: usize,
    decrypt: bool,
) -> Result<ExtractedAsset> {
    let rom = load_rom(rom, layout)?;
    let store = ArtifactStore::open(artifacts)?;
    let decrypt = decrypt || rom.layout().is_encrypted(id);
    Ok(rom.extract_asset(id, &AssetCodec::native(), &store, decrypt)?)
}

struct InsertOptions {
    id: usize,
    category: AssetCategory,
    encrypt: bool,
    write_checksum: bool,
}

fn insert<E: RawDeflateEncoder>(
    layout: RomLayout,
    artifacts: &Path,
    rom: &Path,
    output: &Path,
    codec: &AssetCodec<E>,
    options: &InsertOptions,
) -> Result<InsertedAsset> {
    let mut rom = load_rom(rom, layout)?;
    let store = ArtifactStore::open(artifacts)?;
    let encrypt = options.encrypt || rom.layout().is_encrypted(options.id);

    let inserted =
        rom.insert_from_artifacts(options.id, codec, &store, options.category, encrypt)?;
    if options.write_checksum {
        rom.write_checksum()?;
    }
    rom.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(inserted)
}

fn checksum(layout: RomLayout, rom: &Path, write_to: Option<&Path>) -> Result<ChecksumStatus> {
    let mut rom = load_rom(rom, layout)?;
    let status = rom.verify_checksum()?;

    if let Some(output) = write_to {
        rom.write_checksum()?;
        rom.save(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }
    Ok(status)
}

fn clean(artifacts: &Path, suffix: &str) -> Result<usize> {
    let store = ArtifactStore::open(artifacts)?;
    Ok(store.clear(suffix)?)
}

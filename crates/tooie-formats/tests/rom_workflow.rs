#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end tests over a synthetic cartridge image
//!
//! The fixture image carries a header, a five-entry pointer table and a pool
//! holding one of each kind of asset: data asset, raw asset, empty entry,
//! encrypted asset and overlay code.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use tooie_formats::header::Z64_PI_CONFIG;
use tooie_formats::{
    ArtifactKind, ArtifactStore, AssetCategory, AssetCodec, AssetKind, ByteBuffer, ChecksumLayout,
    CompressionError, FailurePolicy, GzipProcessEncoder, RomError, RomImage, RomLayout,
    TableLayout,
};

const TABLE_ORIGIN: usize = 0x40;
const POOL_BASE: usize = 0x400;
const IMAGE_LEN: usize = 0x1000;
const SLACK: usize = 32;

const DATA_ID: usize = 0;
const RAW_ID: usize = 1;
const EMPTY_ID: usize = 2;
const ENCRYPTED_ID: usize = 3;
const CODE_ID: usize = 4;

struct Fixture {
    rom: RomImage,
    data_payload: Vec<u8>,
    raw_blob: Vec<u8>,
    encrypted_payload: Vec<u8>,
    code_payload: Vec<u8>,
}

fn layout() -> RomLayout {
    RomLayout {
        table: TableLayout {
            table_origin: TABLE_ORIGIN,
            pool_base: POOL_BASE,
            id_start: 0,
            id_end: 5,
            id_interval: 1,
            excluded_ids: 0..0,
        },
        // Pointer word of id 1 sits at 0x44
        raw_assets: vec!["0044".to_string()],
        encrypted_ids: BTreeSet::from([ENCRYPTED_ID]),
        checksum: ChecksumLayout {
            window: 0x400..0xC00,
            aux_base: 0x40,
            ..ChecksumLayout::default()
        },
    }
}

fn text_payload(text: &str, repeats: usize) -> Vec<u8> {
    text.repeat(repeats).into_bytes()
}

fn slot(blob: &[u8], fill: u8) -> Vec<u8> {
    let mut slot = blob.to_vec();
    slot.extend(std::iter::repeat_n(fill, SLACK));
    slot
}

fn fixture() -> Fixture {
    let codec = AssetCodec::native();
    let data_payload = text_payload("Jinjo Village setup; ", 40);
    let raw_blob: Vec<u8> = (0u8..12).collect();
    let encrypted_payload = text_payload("Isle o' Hags overlay; ", 30);
    let code_payload: Vec<u8> = (0..512u32).map(|i| (i % 13) as u8).collect();

    let slots = [
        slot(
            &codec
                .encode(&data_payload, AssetCategory::Asset, None)
                .unwrap(),
            0xAA,
        ),
        raw_blob.clone(),
        Vec::new(),
        slot(
            &codec
                .encode(&encrypted_payload, AssetCategory::Asset, Some(ENCRYPTED_ID as u32))
                .unwrap(),
            0xAA,
        ),
        slot(
            &codec
                .encode(&code_payload, AssetCategory::Assembly, None)
                .unwrap(),
            0x00,
        ),
    ];

    let mut data = vec![0u8; POOL_BASE];
    data[0..4].copy_from_slice(&Z64_PI_CONFIG.to_be_bytes());
    data[0x20..0x34].copy_from_slice(b"BANJO TOOIE         ");

    let mut words = Vec::new();
    for slot in &slots {
        assert_eq!(slot.len() % 4, 0);
        // Low byte carries flags and must not affect addressing
        words.push((((data.len() - POOL_BASE) / 4) as u32) << 8 | 0x03);
        data.extend_from_slice(slot);
    }
    words.push((((data.len() - POOL_BASE) / 4) as u32) << 8);
    for (i, word) in words.iter().enumerate() {
        let offset = TABLE_ORIGIN + 4 * i;
        data[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
    }
    assert!(data.len() <= IMAGE_LEN);
    data.resize(IMAGE_LEN, 0);

    Fixture {
        rom: RomImage::new(ByteBuffer::new(data), layout()),
        data_payload,
        raw_blob,
        encrypted_payload,
        code_payload,
    }
}

fn name(rom: &RomImage, id: usize) -> String {
    rom.table().extract_range(id).unwrap().name()
}

#[test]
fn extract_all_writes_every_artifact() {
    let fx = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path().join("extracted_files")).unwrap();

    let report = fx
        .rom
        .extract_all(&AssetCodec::native(), &store, FailurePolicy::Abort)
        .unwrap();
    assert_eq!(report.compressed, 3);
    assert_eq!(report.raw, 1);
    assert_eq!(report.empty, 1);
    assert!(report.is_clean());

    let rom = &fx.rom;
    assert_eq!(name(rom, DATA_ID), "0040");
    assert_eq!(
        store
            .read(&name(rom, DATA_ID), ArtifactKind::Decompressed)
            .unwrap(),
        fx.data_payload
    );
    assert_eq!(
        store
            .read(&name(rom, ENCRYPTED_ID), ArtifactKind::Decompressed)
            .unwrap(),
        fx.encrypted_payload
    );
    assert_eq!(
        store
            .read(&name(rom, CODE_ID), ArtifactKind::Decompressed)
            .unwrap(),
        fx.code_payload
    );
    assert_eq!(
        store.read(&name(rom, RAW_ID), ArtifactKind::Raw).unwrap(),
        fx.raw_blob
    );
    assert!(!store.exists(&name(rom, RAW_ID), ArtifactKind::Decompressed));
    assert!(
        store
            .read(&name(rom, EMPTY_ID), ArtifactKind::Decompressed)
            .unwrap()
            .is_empty()
    );

    // Compressed artifacts are the slot bytes verbatim
    for id in 0..5 {
        assert_eq!(
            store
                .read(&name(rom, id), ArtifactKind::Compressed)
                .unwrap(),
            rom.table().extract(id).unwrap()
        );
    }
}

#[test]
fn encrypted_asset_needs_its_key() {
    let fx = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let codec = AssetCodec::native();

    let asset = fx
        .rom
        .extract_asset(ENCRYPTED_ID, &codec, &store, true)
        .unwrap();
    assert_eq!(asset.kind, AssetKind::Compressed);
    assert_eq!(asset.output_len, fx.encrypted_payload.len());

    match fx.rom.extract_asset(ENCRYPTED_ID, &codec, &store, false) {
        Ok(asset) => assert_ne!(asset.output_len, fx.encrypted_payload.len()),
        Err(err) => assert!(matches!(err, RomError::Asset { id: ENCRYPTED_ID, .. })),
    }
}

fn corrupt_data_asset(rom: &RomImage) -> RomImage {
    let range = rom.table().extract_range(DATA_ID).unwrap();
    let mut data = rom.buffer().as_bytes().to_vec();
    // BFINAL=1 with the reserved block type
    data[range.start + 2] = 0xFF;
    RomImage::new(ByteBuffer::new(data), rom.layout().clone())
}

#[test]
fn abort_policy_stops_at_first_failure() {
    let rom = corrupt_data_asset(&fixture().rom);
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let err = rom
        .extract_all(&AssetCodec::native(), &store, FailurePolicy::Abort)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("asset 0x0000"), "{message}");
    assert!(message.contains("pool 0x00000400"), "{message}");
    assert!(!store.exists(&name(&rom, CODE_ID), ArtifactKind::Compressed));
}

#[test]
fn keep_going_policy_records_failures() {
    let rom = corrupt_data_asset(&fixture().rom);
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let report = rom
        .extract_all(&AssetCodec::native(), &store, FailurePolicy::KeepGoing)
        .unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, DATA_ID);
    assert_eq!(report.compressed, 2);
    assert_eq!(report.total(), 5);
    assert!(store.exists(&name(&rom, CODE_ID), ArtifactKind::Decompressed));
}

#[test]
fn edited_asset_survives_reinsert_and_save() {
    let Fixture {
        mut rom,
        data_payload,
        code_payload,
        ..
    } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path().join("artifacts")).unwrap();
    let codec = AssetCodec::native();
    rom.extract_all(&codec, &store, FailurePolicy::Abort)
        .unwrap();

    let mut edited = data_payload;
    edited[..5].copy_from_slice(b"MUMBO");
    let data_name = name(&rom, DATA_ID);
    store
        .write(&data_name, ArtifactKind::Decompressed, &edited)
        .unwrap();

    let inserted = rom
        .insert_from_artifacts(DATA_ID, &codec, &store, AssetCategory::Asset, false)
        .unwrap();
    assert_eq!(inserted.kind, AssetKind::Compressed);
    assert_eq!(inserted.blob_len % 8, 0);
    assert_eq!(
        store
            .read(&data_name, ArtifactKind::Compressed)
            .unwrap()
            .len(),
        inserted.blob_len
    );

    let output = dir.path().join("patched.z64");
    rom.save(&output).unwrap();

    let reloaded = RomImage::load(&output, layout()).unwrap();
    let fresh = ArtifactStore::open(dir.path().join("fresh")).unwrap();
    reloaded
        .extract_all(&codec, &fresh, FailurePolicy::Abort)
        .unwrap();
    assert_eq!(
        fresh
            .read(&data_name, ArtifactKind::Decompressed)
            .unwrap(),
        edited
    );
    assert_eq!(
        fresh
            .read(&name(&reloaded, CODE_ID), ArtifactKind::Decompressed)
            .unwrap(),
        code_payload
    );
}

#[test]
fn raw_and_encrypted_assets_reinsert() {
    let Fixture {
        mut rom,
        raw_blob,
        encrypted_payload,
        ..
    } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let codec = AssetCodec::native();
    rom.extract_all(&codec, &store, FailurePolicy::Abort)
        .unwrap();

    let raw = rom
        .insert_from_artifacts(RAW_ID, &codec, &store, AssetCategory::Asset, false)
        .unwrap();
    assert_eq!(raw.kind, AssetKind::Raw);
    assert_eq!(rom.table().extract(RAW_ID).unwrap(), &raw_blob[..]);

    rom.insert_from_artifacts(ENCRYPTED_ID, &codec, &store, AssetCategory::Asset, true)
        .unwrap();
    let blob = rom.table().extract(ENCRYPTED_ID).unwrap();
    assert_eq!(
        codec.decode(blob, Some(ENCRYPTED_ID as u32)).unwrap(),
        encrypted_payload
    );
}

#[test]
fn oversized_edit_is_rejected() {
    let Fixture { mut rom, .. } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    let codec = AssetCodec::native();

    // Incompressible payload far larger than the slot
    let noise: Vec<u8> = (0..4096u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
        .collect();
    store
        .write(&name(&rom, CODE_ID), ArtifactKind::Decompressed, &noise)
        .unwrap();

    let before = rom.buffer().clone();
    let err = rom
        .insert_from_artifacts(CODE_ID, &codec, &store, AssetCategory::Assembly, false)
        .unwrap_err();
    let RomError::Asset { id, source, .. } = err else {
        panic!("expected asset error, got {err}");
    };
    assert_eq!(id, CODE_ID);
    assert!(matches!(*source, RomError::AssetTooLarge { id: CODE_ID, .. }));
    assert_eq!(rom.buffer(), &before);

    // A blob that never made it into the image is not left behind as an artifact
    assert!(
        store
            .read(&name(&rom, CODE_ID), ArtifactKind::Compressed)
            .is_err()
    );
}

#[test]
fn insert_with_missing_encoder_names_the_asset() {
    let Fixture { mut rom, .. } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    store
        .write(
            &name(&rom, DATA_ID),
            ArtifactKind::Decompressed,
            b"Jinjo Village",
        )
        .unwrap();
    let codec = AssetCodec::with_encoder(GzipProcessEncoder::new("/nonexistent/tooie-gzip"));

    let before = rom.buffer().clone();
    let err = rom
        .insert_from_artifacts(DATA_ID, &codec, &store, AssetCategory::Asset, false)
        .unwrap_err();
    assert!(err.to_string().contains("pool 0x"));
    let RomError::Asset { id, source, .. } = err else {
        panic!("expected asset error, got {err}");
    };
    assert_eq!(id, DATA_ID);
    assert!(matches!(
        *source,
        RomError::Compression(CompressionError::EncoderUnavailable(_))
    ));
    assert_eq!(rom.buffer(), &before);
}

#[test]
fn insert_without_artifact_names_the_asset() {
    let Fixture { mut rom, .. } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let err = rom
        .insert_from_artifacts(
            DATA_ID,
            &AssetCodec::native(),
            &store,
            AssetCategory::Asset,
            false,
        )
        .unwrap_err();
    let RomError::Asset { id, source, .. } = err else {
        panic!("expected asset error, got {err}");
    };
    assert_eq!(id, DATA_ID);
    assert!(matches!(*source, RomError::Artifact(_)));
}

#[test]
fn checksum_write_back_persists() {
    let Fixture { mut rom, .. } = fixture();
    assert!(!rom.verify_checksum().unwrap().matches());

    let written = rom.write_checksum().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("checked.z64");
    rom.save(&output).unwrap();

    let reloaded = RomImage::load(&output, layout()).unwrap();
    let status = reloaded.verify_checksum().unwrap();
    assert!(status.matches());
    assert_eq!(status.stored, written);

    let header = reloaded.header().unwrap();
    assert_eq!(header.checksum(), written);
    assert_eq!(header.title(), "BANJO TOOIE");
}

#[test]
fn layout_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");
    std::fs::write(
        &path,
        r#"{ "raw_assets": ["0044"], "encrypted_ids": [3], "table": { "id_end": 5 } }"#,
    )
    .unwrap();

    let loaded = RomLayout::from_json_file(&path).unwrap();
    assert_eq!(loaded.raw_assets, vec!["0044".to_string()]);
    assert!(loaded.is_encrypted(3));
    assert_eq!(loaded.table.id_end, 5);
    assert_eq!(loaded.table.table_origin, 0x5188);
}

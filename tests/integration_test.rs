use pakindex::container::{ContainerWriter, EntryTable, Header, PackOptions, PakReader};
use pakindex::reader::ArchiveReader;
use pakindex::{
    load_containers, ArchiveKey, ArchiveSession, CodecId, DirectoryPath, Error, LoadState,
    PakOpener, Settings, SkipReason,
};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempDir;

const KEY: &str = "0xb5dbd6c9db714cc3e2c9c7422eb0a7e667168d92c59770214ec6abc68d8c2d3e";
const OTHER_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

fn key(s: &str) -> ArchiveKey {
    s.parse().unwrap()
}

fn write_container(path: &Path, key: Option<&str>, files: &[(&str, &[u8])]) {
    let options = PackOptions { key: key.map(|k| k.parse().unwrap()), ..Default::default() };
    let mut writer = ContainerWriter::create(path, options).unwrap();
    for (name, data) in files {
        writer.add_entry(name, data).unwrap();
    }
    writer.finalize().unwrap();
}

/// Invert one byte in place.
fn flip_byte(path: &Path, offset: u64) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.read_exact(&mut byte).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[!byte[0]]).unwrap();
}

fn scenario_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_container(
        &dir.path().join("pakchunk0.pak"),
        Some(KEY),
        &[("Characters/Hero.uasset", b"hero asset")],
    );
    write_container(
        &dir.path().join("pakchunk1.pak"),
        Some(KEY),
        &[("Characters/Hero.uexp", b"hero export"), ("Weapons/Sword.uasset", b"sword")],
    );
    dir
}

#[test]
fn test_two_container_scenario() {
    let dir = scenario_dir();
    let loaded = load_containers(&Settings::new(dir.path()).with_key(KEY), &PakOpener).unwrap();
    let index = loaded.index();

    let keys: Vec<&str> = index.directories().keys().map(DirectoryPath::as_str).collect();
    assert_eq!(keys, ["Characters/", "Weapons/"]);
    assert_eq!(index.directories()["Characters/"].len(), 2);

    let top: Vec<&str> = loaded.tree().children().map(|n| n.name()).collect();
    assert_eq!(top, ["Characters", "Weapons"]);

    let hero = index.resolve_entry("Characters/", "Hero").unwrap();
    assert_eq!(hero.name(), "Hero.uasset");
    let first = &loaded.report().accepted[0];
    assert!(first.path.ends_with("pakchunk0.pak"));
    assert_eq!(hero.container(), &first.id);
    assert_eq!(loaded.read_entry(hero).unwrap(), b"hero asset");

    let uexp = index.resolve_file("Characters/", "Hero.uexp").unwrap();
    assert_eq!(loaded.read_entry(uexp).unwrap(), b"hero export");
}

#[test]
fn test_rejected_key_leaves_no_trace() {
    let dir = scenario_dir();
    write_container(
        &dir.path().join("pakchunk2.pak"),
        Some(OTHER_KEY),
        &[("Secret/Plans.uasset", b"plans")],
    );

    let loaded = load_containers(&Settings::new(dir.path()).with_key(KEY), &PakOpener).unwrap();
    assert_eq!(loaded.report().accepted.len(), 2);
    assert_eq!(loaded.report().skipped.len(), 1);
    assert_eq!(loaded.report().skipped[0].reason, SkipReason::KeyRejected);
    assert!(!loaded.index().directories().contains("Secret/"));
    assert!(loaded.tree().child("Secret").is_none());
    assert!(loaded.index().resolve_entry("Secret/", "Plans").unwrap_err().is_not_found());
}

#[test]
fn test_corrupt_and_foreign_files_are_skipped() {
    let dir = scenario_dir();
    fs::write(dir.path().join("garbage.pak"), b"definitely not a container").unwrap();

    // Flip a byte inside the entry table of an otherwise valid container.
    let damaged = dir.path().join("pakchunk9.pak");
    write_container(&damaged, Some(KEY), &[("Maps/Arena.umap", b"arena")]);
    let header = PakReader::open(&damaged).unwrap().header().clone();
    flip_byte(&damaged, header.index_offset + 2);

    let loaded = load_containers(&Settings::new(dir.path()).with_key(KEY), &PakOpener).unwrap();
    assert_eq!(loaded.report().accepted.len(), 2);
    assert_eq!(loaded.report().skipped.len(), 2);
    for skipped in &loaded.report().skipped {
        assert!(matches!(skipped.reason, SkipReason::OpenFailed(_)), "{:?}", skipped);
    }
    assert_eq!(loaded.index().directories().len(), 2);
}

#[test]
fn test_same_container_twice_is_not_duplicated() {
    let dir = scenario_dir();
    fs::copy(dir.path().join("pakchunk1.pak"), dir.path().join("pakchunk1_copy.pak")).unwrap();

    let loaded = load_containers(&Settings::new(dir.path()).with_key(KEY), &PakOpener).unwrap();
    assert_eq!(loaded.report().accepted.len(), 3);
    assert_eq!(loaded.report().accepted[2].entries, 0);
    assert_eq!(loaded.index().entry_count(), 3);
    assert_eq!(loaded.index().containers().len(), 2);
    assert_eq!(loaded.index().list_directory("Weapons").len(), 1);
}

#[test]
fn test_pak_reader_key_gating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.pak");
    write_container(&path, Some(KEY), &[("Docs/readme.txt", b"hello")]);

    let mut reader = PakReader::open(&path).unwrap();
    assert!(reader.header().is_encrypted());
    assert!(matches!(reader.entries(), Err(Error::KeyRequired(_))));
    assert!(!reader.test_key(&key(OTHER_KEY)));
    assert!(reader.set_key(&key(OTHER_KEY)).is_err());
    assert!(!reader.is_unlocked());

    assert!(reader.test_key(&key(KEY)));
    reader.set_key(&key(KEY)).unwrap();
    let entries = reader.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path(), "Docs/readme.txt");
    assert_eq!(reader.read(&entries[0]).unwrap(), b"hello");
}

#[test]
fn test_unencrypted_container_accepts_any_key() {
    let dir = tempfile::tempdir().unwrap();
    write_container(&dir.path().join("open.pak"), None, &[("UI/Icon.png", b"png")]);

    let reader = PakReader::open(dir.path().join("open.pak")).unwrap();
    assert!(!reader.header().is_encrypted());
    assert!(reader.test_key(&key(OTHER_KEY)));
    assert_eq!(reader.entries().unwrap().len(), 1);

    let loaded = load_containers(&Settings::new(dir.path()), &PakOpener).unwrap();
    assert_eq!(loaded.index().list_directory("ui")[0].name(), "Icon.png");
}

#[test]
fn test_passphrase_key_is_derived_per_container() {
    let dir = tempfile::tempdir().unwrap();
    write_container(&dir.path().join("a.pak"), Some("open sesame"), &[("A/x.txt", b"x")]);

    let mut reader = PakReader::open(dir.path().join("a.pak")).unwrap();
    assert!(!reader.test_key(&key("close sesame")));
    reader.set_key(&key("open sesame")).unwrap();
    let entry = reader.entries().unwrap().remove(0);
    assert_eq!(reader.read(&entry).unwrap(), b"x");
}

#[test]
fn test_every_codec_and_shared_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codecs.pak");
    let shared = b"identical content stored once".to_vec();
    {
        let options = PackOptions { key: Some(key(KEY)), ..Default::default() };
        let mut writer = ContainerWriter::create(&path, options).unwrap();
        for codec in [CodecId::None, CodecId::Zstd, CodecId::Lz4, CodecId::Brotli, CodecId::Lzma] {
            let name = format!("Codecs/{}.bin", codec.name());
            writer.add_entry_with_codec(&name, codec.name().repeat(50).as_bytes(), codec).unwrap();
        }
        writer.add_entry("Copies/a.bin", &shared).unwrap();
        writer.add_entry("Copies/b.bin", &shared).unwrap();
        assert!(writer.add_entry("copies/A.BIN", b"dup").is_err());
        writer.finalize().unwrap();
    }

    let mut reader = PakReader::open(&path).unwrap();
    reader.set_key(&key(KEY)).unwrap();
    let records = reader.records().unwrap();
    assert_eq!(records[5].offset, records[6].offset);

    for entry in reader.entries().unwrap() {
        let data = reader.read(&entry).unwrap();
        if entry.directory().as_str() == "Codecs/" {
            assert_eq!(data, entry.display_name().repeat(50).as_bytes());
        } else {
            assert_eq!(data, shared);
        }
    }
}

#[test]
fn test_corrupted_block_is_reported_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.pak");
    write_container(&path, Some(KEY), &[("A/data.bin", &[7u8; 256])]);

    let mut reader = PakReader::open(&path).unwrap();
    reader.set_key(&key(KEY)).unwrap();
    let offset = reader.records().unwrap()[0].offset;

    flip_byte(&path, offset + 24);

    let entry = reader.entries().unwrap().remove(0);
    assert!(matches!(reader.read(&entry), Err(Error::InvalidContainer { .. })));
}

/// Rewrite the entry table of an unencrypted container, fixing up the header.
fn rewrite_table(path: &Path, edit: impl FnOnce(&mut EntryTable)) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut header = Header::read(&mut file).unwrap();
    let mut raw = vec![0u8; header.index_size as usize];
    file.seek(SeekFrom::Start(header.index_offset)).unwrap();
    file.read_exact(&mut raw).unwrap();

    let mut table = EntryTable::from_bytes(&raw).unwrap();
    edit(&mut table);
    let raw = table.to_bytes().unwrap();

    header.index_size = raw.len() as u64;
    header.index_crc32 = crc32fast::hash(&raw);
    file.seek(SeekFrom::Start(header.index_offset)).unwrap();
    file.write_all(&raw).unwrap();
    file.set_len(header.index_offset + raw.len() as u64).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    header.write(&mut file).unwrap();
}

#[test]
fn test_out_of_range_block_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let huge = dir.path().join("huge.pak");
    write_container(&huge, None, &[("A/data.bin", b"data"), ("A/more.bin", b"more")]);
    rewrite_table(&huge, |t| t.records[0].stored_size = 1 << 62);

    let wrapped = dir.path().join("wrapped.pak");
    write_container(&wrapped, None, &[("B/data.bin", b"data")]);
    rewrite_table(&wrapped, |t| t.records[0].offset = u64::MAX - 4);

    for path in [&huge, &wrapped] {
        assert!(matches!(PakReader::open(path), Err(Error::InvalidContainer { .. })));
    }

    write_container(&dir.path().join("good.pak"), None, &[("C/ok.bin", b"ok")]);
    let loaded = load_containers(&Settings::new(dir.path()), &PakOpener).unwrap();
    assert_eq!(loaded.report().accepted.len(), 1);
    assert_eq!(loaded.report().skipped.len(), 2);
    let ok = loaded.index().resolve_path("C/ok.bin").unwrap();
    assert_eq!(loaded.read_entry(ok).unwrap(), b"ok");
}

#[test]
fn test_session_load_from_settings_file() {
    let dir = scenario_dir();
    let config = dir.path().join("settings.json");
    fs::write(
        &config,
        format!(r#"{{ "archive_dir": {:?}, "key": "{KEY}", "extension": ".pak" }}"#, dir.path()),
    )
    .unwrap();

    let session = ArchiveSession::with_pak_containers(Settings::load(&config).unwrap());
    assert!(matches!(session.snapshot(), Err(Error::NotLoaded)));
    session.load_all().unwrap();
    assert_eq!(session.state(), LoadState::Ready { generation: 1 });

    let snapshot = session.wait_ready().unwrap();
    let sword = snapshot.index().resolve_entry("weapons", "SWORD").unwrap();
    assert_eq!(snapshot.read_entry(sword).unwrap(), b"sword");
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zipnav_archive::{CompressionLevel, ReadArchive, WriteArchive};

// 2020-01-01T01:02:02Z, already at the format's 2-second granularity.
fn fixed_timestamp() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_577_836_800 + 3722)
}

#[test]
fn test_written_entries_list_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ordered.zip");

    let plans = [
        ("alpha.txt", CompressionLevel::Default, "alpha body. ".repeat(80)),
        ("beta.bin", CompressionLevel::None, "beta body".to_string()),
        ("gamma.log", CompressionLevel::Best, "gamma body. ".repeat(120)),
        ("delta.dat", CompressionLevel::Fastest, "delta body. ".repeat(40)),
    ];

    let mut archive = WriteArchive::create(&path, false)?;
    for (name, level, body) in &plans {
        let mut writer = archive.begin_entry(name, fixed_timestamp(), *level, None)?;
        writer.write(body.as_bytes())?;
        writer.close()?;
    }
    archive.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    let entries = archive.list_all()?;
    assert_eq!(entries.len(), plans.len());
    for (entry, (name, level, body)) in entries.iter().zip(&plans) {
        assert_eq!(entry.name, *name);
        assert_eq!(entry.level, *level);
        assert_eq!(entry.uncompressed_size, body.len() as u64);
        assert!(!entry.encrypted);
        assert_eq!(entry.modified, fixed_timestamp());
        assert_eq!(entry.crc32, crc32fast::hash(body.as_bytes()));
    }
    archive.close()?;
    Ok(())
}

#[test]
fn test_locate_and_read_back_bytes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bytes.zip");
    let body = "round-tripped content line. ".repeat(100);

    let mut archive = WriteArchive::create(&path, false)?;
    let mut writer =
        archive.begin_entry("data.txt", fixed_timestamp(), CompressionLevel::Default, None)?;
    writer.write(body.as_bytes())?;
    writer.close()?;
    archive.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    assert!(archive.locate("data.txt"));
    assert_eq!(
        archive.current_entry()?.uncompressed_size,
        body.len() as u64
    );
    let mut reader = archive.open_current_entry(None)?;
    assert_eq!(reader.entry_name(), "data.txt");
    let bytes = reader.read_to_end()?;
    reader.close()?;
    assert_eq!(bytes, body.as_bytes());
    archive.close()?;
    Ok(())
}

#[test]
fn test_stored_entry_reproduces_bytes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stored.zip");
    let body: Vec<u8> = (0u8..=255).cycle().take(4000).collect();

    let mut archive = WriteArchive::create(&path, false)?;
    let mut writer =
        archive.begin_entry("raw.bin", fixed_timestamp(), CompressionLevel::None, None)?;
    writer.write(&body)?;
    writer.close()?;
    archive.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    assert!(archive.locate("raw.bin"));
    let entry = archive.current_entry()?;
    assert_eq!(entry.level, CompressionLevel::None);
    assert_eq!(entry.compressed_size, entry.uncompressed_size);

    let mut reader = archive.open_current_entry(None)?;
    let bytes = reader.read_to_end()?;
    reader.close()?;
    assert_eq!(bytes, body);
    archive.close()?;
    Ok(())
}

#[test]
fn test_append_mode_extends_archive() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("append.zip");

    let mut archive = WriteArchive::create(&path, false)?;
    let mut writer =
        archive.begin_entry("first", fixed_timestamp(), CompressionLevel::Default, None)?;
    writer.write(b"first body")?;
    writer.close()?;
    archive.close()?;

    let mut archive = WriteArchive::append(&path, false)?;
    let mut writer =
        archive.begin_entry("second", fixed_timestamp(), CompressionLevel::Default, None)?;
    writer.write(b"second body")?;
    writer.close()?;
    archive.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    let names: Vec<_> = archive.list_all()?.into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["first", "second"]);

    assert!(archive.locate("first"));
    let mut reader = archive.open_current_entry(None)?;
    let bytes = reader.read_to_end()?;
    reader.close()?;
    assert_eq!(bytes, b"first body");
    archive.close()?;
    Ok(())
}

#[test]
fn test_wide_format_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("wide.zip");
    let body = "wide format payload. ".repeat(60);

    let mut archive = WriteArchive::create(&path, true)?;
    let mut writer =
        archive.begin_entry("wide.txt", fixed_timestamp(), CompressionLevel::Default, None)?;
    writer.write(body.as_bytes())?;
    writer.close()?;
    archive.close()?;

    let mut archive = ReadArchive::open(&path, true)?;
    assert_eq!(archive.count(), 1);
    let entries = archive.list_all()?;
    assert_eq!(entries[0].name, "wide.txt");
    assert_eq!(entries[0].uncompressed_size, body.len() as u64);

    assert!(archive.locate("wide.txt"));
    let mut reader = archive.open_current_entry(None)?;
    let bytes = reader.read_to_end()?;
    reader.close()?;
    assert_eq!(bytes, body.as_bytes());
    archive.close()?;
    Ok(())
}

#[test]
fn test_modified_date_truncates_to_two_seconds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dates.zip");
    let odd = fixed_timestamp() + Duration::from_secs(1);

    let mut archive = WriteArchive::create(&path, false)?;
    let writer = archive.begin_entry("t", odd, CompressionLevel::None, None)?;
    writer.close()?;
    archive.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    let entries = archive.list_all()?;
    assert_eq!(entries[0].modified, fixed_timestamp());
    archive.close()?;
    Ok(())
}

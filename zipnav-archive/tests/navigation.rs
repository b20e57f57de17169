use std::time::SystemTime;
use zipnav_archive::{Archive, ArchiveError, CompressionLevel, OpenMode, ReadArchive, WriteArchive};

fn write_numbered_entries(path: &std::path::Path, count: usize) {
    let mut archive = WriteArchive::create(path, false).unwrap();
    for i in 0..count {
        let mut writer = archive
            .begin_entry(
                &format!("entry-{i}.txt"),
                SystemTime::now(),
                CompressionLevel::Default,
                None,
            )
            .unwrap();
        writer.write(format!("payload {i}").as_bytes()).unwrap();
        writer.close().unwrap();
    }
    archive.close().unwrap();
}

#[test]
fn test_created_empty_archive_reads_back_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.zip");

    WriteArchive::create(&path, false)?.close()?;

    let mut archive = ReadArchive::open(&path, false)?;
    assert_eq!(archive.count(), 0);
    assert!(archive.list_all()?.is_empty());

    // Positioning on an empty directory is a hard failure, not "no entries".
    let err = archive.go_to_first().unwrap_err();
    assert!(matches!(err, ArchiveError::Navigation { .. }));

    archive.close()?;
    Ok(())
}

#[test]
fn test_next_walk_covers_directory_exactly() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("walk.zip");
    write_numbered_entries(&path, 5);

    let mut archive = ReadArchive::open(&path, false)?;
    assert_eq!(archive.count(), 5);

    archive.go_to_first()?;
    for _ in 0..archive.count() - 1 {
        assert!(archive.go_to_next()?);
    }
    assert_eq!(archive.current_entry()?.name, "entry-4.txt");

    // One further call is end-of-directory, never a failure.
    assert!(!archive.go_to_next()?);
    assert_eq!(archive.current_entry()?.name, "entry-4.txt");

    archive.close()?;
    Ok(())
}

#[test]
fn test_locate_miss_leaves_archive_usable() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("miss.zip");
    write_numbered_entries(&path, 3);

    let mut archive = ReadArchive::open(&path, false)?;
    assert!(!archive.locate("missing"));

    let entries = archive.list_all()?;
    assert_eq!(entries.len(), 3);

    assert!(archive.locate("entry-1.txt"));
    assert_eq!(archive.current_entry()?.name, "entry-1.txt");
    assert!(!archive.locate("Entry-1.txt")); // case-sensitive

    archive.close()?;
    Ok(())
}

#[test]
fn test_mode_is_fixed_at_open() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("modes.zip");
    write_numbered_entries(&path, 1);

    match Archive::open(&path, OpenMode::Read, false)? {
        Archive::Read(mut archive) => {
            assert_eq!(archive.count(), 1);
            assert_eq!(archive.list_all()?.len(), 1);
            archive.close()?;
        }
        Archive::Write(_) => panic!("read open must yield the read variant"),
    }

    match Archive::open(&path, OpenMode::Append, false)? {
        Archive::Write(archive) => archive.close()?,
        Archive::Read(_) => panic!("append open must yield the write variant"),
    }
    Ok(())
}

#[test]
fn test_open_missing_file_fails_with_path() {
    let err = ReadArchive::open(std::path::Path::new("/nonexistent/nope.zip"), false).unwrap_err();
    assert!(matches!(err, ArchiveError::NoSuchFile { .. }));
    assert!(err.to_string().contains("nope.zip"));
}

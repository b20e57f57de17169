//! Archive handles: open modes, directory navigation, and entry lifecycle.
//!
//! The open mode is a closed sum type fixed at construction. Read-only
//! operations live on [`ReadArchive`], write-only operations on
//! [`WriteArchive`]; calling an operation in the wrong mode is a compile
//! error, not a runtime failure class. Entry streams mutably borrow their
//! archive, so a second stream cannot be opened while one is live and the
//! archive cannot be closed under a live stream.

use crate::error::{ArchiveError, Result};
use crate::metadata::{CompressionLevel, EntryMetadata};
use crate::names::{RetainedNames, decode_name};
use crate::stream::{EntryReader, EntryWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zipnav_codec::writer::EntryWriteSpec;
use zipnav_codec::{CodecReader, CodecWriter, dostime};

/// How an archive is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Navigate and read an existing archive.
    Read,
    /// Create a fresh archive, truncating any existing file.
    Create,
    /// Extend an existing archive with further entries.
    Append,
}

/// Password and declared CRC for one encrypted entry.
///
/// The traditional encryption scheme derives its header check byte from the
/// entry's final CRC-32, so the two always travel together. A wrong CRC
/// produces a readable-but-corrupt entry, never a write-time failure.
#[derive(Debug, Clone, Copy)]
pub struct EntryEncryption<'a> {
    /// Password the entry is keyed with.
    pub password: &'a [u8],
    /// Final CRC-32 of the entry's uncompressed payload.
    pub crc32: u32,
}

/// An open archive, in the mode fixed at construction.
pub enum Archive {
    /// Opened for navigation and reading.
    Read(ReadArchive),
    /// Opened for writing, freshly created or appending.
    Write(WriteArchive),
}

impl Archive {
    /// Open an archive in the given mode.
    ///
    /// `wide` selects 64-bit size/offset handling; it is fixed for the life
    /// of the handle and changes only the representable magnitudes, not the
    /// public behavior.
    pub fn open(path: &Path, mode: OpenMode, wide: bool) -> Result<Self> {
        match mode {
            OpenMode::Read => ReadArchive::open(path, wide).map(Self::Read),
            OpenMode::Create => WriteArchive::create(path, wide).map(Self::Write),
            OpenMode::Append => WriteArchive::append(path, wide).map(Self::Write),
        }
    }

    /// Close the archive, finalizing the codec handle.
    pub fn close(self) -> Result<()> {
        match self {
            Self::Read(archive) => archive.close(),
            Self::Write(archive) => archive.close(),
        }
    }
}

/// A read-mode archive: a cursor over the central directory plus entry
/// streaming.
#[derive(Debug)]
pub struct ReadArchive {
    pub(crate) path: PathBuf,
    pub(crate) codec: CodecReader,
    retained: RetainedNames,
}

impl ReadArchive {
    /// Open an existing archive for navigation.
    pub fn open(path: &Path, wide: bool) -> Result<Self> {
        let codec = CodecReader::open(path, wide)
            .map_err(|e| ArchiveError::no_such_file(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            codec,
            retained: RetainedNames::default(),
        })
    }

    /// Total directory record count, from the global info matching the
    /// handle's format selection.
    pub fn count(&self) -> u64 {
        self.codec.entry_count()
    }

    /// Position the cursor at the first entry.
    ///
    /// An empty archive is a hard failure here; check [`count`](Self::count)
    /// first when emptiness is an expected case.
    pub fn go_to_first(&mut self) -> Result<()> {
        self.codec
            .goto_first()
            .map_err(|e| ArchiveError::navigation(&self.path, "go_to_first", e))
    }

    /// Advance the cursor. Returns `false` exactly at the end of the
    /// directory; that is a normal outcome, never an error.
    pub fn go_to_next(&mut self) -> Result<bool> {
        self.codec
            .goto_next()
            .map_err(|e| ArchiveError::navigation(&self.path, "go_to_next", e))
    }

    /// Position the cursor at the entry named `name`, byte-exact and
    /// case-sensitive. Returns `false` when no such entry exists, leaving
    /// the cursor untouched.
    ///
    /// The lookup bytes come from the retained-names table when the name
    /// was seen by a full [`list_all`](Self::list_all), falling back to the
    /// UTF-8 encoding of `name`. After only a partial manual walk, entries
    /// whose stored names are legacy-encoded can therefore be missed.
    pub fn locate(&mut self, name: &str) -> bool {
        let raw = match self.retained.lookup(name) {
            Some(bytes) => bytes.to_vec(),
            None => name.as_bytes().to_vec(),
        };
        self.codec.locate_raw(&raw)
    }

    /// Metadata of the entry under the cursor.
    ///
    /// The decoded name is recorded in the retained-names table so a later
    /// [`locate`](Self::locate) can reproduce the original bytes.
    pub fn current_entry(&mut self) -> Result<EntryMetadata> {
        let record = self
            .codec
            .current_record()
            .map_err(|e| ArchiveError::info(&self.path, e))?;
        let name = decode_name(&record.raw_name);
        self.retained.insert(&name, &record.raw_name);
        Ok(EntryMetadata::from_record(name, record))
    }

    /// Materialize every directory record, in directory order.
    ///
    /// Fully repopulates the retained-names table from scratch. When the
    /// archive is empty the cursor is left untouched and an empty sequence
    /// is returned.
    pub fn list_all(&mut self) -> Result<Vec<EntryMetadata>> {
        if self.count() == 0 {
            return Ok(Vec::new());
        }
        self.retained.clear();
        self.go_to_first()?;
        let mut entries = Vec::new();
        loop {
            entries.push(self.current_entry()?);
            if !self.go_to_next()? {
                break;
            }
        }
        Ok(entries)
    }

    /// Open the entry under the cursor for streaming reads.
    ///
    /// An omitted password on an encrypted entry is not rejected here;
    /// reads then fail late or yield garbage.
    pub fn open_current_entry(&mut self, password: Option<&[u8]>) -> Result<EntryReader<'_>> {
        let name = {
            let record = self
                .codec
                .current_record()
                .map_err(|e| ArchiveError::info(&self.path, e))?;
            decode_name(&record.raw_name)
        };
        self.codec
            .open_entry(password)
            .map_err(|e| ArchiveError::open_entry(&self.path, &name, e))?;
        Ok(EntryReader::new(self, name))
    }

    /// Close the archive and release the codec handle.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.codec
            .close()
            .map_err(|e| ArchiveError::close_archive(&path, e))
    }
}

/// A write-mode archive, freshly created or appending.
pub struct WriteArchive {
    pub(crate) path: PathBuf,
    pub(crate) codec: CodecWriter,
}

impl WriteArchive {
    /// Create a fresh archive, truncating any existing file.
    pub fn create(path: &Path, wide: bool) -> Result<Self> {
        let codec = CodecWriter::create(path, wide)
            .map_err(|e| ArchiveError::no_such_file(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            codec,
        })
    }

    /// Open an existing archive and continue writing after its last entry.
    pub fn append(path: &Path, wide: bool) -> Result<Self> {
        let codec = CodecWriter::append(path, wide)
            .map_err(|e| ArchiveError::no_such_file(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            codec,
        })
    }

    /// Declare a new entry and open it for streaming writes.
    ///
    /// The entry uses raw deflate unless `level` is
    /// [`CompressionLevel::None`], in which case it is stored. A failed
    /// begin hands out no writer and leaves the handle usable.
    pub fn begin_entry<'a>(
        &'a mut self,
        name: &str,
        modified: SystemTime,
        level: CompressionLevel,
        encryption: Option<EntryEncryption<'_>>,
    ) -> Result<EntryWriter<'a>> {
        let spec = EntryWriteSpec {
            raw_name: name.as_bytes(),
            packed_date: dostime::to_packed(modified),
            deflate_level: level.deflate_level(),
            level_flag_bits: level.flag_bits(),
            password: encryption.map(|e| e.password),
            crypt_crc: encryption.map(|e| e.crc32),
        };
        self.codec
            .open_entry(&spec)
            .map_err(|e| ArchiveError::open_entry(&self.path, name, e))?;
        Ok(EntryWriter::new(self, name.to_string()))
    }

    /// Close the archive, writing the central directory and end records.
    ///
    /// Until this call the archive has no durable directory.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.codec
            .close()
            .map_err(|e| ArchiveError::close_archive(&path, e))
    }
}

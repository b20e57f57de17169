//! Entry streams.
//!
//! A stream mutably borrows its archive for its whole life, which is what
//! enforces the one-active-stream rule and keeps the archive from closing
//! underneath it. Finalization is the explicit, consuming [`close`]; a
//! stream dropped without close leaves the codec's per-entry state
//! unfinalized, which is a caller error.
//!
//! [`close`]: EntryReader::close

use crate::archive::{ReadArchive, WriteArchive};
use crate::error::{ArchiveError, Result};
use std::io;

/// Sequential decompressing reader over the archive's current entry.
pub struct EntryReader<'a> {
    archive: &'a mut ReadArchive,
    entry: String,
}

impl<'a> EntryReader<'a> {
    pub(crate) fn new(archive: &'a mut ReadArchive, entry: String) -> Self {
        Self { archive, entry }
    }

    /// Name of the entry this stream reads.
    pub fn entry_name(&self) -> &str {
        &self.entry
    }

    /// Read decompressed bytes into `buf`. Returns 0 exactly at the end of
    /// the entry.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.archive
            .codec
            .read(buf)
            .map_err(|e| ArchiveError::read(&self.archive.path, &self.entry, e))
    }

    /// Read the remainder of the entry into a vector.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }

    /// Finalize the entry, validating the CRC when it was fully consumed.
    /// Safe after partial consumption.
    pub fn close(self) -> Result<()> {
        self.archive
            .codec
            .close_entry()
            .map_err(|e| ArchiveError::close_entry(&self.archive.path, &self.entry, e))
    }
}

impl io::Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryReader::read(self, buf).map_err(io::Error::other)
    }
}

/// Sequential compressing writer for a newly declared entry.
pub struct EntryWriter<'a> {
    archive: &'a mut WriteArchive,
    entry: String,
}

impl<'a> EntryWriter<'a> {
    pub(crate) fn new(archive: &'a mut WriteArchive, entry: String) -> Self {
        Self { archive, entry }
    }

    /// Name of the entry this stream writes.
    pub fn entry_name(&self) -> &str {
        &self.entry
    }

    /// Append bytes to the entry's payload.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.archive
            .codec
            .write(buf)
            .map_err(|e| ArchiveError::write(&self.archive.path, &self.entry, e))
    }

    /// Finalize the entry's CRC and size bookkeeping. Until this call the
    /// entry is not part of a durable directory record.
    pub fn close(self) -> Result<()> {
        self.archive
            .codec
            .close_entry()
            .map_err(|e| ArchiveError::close_entry(&self.archive.path, &self.entry, e))
    }
}

impl io::Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        EntryWriter::write(self, buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

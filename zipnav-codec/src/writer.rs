//! Stateful write handle producing an archive entry by entry.
//!
//! Entries stream through the deflate transform (and then the cipher) to
//! the file; CRC and sizes are patched back into the local header when the
//! entry closes, so no data descriptors are emitted. The central directory
//! and the end records are written only by [`CodecWriter::close`] — a
//! handle dropped without close leaves no durable directory.

use crate::crypto::{CRYPT_HEADER_LEN, ZipCrypto};
use crate::error::{CodecError, Result};
use crate::record::{
    DirectoryRecord, END_OF_CENTRAL_DIR_SIG, FLAG_ENCRYPTED, LOCAL_FILE_HEADER_SIG,
    LOCAL_HEADER_LEN, METHOD_DEFLATED, METHOD_STORED, ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG,
    ZIP64_END_OF_CENTRAL_DIR_SIG, ZIP64_EXTRA_FIELD_ID, ZIP64_MARKER_16, ZIP64_MARKER_32,
    locate_directory, read_directory, write_central_record,
};
use flate2::{Compress, Compression, FlushCompress, Status};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const OUTPUT_CHUNK: usize = 8192;

/// Everything the codec needs to begin one entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryWriteSpec<'a> {
    /// Entry name bytes, stored verbatim.
    pub raw_name: &'a [u8],
    /// Packed DOS date/time word.
    pub packed_date: u32,
    /// Deflate level 1..=9, or `None` for a stored entry.
    pub deflate_level: Option<u32>,
    /// Level bit-pair for the general-purpose flags, pre-shifted.
    pub level_flag_bits: u16,
    /// Password for traditional encryption.
    pub password: Option<&'a [u8]>,
    /// Final CRC-32 of the payload; mandatory with a password, whose crypt
    /// header check byte derives from it.
    pub crypt_crc: Option<u32>,
}

struct WriteState {
    record: DirectoryRecord,
    name_len: u64,
    extra_len: u64,
    compressor: Option<Compress>,
    cipher: Option<ZipCrypto>,
    hasher: crc32fast::Hasher,
    uncompressed: u64,
    compressed: u64,
    declared_crc: Option<u32>,
}

/// Write-mode codec handle.
pub struct CodecWriter {
    file: File,
    records: Vec<DirectoryRecord>,
    offset: u64,
    wide: bool,
    entry: Option<WriteState>,
}

impl CodecWriter {
    /// Create a fresh archive, truncating any existing file.
    pub fn create(path: &Path, wide: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            records: Vec::new(),
            offset: 0,
            wide,
            entry: None,
        })
    }

    /// Open an existing archive and continue writing after its last entry.
    ///
    /// The existing central directory is re-read and rewritten, extended,
    /// on close.
    pub fn append(path: &Path, wide: bool) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let info = locate_directory(&mut file)?;
        let records = read_directory(&mut file, &info)?;
        file.seek(SeekFrom::Start(info.cd_offset))?;
        Ok(Self {
            file,
            records,
            offset: info.cd_offset,
            wide,
            entry: None,
        })
    }

    /// Begin a new entry, writing its local header (and crypt header).
    ///
    /// Fails without side effects on a contract violation; a failed begin
    /// leaves no open entry behind.
    pub fn open_entry(&mut self, spec: &EntryWriteSpec<'_>) -> Result<()> {
        if self.entry.is_some() {
            return Err(CodecError::EntryOpen);
        }
        if spec.raw_name.is_empty() || spec.raw_name.len() > u16::MAX as usize {
            return Err(CodecError::param("entry name must be 1..=65535 bytes"));
        }
        let crypt = match (spec.password, spec.crypt_crc) {
            (Some(password), Some(crc)) => Some((password, crc)),
            (Some(_), None) => {
                return Err(CodecError::param(
                    "traditional encryption requires the entry CRC-32 up front",
                ));
            }
            _ => None,
        };

        let mut flags = spec.level_flag_bits;
        if crypt.is_some() {
            flags |= FLAG_ENCRYPTED;
        }
        let method = if spec.deflate_level.is_some() {
            METHOD_DEFLATED
        } else {
            METHOD_STORED
        };

        let record = DirectoryRecord {
            raw_name: spec.raw_name.to_vec(),
            flags,
            method,
            dos_time: spec.packed_date as u16,
            dos_date: (spec.packed_date >> 16) as u16,
            crc32: crypt.map_or(0, |(_, crc)| crc),
            compressed_size: 0,
            uncompressed_size: 0,
            local_header_offset: self.offset,
        };

        // Wide handles always reserve a Zip64 extra in the local header so
        // the true sizes can be patched in on close.
        let extra_len: u64 = if self.wide { 20 } else { 0 };
        let version: u16 = if self.wide {
            45
        } else if method == METHOD_DEFLATED {
            20
        } else {
            10
        };

        let mut header =
            Vec::with_capacity(LOCAL_HEADER_LEN as usize + spec.raw_name.len() + extra_len as usize);
        header.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
        header.extend_from_slice(&version.to_le_bytes());
        header.extend_from_slice(&flags.to_le_bytes());
        header.extend_from_slice(&method.to_le_bytes());
        header.extend_from_slice(&record.dos_time.to_le_bytes());
        header.extend_from_slice(&record.dos_date.to_le_bytes());
        header.extend_from_slice(&record.crc32.to_le_bytes());
        if self.wide {
            header.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes());
            header.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes());
        } else {
            header.extend_from_slice(&0u32.to_le_bytes());
            header.extend_from_slice(&0u32.to_le_bytes());
        }
        header.extend_from_slice(&(spec.raw_name.len() as u16).to_le_bytes());
        header.extend_from_slice(&(extra_len as u16).to_le_bytes());
        header.extend_from_slice(spec.raw_name);
        if self.wide {
            header.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
            header.extend_from_slice(&16u16.to_le_bytes());
            header.extend_from_slice(&0u64.to_le_bytes()); // uncompressed, patched
            header.extend_from_slice(&0u64.to_le_bytes()); // compressed, patched
        }

        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(&header)?;

        let mut state = WriteState {
            record,
            name_len: spec.raw_name.len() as u64,
            extra_len,
            compressor: spec
                .deflate_level
                .map(|level| Compress::new(Compression::new(level), false)),
            cipher: None,
            hasher: crc32fast::Hasher::new(),
            uncompressed: 0,
            compressed: 0,
            declared_crc: None,
        };

        if let Some((password, crc)) = crypt {
            let mut cipher = ZipCrypto::new(password);
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos() as u64)
                ^ self.offset.rotate_left(32);
            let crypt_header = cipher.crypt_header(crc, seed);
            self.file.write_all(&crypt_header)?;
            state.compressed += CRYPT_HEADER_LEN as u64;
            state.cipher = Some(cipher);
            state.declared_crc = Some(crc);
        }

        self.entry = Some(state);
        Ok(())
    }

    /// Append bytes to the open entry's payload.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let state = self.entry.as_mut().ok_or(CodecError::NoEntryOpen)?;
        state.hasher.update(buf);
        state.uncompressed += buf.len() as u64;

        match state.compressor.as_mut() {
            None => {
                let mut chunk = buf.to_vec();
                if let Some(cipher) = state.cipher.as_mut() {
                    cipher.encrypt_in_place(&mut chunk);
                }
                self.file.write_all(&chunk)?;
                state.compressed += chunk.len() as u64;
            }
            Some(compressor) => {
                let mut out = [0u8; OUTPUT_CHUNK];
                let mut pos = 0;
                while pos < buf.len() {
                    let before_in = compressor.total_in();
                    let before_out = compressor.total_out();
                    compressor
                        .compress(&buf[pos..], &mut out, FlushCompress::None)
                        .map_err(CodecError::deflate)?;
                    let consumed = (compressor.total_in() - before_in) as usize;
                    let produced = (compressor.total_out() - before_out) as usize;
                    pos += consumed;
                    if produced > 0 {
                        if let Some(cipher) = state.cipher.as_mut() {
                            cipher.encrypt_in_place(&mut out[..produced]);
                        }
                        self.file.write_all(&out[..produced])?;
                        state.compressed += produced as u64;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finish the open entry: flush the transform, patch the local header,
    /// and stage the central directory record.
    pub fn close_entry(&mut self) -> Result<()> {
        let mut state = self.entry.take().ok_or(CodecError::NoEntryOpen)?;

        if let Some(compressor) = state.compressor.as_mut() {
            let mut out = [0u8; OUTPUT_CHUNK];
            loop {
                let before_out = compressor.total_out();
                let status = compressor
                    .compress(&[], &mut out, FlushCompress::Finish)
                    .map_err(CodecError::deflate)?;
                let produced = (compressor.total_out() - before_out) as usize;
                if produced > 0 {
                    if let Some(cipher) = state.cipher.as_mut() {
                        cipher.encrypt_in_place(&mut out[..produced]);
                    }
                    self.file.write_all(&out[..produced])?;
                    state.compressed += produced as u64;
                }
                if status == Status::StreamEnd {
                    break;
                }
            }
        }

        let crc = match state.declared_crc {
            Some(declared) => declared,
            None => state.hasher.finalize(),
        };

        let header_offset = state.record.local_header_offset;
        if !self.wide {
            let limit = ZIP64_MARKER_32 as u64;
            if state.compressed >= limit || state.uncompressed >= limit {
                return Err(CodecError::SizeOverflow {
                    size: state.compressed.max(state.uncompressed),
                });
            }
        }

        // Patch CRC and sizes back into the local header.
        self.file.seek(SeekFrom::Start(header_offset + 14))?;
        self.file.write_all(&crc.to_le_bytes())?;
        if self.wide {
            self.file.write_all(&ZIP64_MARKER_32.to_le_bytes())?;
            self.file.write_all(&ZIP64_MARKER_32.to_le_bytes())?;
            let extra_payload = header_offset + LOCAL_HEADER_LEN + state.name_len + 4;
            self.file.seek(SeekFrom::Start(extra_payload))?;
            self.file.write_all(&state.uncompressed.to_le_bytes())?;
            self.file.write_all(&state.compressed.to_le_bytes())?;
        } else {
            self.file
                .write_all(&(state.compressed as u32).to_le_bytes())?;
            self.file
                .write_all(&(state.uncompressed as u32).to_le_bytes())?;
        }

        let end = header_offset + LOCAL_HEADER_LEN + state.name_len + state.extra_len + state.compressed;
        self.file.seek(SeekFrom::Start(end))?;
        self.offset = end;

        state.record.crc32 = crc;
        state.record.compressed_size = state.compressed;
        state.record.uncompressed_size = state.uncompressed;
        self.records.push(state.record);
        Ok(())
    }

    /// Write the central directory and end records, consuming the handle.
    pub fn close(mut self) -> Result<()> {
        if self.entry.is_some() {
            return Err(CodecError::EntryOpen);
        }

        let cd_offset = self.offset;
        self.file.seek(SeekFrom::Start(cd_offset))?;
        let mut cd_size = 0u64;
        for record in &self.records {
            cd_size += write_central_record(&mut self.file, record)?;
        }

        let count = self.records.len() as u64;
        let needs_zip64 = self.wide
            || count > ZIP64_MARKER_16 as u64
            || cd_size >= ZIP64_MARKER_32 as u64
            || cd_offset >= ZIP64_MARKER_32 as u64
            || self.records.iter().any(DirectoryRecord::needs_zip64);

        if needs_zip64 {
            let zip64_eocd_offset = cd_offset + cd_size;

            self.file
                .write_all(&ZIP64_END_OF_CENTRAL_DIR_SIG.to_le_bytes())?;
            self.file.write_all(&44u64.to_le_bytes())?; // record size
            self.file.write_all(&0x031Eu16.to_le_bytes())?; // version made by
            self.file.write_all(&45u16.to_le_bytes())?; // version needed
            self.file.write_all(&0u32.to_le_bytes())?; // this disk
            self.file.write_all(&0u32.to_le_bytes())?; // directory disk
            self.file.write_all(&count.to_le_bytes())?;
            self.file.write_all(&count.to_le_bytes())?;
            self.file.write_all(&cd_size.to_le_bytes())?;
            self.file.write_all(&cd_offset.to_le_bytes())?;

            self.file
                .write_all(&ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG.to_le_bytes())?;
            self.file.write_all(&0u32.to_le_bytes())?;
            self.file.write_all(&zip64_eocd_offset.to_le_bytes())?;
            self.file.write_all(&1u32.to_le_bytes())?;
        }

        let count_16 = if count > ZIP64_MARKER_16 as u64 {
            ZIP64_MARKER_16
        } else {
            count as u16
        };
        let clamp_32 = |value: u64| -> u32 {
            if value >= ZIP64_MARKER_32 as u64 {
                ZIP64_MARKER_32
            } else {
                value as u32
            }
        };

        self.file.write_all(&END_OF_CENTRAL_DIR_SIG.to_le_bytes())?;
        self.file.write_all(&0u16.to_le_bytes())?; // this disk
        self.file.write_all(&0u16.to_le_bytes())?; // directory disk
        self.file.write_all(&count_16.to_le_bytes())?;
        self.file.write_all(&count_16.to_le_bytes())?;
        self.file.write_all(&clamp_32(cd_size).to_le_bytes())?;
        self.file.write_all(&clamp_32(cd_offset).to_le_bytes())?;
        self.file.write_all(&0u16.to_le_bytes())?; // comment length

        self.file.flush()?;
        Ok(())
    }
}

//! Stateful read handle over an archive's central directory.
//!
//! A [`CodecReader`] materializes every directory record at open time and
//! exposes a single cursor over them, plus a streaming decompressor for the
//! entry the cursor points at. Only one entry may be open at a time; the
//! handle enforces that with a state error rather than silently multiplexing.

use crate::crypto::{CRYPT_HEADER_LEN, ZipCrypto, check_byte};
use crate::error::{CodecError, Result};
use crate::record::{
    DirectoryRecord, LOCAL_FILE_HEADER_SIG, METHOD_DEFLATED, METHOD_STORED, locate_directory,
    read_directory,
};
use flate2::{Decompress, FlushDecompress, Status};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const INPUT_CHUNK: usize = 8192;

#[derive(Debug)]
struct EntryState {
    /// None for stored entries.
    inflater: Option<Decompress>,
    cipher: Option<ZipCrypto>,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    /// Compressed bytes not yet pulled from the file.
    data_remaining: u64,
    expected_size: u64,
    expected_crc: u32,
    produced: u64,
    hasher: crc32fast::Hasher,
    finished: bool,
}

/// Read-mode codec handle: directory cursor plus per-entry streaming.
#[derive(Debug)]
pub struct CodecReader {
    file: File,
    records: Vec<DirectoryRecord>,
    legacy_count: u64,
    wide_count: u64,
    wide: bool,
    cursor: Option<usize>,
    entry: Option<EntryState>,
}

impl CodecReader {
    /// Open an archive for reading and materialize its central directory.
    pub fn open(path: &Path, wide: bool) -> Result<Self> {
        let mut file = File::open(path)?;
        let info = locate_directory(&mut file)?;
        let records = read_directory(&mut file, &info)?;
        Ok(Self {
            file,
            records,
            legacy_count: info.legacy_count,
            wide_count: info.wide_count,
            wide,
            cursor: None,
            entry: None,
        })
    }

    /// Directory record count, from the global info matching the handle's
    /// format selection: the Zip64 count for wide handles, the legacy
    /// 16-bit EOCD field otherwise.
    pub fn entry_count(&self) -> u64 {
        if self.wide {
            self.wide_count
        } else {
            self.legacy_count
        }
    }

    /// Position the cursor at the first directory record.
    ///
    /// An empty directory is a hard failure, not "no entries".
    pub fn goto_first(&mut self) -> Result<()> {
        if self.records.is_empty() {
            return Err(CodecError::EmptyDirectory);
        }
        self.cursor = Some(0);
        Ok(())
    }

    /// Advance the cursor. Returns `false` exactly at the end of the
    /// directory, leaving the cursor on the last record.
    pub fn goto_next(&mut self) -> Result<bool> {
        let index = self.cursor.ok_or(CodecError::NoCurrentRecord)?;
        if index + 1 < self.records.len() {
            self.cursor = Some(index + 1);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Position the cursor at the record whose stored name equals `raw`
    /// byte for byte. Returns `false`, cursor untouched, when absent.
    pub fn locate_raw(&mut self, raw: &[u8]) -> bool {
        match self.records.iter().position(|r| r.raw_name == raw) {
            Some(index) => {
                self.cursor = Some(index);
                true
            }
            None => false,
        }
    }

    /// The record under the cursor.
    pub fn current_record(&self) -> Result<&DirectoryRecord> {
        let index = self.cursor.ok_or(CodecError::NoCurrentRecord)?;
        Ok(&self.records[index])
    }

    /// Open the current entry's payload for streaming reads.
    ///
    /// For an encrypted entry with a password the 12-byte crypt header is
    /// consumed and its check byte verified. With the password omitted the
    /// ciphertext flows through untouched: reads fail late or return
    /// garbage, they are not rejected here.
    pub fn open_entry(&mut self, password: Option<&[u8]>) -> Result<()> {
        if self.entry.is_some() {
            return Err(CodecError::EntryOpen);
        }
        let index = self.cursor.ok_or(CodecError::NoCurrentRecord)?;
        let record = &self.records[index];

        if record.method != METHOD_STORED && record.method != METHOD_DEFLATED {
            return Err(CodecError::UnsupportedMethod {
                method: record.method,
            });
        }

        // The local header's name/extra lengths may differ from the central
        // record's; the payload offset comes from the local copy.
        self.file.seek(SeekFrom::Start(record.local_header_offset))?;
        let mut head = [0u8; 30];
        self.file.read_exact(&mut head)?;
        let signature = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
        if signature != LOCAL_FILE_HEADER_SIG {
            return Err(CodecError::bad_archive(format!(
                "bad local header signature {signature:#010x}"
            )));
        }
        let name_len = u16::from_le_bytes([head[26], head[27]]);
        let extra_len = u16::from_le_bytes([head[28], head[29]]);
        self.file
            .seek(SeekFrom::Current(name_len as i64 + extra_len as i64))?;

        let mut data_remaining = record.compressed_size;
        let mut cipher = None;
        if record.is_encrypted() {
            if let Some(password) = password {
                if data_remaining < CRYPT_HEADER_LEN as u64 {
                    return Err(CodecError::bad_archive(
                        "encrypted entry shorter than its crypt header",
                    ));
                }
                let mut keys = ZipCrypto::new(password);
                let mut header = [0u8; CRYPT_HEADER_LEN];
                self.file.read_exact(&mut header)?;
                keys.decrypt_in_place(&mut header);
                if header[CRYPT_HEADER_LEN - 1] != check_byte(record.crc32) {
                    return Err(CodecError::BadPassword);
                }
                data_remaining -= CRYPT_HEADER_LEN as u64;
                cipher = Some(keys);
            }
        }

        let inflater = (record.method == METHOD_DEFLATED).then(|| Decompress::new(false));

        self.entry = Some(EntryState {
            inflater,
            cipher,
            in_buf: vec![0u8; INPUT_CHUNK],
            in_pos: 0,
            in_len: 0,
            data_remaining,
            expected_size: record.uncompressed_size,
            expected_crc: record.crc32,
            produced: 0,
            hasher: crc32fast::Hasher::new(),
            finished: false,
        });
        Ok(())
    }

    /// Read decompressed bytes from the open entry into `buf`.
    ///
    /// Returns 0 exactly at the end of the entry.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let state = self.entry.as_mut().ok_or(CodecError::NoEntryOpen)?;
        if buf.is_empty() || state.finished || state.produced >= state.expected_size {
            return Ok(0);
        }

        match state.inflater.as_mut() {
            None => {
                // Stored payload: a straight, possibly decrypted, copy.
                let want = (state.expected_size - state.produced)
                    .min(state.data_remaining)
                    .min(buf.len() as u64) as usize;
                if want == 0 {
                    state.finished = true;
                    return Ok(0);
                }
                self.file.read_exact(&mut buf[..want])?;
                if let Some(cipher) = state.cipher.as_mut() {
                    cipher.decrypt_in_place(&mut buf[..want]);
                }
                state.data_remaining -= want as u64;
                state.hasher.update(&buf[..want]);
                state.produced += want as u64;
                Ok(want)
            }
            Some(inflater) => loop {
                if state.in_pos == state.in_len && state.data_remaining > 0 {
                    let take = (state.in_buf.len() as u64).min(state.data_remaining) as usize;
                    self.file.read_exact(&mut state.in_buf[..take])?;
                    if let Some(cipher) = state.cipher.as_mut() {
                        cipher.decrypt_in_place(&mut state.in_buf[..take]);
                    }
                    state.in_pos = 0;
                    state.in_len = take;
                    state.data_remaining -= take as u64;
                }

                let exhausted = state.in_pos == state.in_len && state.data_remaining == 0;
                let flush = if exhausted {
                    FlushDecompress::Finish
                } else {
                    FlushDecompress::None
                };
                let before_in = inflater.total_in();
                let before_out = inflater.total_out();
                let status = inflater
                    .decompress(&state.in_buf[state.in_pos..state.in_len], buf, flush)
                    .map_err(CodecError::deflate)?;
                let consumed = (inflater.total_in() - before_in) as usize;
                let written = (inflater.total_out() - before_out) as usize;
                state.in_pos += consumed;

                if written > 0 {
                    state.hasher.update(&buf[..written]);
                    state.produced += written as u64;
                    if status == Status::StreamEnd {
                        state.finished = true;
                    }
                    return Ok(written);
                }
                match status {
                    Status::StreamEnd => {
                        state.finished = true;
                        return Ok(0);
                    }
                    _ if exhausted => {
                        return Err(CodecError::bad_archive("truncated deflate stream"));
                    }
                    _ => {}
                }
            },
        }
    }

    /// Close the open entry, validating the CRC-32 when the payload was
    /// consumed in full. Safe after partial consumption: validation is
    /// skipped.
    pub fn close_entry(&mut self) -> Result<()> {
        let state = self.entry.take().ok_or(CodecError::NoEntryOpen)?;
        if state.produced == state.expected_size {
            let computed = state.hasher.finalize();
            if computed != state.expected_crc {
                return Err(CodecError::CrcMismatch {
                    stored: state.expected_crc,
                    computed,
                });
            }
        }
        Ok(())
    }

    /// Release the handle.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

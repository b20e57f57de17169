//! Central directory records and the on-disk structures around them.
//!
//! The codec keeps one [`DirectoryRecord`] per archive member, reconciling
//! the legacy 32-bit size/offset fields with the Zip64 extended information
//! extra field so the rest of the crate only ever sees 64-bit values. Names
//! are kept as raw bytes; the format does not guarantee any encoding.

use crate::error::{CodecError, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// ZIP local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// ZIP central directory header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// ZIP end of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// ZIP64 end of central directory signature.
pub const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x06064B50;

/// ZIP64 end of central directory locator signature.
pub const ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG: u32 = 0x07064B50;

/// ZIP64 extended information extra field header ID.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Marker value signalling "look in the Zip64 extra" for 32-bit fields.
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Marker value signalling "look in the Zip64 record" for 16-bit fields.
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// General-purpose flag bit 0: entry payload is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Compression method 0: stored without transformation.
pub const METHOD_STORED: u16 = 0;

/// Compression method 8: raw deflate.
pub const METHOD_DEFLATED: u16 = 8;

/// Fixed size of a local file header, before name and extra field.
pub const LOCAL_HEADER_LEN: u64 = 30;

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn u64_at(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// One central directory record, sizes and offset already widened to 64 bits.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    /// Entry name as stored, without any decoding applied.
    pub raw_name: Vec<u8>,
    /// General-purpose bit flags.
    pub flags: u16,
    /// Compression method identifier.
    pub method: u16,
    /// Packed DOS modification time.
    pub dos_time: u16,
    /// Packed DOS modification date.
    pub dos_date: u16,
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
    /// Compressed payload size (including the crypt header when encrypted).
    pub compressed_size: u64,
    /// Uncompressed payload size.
    pub uncompressed_size: u64,
    /// Offset of the entry's local file header from the start of the file.
    pub local_header_offset: u64,
}

impl DirectoryRecord {
    /// Whether flag bit 0 marks this entry as encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// The packed date/time word: DOS date in the high half, time in the low.
    pub fn packed_date(&self) -> u32 {
        ((self.dos_date as u32) << 16) | self.dos_time as u32
    }

    /// Whether any field of this record overflows the legacy 32-bit layout.
    pub fn needs_zip64(&self) -> bool {
        self.compressed_size >= ZIP64_MARKER_32 as u64
            || self.uncompressed_size >= ZIP64_MARKER_32 as u64
            || self.local_header_offset >= ZIP64_MARKER_32 as u64
    }

    fn version_needed(&self) -> u16 {
        if self.needs_zip64() {
            45
        } else if self.method == METHOD_DEFLATED {
            20
        } else {
            10
        }
    }
}

/// Parse a Zip64 extended information extra field.
///
/// Each component is present only when the corresponding 32-bit header field
/// holds the marker value, in the fixed order uncompressed size, compressed
/// size, local header offset.
pub fn parse_zip64_extra(
    extra: &[u8],
    uncompressed_32: u32,
    compressed_32: u32,
    offset_32: u32,
) -> (Option<u64>, Option<u64>, Option<u64>) {
    let mut at = 0;
    while at + 4 <= extra.len() {
        let header_id = u16_at(extra, at);
        let data_size = u16_at(extra, at + 2) as usize;
        at += 4;

        if header_id == ZIP64_EXTRA_FIELD_ID && at + data_size <= extra.len() {
            let end = at + data_size;
            let mut field = at;
            let mut take = |wanted: bool| {
                if wanted && field + 8 <= end {
                    let value = u64_at(extra, field);
                    field += 8;
                    Some(value)
                } else {
                    None
                }
            };
            let uncompressed = take(uncompressed_32 == ZIP64_MARKER_32);
            let compressed = take(compressed_32 == ZIP64_MARKER_32);
            let offset = take(offset_32 == ZIP64_MARKER_32);
            return (uncompressed, compressed, offset);
        }

        at += data_size;
    }

    (None, None, None)
}

/// Read one central directory record at the reader's current position.
pub fn read_central_record<R: Read>(reader: &mut R) -> Result<DirectoryRecord> {
    let mut buf = [0u8; 46];
    reader.read_exact(&mut buf)?;

    let signature = u32_at(&buf, 0);
    if signature != CENTRAL_DIR_HEADER_SIG {
        return Err(CodecError::bad_archive(format!(
            "bad central directory signature {signature:#010x}"
        )));
    }

    let flags = u16_at(&buf, 8);
    let method = u16_at(&buf, 10);
    let dos_time = u16_at(&buf, 12);
    let dos_date = u16_at(&buf, 14);
    let crc32 = u32_at(&buf, 16);
    let compressed_32 = u32_at(&buf, 20);
    let uncompressed_32 = u32_at(&buf, 24);
    let name_len = u16_at(&buf, 28) as usize;
    let extra_len = u16_at(&buf, 30) as usize;
    let comment_len = u16_at(&buf, 32) as usize;
    let offset_32 = u32_at(&buf, 42);

    let mut raw_name = vec![0u8; name_len];
    reader.read_exact(&mut raw_name)?;

    let mut extra = vec![0u8; extra_len];
    reader.read_exact(&mut extra)?;

    // The comment is not part of this codec's surface.
    let mut comment = vec![0u8; comment_len];
    reader.read_exact(&mut comment)?;

    let (uncompressed_64, compressed_64, offset_64) =
        parse_zip64_extra(&extra, uncompressed_32, compressed_32, offset_32);

    Ok(DirectoryRecord {
        raw_name,
        flags,
        method,
        dos_time,
        dos_date,
        crc32,
        compressed_size: compressed_64.unwrap_or(compressed_32 as u64),
        uncompressed_size: uncompressed_64.unwrap_or(uncompressed_32 as u64),
        local_header_offset: offset_64.unwrap_or(offset_32 as u64),
    })
}

fn build_zip64_extra(record: &DirectoryRecord) -> Vec<u8> {
    if !record.needs_zip64() {
        return Vec::new();
    }

    let mut payload = Vec::with_capacity(24);
    if record.uncompressed_size >= ZIP64_MARKER_32 as u64 {
        payload.extend_from_slice(&record.uncompressed_size.to_le_bytes());
    }
    if record.compressed_size >= ZIP64_MARKER_32 as u64 {
        payload.extend_from_slice(&record.compressed_size.to_le_bytes());
    }
    if record.local_header_offset >= ZIP64_MARKER_32 as u64 {
        payload.extend_from_slice(&record.local_header_offset.to_le_bytes());
    }

    let mut extra = Vec::with_capacity(4 + payload.len());
    extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
    extra.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    extra.extend_from_slice(&payload);
    extra
}

fn clamp_32(value: u64) -> u32 {
    if value >= ZIP64_MARKER_32 as u64 {
        ZIP64_MARKER_32
    } else {
        value as u32
    }
}

/// Write one central directory record, returning the bytes written.
pub fn write_central_record<W: Write>(writer: &mut W, record: &DirectoryRecord) -> Result<u64> {
    let zip64_extra = build_zip64_extra(record);

    writer.write_all(&CENTRAL_DIR_HEADER_SIG.to_le_bytes())?;
    writer.write_all(&0x031Eu16.to_le_bytes())?; // version made by: Unix, 3.0
    writer.write_all(&record.version_needed().to_le_bytes())?;
    writer.write_all(&record.flags.to_le_bytes())?;
    writer.write_all(&record.method.to_le_bytes())?;
    writer.write_all(&record.dos_time.to_le_bytes())?;
    writer.write_all(&record.dos_date.to_le_bytes())?;
    writer.write_all(&record.crc32.to_le_bytes())?;
    writer.write_all(&clamp_32(record.compressed_size).to_le_bytes())?;
    writer.write_all(&clamp_32(record.uncompressed_size).to_le_bytes())?;
    writer.write_all(&(record.raw_name.len() as u16).to_le_bytes())?;
    writer.write_all(&(zip64_extra.len() as u16).to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // comment length
    writer.write_all(&0u16.to_le_bytes())?; // disk number start
    writer.write_all(&0u16.to_le_bytes())?; // internal attributes
    writer.write_all(&(0o100644u32 << 16).to_le_bytes())?; // external attributes
    writer.write_all(&clamp_32(record.local_header_offset).to_le_bytes())?;
    writer.write_all(&record.raw_name)?;
    writer.write_all(&zip64_extra)?;

    Ok(46 + record.raw_name.len() as u64 + zip64_extra.len() as u64)
}

/// Location and counts of the central directory.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryInfo {
    /// Offset of the first central directory record.
    pub cd_offset: u64,
    /// Total size of the central directory in bytes.
    pub cd_size: u64,
    /// Record count as reported by the legacy 16-bit EOCD field.
    pub legacy_count: u64,
    /// Record count as reported by the Zip64 EOCD, falling back to legacy.
    pub wide_count: u64,
}

/// Find the end-of-central-directory record and, when present, the Zip64
/// variant behind its locator.
pub fn locate_directory<R: Read + Seek>(reader: &mut R) -> Result<DirectoryInfo> {
    let file_size = reader.seek(SeekFrom::End(0))?;

    // The EOCD sits within the trailing comment span (max 65535) plus itself.
    let search_start = file_size.saturating_sub(65535 + 22);
    reader.seek(SeekFrom::Start(search_start))?;
    let mut tail = vec![0u8; (file_size - search_start) as usize];
    reader.read_exact(&mut tail)?;

    let eocd_sig = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
    let eocd_at = tail
        .windows(4)
        .rposition(|w| w == eocd_sig)
        .ok_or_else(|| CodecError::bad_archive("end of central directory not found"))?;
    let eocd = &tail[eocd_at..];
    if eocd.len() < 22 {
        return Err(CodecError::bad_archive("end of central directory truncated"));
    }

    let legacy_count = u16_at(eocd, 10) as u64;
    let mut info = DirectoryInfo {
        cd_offset: u32_at(eocd, 16) as u64,
        cd_size: u32_at(eocd, 12) as u64,
        legacy_count,
        wide_count: legacy_count,
    };

    // A Zip64 EOCD locator, when present, sits immediately before the EOCD.
    let eocd_pos = search_start + eocd_at as u64;
    if eocd_pos >= 20 {
        reader.seek(SeekFrom::Start(eocd_pos - 20))?;
        let mut locator = [0u8; 20];
        reader.read_exact(&mut locator)?;
        if u32_at(&locator, 0) == ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG {
            let zip64_eocd_offset = u64_at(&locator, 8);
            reader.seek(SeekFrom::Start(zip64_eocd_offset))?;
            let mut zip64 = [0u8; 56];
            reader.read_exact(&mut zip64)?;
            if u32_at(&zip64, 0) != ZIP64_END_OF_CENTRAL_DIR_SIG {
                return Err(CodecError::bad_archive("bad Zip64 EOCD signature"));
            }
            info.wide_count = u64_at(&zip64, 32);
            info.cd_size = u64_at(&zip64, 40);
            info.cd_offset = u64_at(&zip64, 48);
        }
    }

    Ok(info)
}

/// Read all central directory records described by `info`.
pub fn read_directory<R: Read + Seek>(
    reader: &mut R,
    info: &DirectoryInfo,
) -> Result<Vec<DirectoryRecord>> {
    reader.seek(SeekFrom::Start(info.cd_offset))?;
    let mut records = Vec::with_capacity(info.wide_count as usize);
    for _ in 0..info.wide_count {
        records.push(read_central_record(reader)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_record() -> DirectoryRecord {
        DirectoryRecord {
            raw_name: b"dir/file.txt".to_vec(),
            flags: 0,
            method: METHOD_DEFLATED,
            dos_time: 0x6B20,
            dos_date: 0x5A21,
            crc32: 0xCAFEBABE,
            compressed_size: 120,
            uncompressed_size: 300,
            local_header_offset: 64,
        }
    }

    #[test]
    fn test_central_record_roundtrip() {
        let record = sample_record();
        let mut buf = Vec::new();
        let written = write_central_record(&mut buf, &record).unwrap();
        assert_eq!(written as usize, buf.len());

        let parsed = read_central_record(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed.raw_name, record.raw_name);
        assert_eq!(parsed.method, record.method);
        assert_eq!(parsed.crc32, record.crc32);
        assert_eq!(parsed.compressed_size, record.compressed_size);
        assert_eq!(parsed.uncompressed_size, record.uncompressed_size);
        assert_eq!(parsed.local_header_offset, record.local_header_offset);
    }

    #[test]
    fn test_central_record_roundtrip_zip64() {
        let mut record = sample_record();
        record.uncompressed_size = 0x1_2345_6789;
        record.compressed_size = 0x1_0000_0001;
        record.local_header_offset = 0x2_0000_0000;
        assert!(record.needs_zip64());

        let mut buf = Vec::new();
        write_central_record(&mut buf, &record).unwrap();

        let parsed = read_central_record(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed.uncompressed_size, 0x1_2345_6789);
        assert_eq!(parsed.compressed_size, 0x1_0000_0001);
        assert_eq!(parsed.local_header_offset, 0x2_0000_0000);
    }

    #[test]
    fn test_parse_zip64_extra_partial() {
        // Only the uncompressed size carries the marker.
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&0x1_0000_0000u64.to_le_bytes());

        let (uncompressed, compressed, offset) =
            parse_zip64_extra(&extra, ZIP64_MARKER_32, 500, 900);
        assert_eq!(uncompressed, Some(0x1_0000_0000));
        assert_eq!(compressed, None);
        assert_eq!(offset, None);
    }

    #[test]
    fn test_parse_zip64_extra_no_marker() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&1u64.to_le_bytes());
        extra.extend_from_slice(&2u64.to_le_bytes());

        let parsed = parse_zip64_extra(&extra, 1000, 500, 0);
        assert_eq!(parsed, (None, None, None));
    }

    #[test]
    fn test_parse_zip64_extra_skips_foreign_fields() {
        let mut extra = Vec::new();
        // An unrelated extra field first.
        extra.extend_from_slice(&0x7075u16.to_le_bytes());
        extra.extend_from_slice(&3u16.to_le_bytes());
        extra.extend_from_slice(&[1, 2, 3]);
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&0xABCDu64.to_le_bytes());

        let (uncompressed, _, _) = parse_zip64_extra(&extra, ZIP64_MARKER_32, 0, 0);
        assert_eq!(uncompressed, Some(0xABCD));
    }

    #[test]
    fn test_bad_central_signature() {
        let buf = [0u8; 46];
        let err = read_central_record(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CodecError::BadArchive { .. }));
    }

    #[test]
    fn test_packed_date_layout() {
        let record = sample_record();
        assert_eq!(record.packed_date(), 0x5A21_6B20);
    }
}

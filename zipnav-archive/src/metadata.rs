//! Entry metadata snapshots and the compression-level mapping.

use std::time::SystemTime;
use zipnav_codec::record::{DirectoryRecord, METHOD_STORED};
use zipnav_codec::dostime;

/// Compression level of an archive entry.
///
/// For deflated entries the level is carried by bits 1..=2 of the
/// general-purpose flags; a stored entry is always `None` regardless of
/// what those bits hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Stored without compression.
    None,
    /// Deflate, favoring speed.
    Fastest,
    /// Deflate at the default effort.
    Default,
    /// Deflate at maximum effort.
    Best,
}

impl CompressionLevel {
    /// Derive the level from a directory record's method and flag bits.
    ///
    /// The bit-pair mapping is fixed by the format for the deflate method:
    /// `00` default, `01` best, anything else fastest.
    pub fn from_record(method: u16, flags: u16) -> Self {
        if method == METHOD_STORED {
            return Self::None;
        }
        match (flags >> 1) & 0b11 {
            0b00 => Self::Default,
            0b01 => Self::Best,
            _ => Self::Fastest,
        }
    }

    /// The deflate effort to request, or `None` for a stored entry.
    pub(crate) fn deflate_level(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Fastest => Some(1),
            Self::Default => Some(6),
            Self::Best => Some(9),
        }
    }

    /// The flag bit-pair announcing this level, pre-shifted into place.
    pub(crate) fn flag_bits(self) -> u16 {
        match self {
            Self::None | Self::Default => 0,
            Self::Best => 0b01 << 1,
            Self::Fastest => 0b10 << 1,
        }
    }
}

/// Immutable snapshot of one directory record.
///
/// Fields are copied verbatim from the record; a corrupt record's garbage
/// values pass through without validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Decoded entry name.
    pub name: String,
    /// Uncompressed payload size in bytes.
    pub uncompressed_size: u64,
    /// Compressed payload size in bytes.
    pub compressed_size: u64,
    /// Compression level derived from method and flags.
    pub level: CompressionLevel,
    /// Whether the payload is encrypted.
    pub encrypted: bool,
    /// Modification time from the packed DOS date field.
    pub modified: SystemTime,
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
}

impl EntryMetadata {
    pub(crate) fn from_record(name: String, record: &DirectoryRecord) -> Self {
        Self {
            name,
            uncompressed_size: record.uncompressed_size,
            compressed_size: record.compressed_size,
            level: CompressionLevel::from_record(record.method, record.flags),
            encrypted: record.is_encrypted(),
            modified: dostime::from_packed(record.packed_date()),
            crc32: record.crc32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipnav_codec::record::METHOD_DEFLATED;

    #[test]
    fn test_level_bit_pair_mapping() {
        assert_eq!(
            CompressionLevel::from_record(METHOD_DEFLATED, 0b000),
            CompressionLevel::Default
        );
        assert_eq!(
            CompressionLevel::from_record(METHOD_DEFLATED, 0b010),
            CompressionLevel::Best
        );
        assert_eq!(
            CompressionLevel::from_record(METHOD_DEFLATED, 0b100),
            CompressionLevel::Fastest
        );
        assert_eq!(
            CompressionLevel::from_record(METHOD_DEFLATED, 0b110),
            CompressionLevel::Fastest
        );
    }

    #[test]
    fn test_stored_method_wins_over_flag_bits() {
        assert_eq!(
            CompressionLevel::from_record(METHOD_STORED, 0b110),
            CompressionLevel::None
        );
    }

    #[test]
    fn test_flag_bits_roundtrip() {
        for level in [
            CompressionLevel::Fastest,
            CompressionLevel::Default,
            CompressionLevel::Best,
        ] {
            let flags = level.flag_bits();
            assert_eq!(CompressionLevel::from_record(METHOD_DEFLATED, flags), level);
        }
    }
}

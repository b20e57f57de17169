//! Error types and native status codes for codec operations.
//!
//! Every codec failure maps to one of a small set of native status codes,
//! following the classic ZIP codec convention of negative integers. The
//! layer above reports these codes verbatim in its own errors.

use std::io;
use thiserror::Error;

/// Native status codes returned by the codec.
pub mod status {
    /// Operation completed.
    pub const OK: i32 = 0;
    /// Underlying I/O failure.
    pub const IO: i32 = -1;
    /// The cursor ran past the last directory record.
    pub const END_OF_LIST: i32 = -100;
    /// A parameter violated the codec's contract.
    pub const PARAM: i32 = -102;
    /// The file is not a well-formed ZIP archive.
    pub const BAD_ARCHIVE: i32 = -103;
    /// The handle was driven through an invalid state transition.
    pub const INTERNAL: i32 = -104;
    /// Stored and computed CRC-32 disagree.
    pub const CRC: i32 = -105;
    /// The crypt header check byte rejected the supplied password.
    pub const BAD_PASSWORD: i32 = -106;
}

/// The error type for low-level codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive structure is malformed.
    #[error("malformed archive: {message}")]
    BadArchive {
        /// Description of the malformation.
        message: String,
    },

    /// The central directory holds no records.
    #[error("archive directory is empty")]
    EmptyDirectory,

    /// A cursor operation ran without a positioned cursor.
    #[error("no directory record is selected")]
    NoCurrentRecord,

    /// A second entry was opened while one is still open.
    #[error("an entry is already open on this handle")]
    EntryOpen,

    /// An entry stream operation ran without an open entry.
    #[error("no entry is open on this handle")]
    NoEntryOpen,

    /// A parameter violated the codec contract.
    #[error("invalid parameter: {message}")]
    Param {
        /// Description of the violation.
        message: String,
    },

    /// The entry uses a compression method this codec does not implement.
    #[error("unsupported compression method {method}")]
    UnsupportedMethod {
        /// The raw method identifier from the directory record.
        method: u16,
    },

    /// The raw-deflate transform failed.
    #[error("deflate error: {message}")]
    Deflate {
        /// Description reported by the transform.
        message: String,
    },

    /// Stored and computed CRC-32 disagree after full consumption.
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// CRC-32 recorded in the directory.
        stored: u32,
        /// CRC-32 computed over the decompressed bytes.
        computed: u32,
    },

    /// An entry outgrew the legacy 32-bit size fields.
    #[error("entry size {size} exceeds the legacy 32-bit format")]
    SizeOverflow {
        /// The offending size or offset.
        size: u64,
    },

    /// The crypt header check byte did not match the stored CRC.
    #[error("password check byte mismatch")]
    BadPassword,
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create a malformed-archive error.
    pub fn bad_archive(message: impl Into<String>) -> Self {
        Self::BadArchive {
            message: message.into(),
        }
    }

    /// Create a parameter error.
    pub fn param(message: impl Into<String>) -> Self {
        Self::Param {
            message: message.into(),
        }
    }

    /// Create a deflate transform error.
    pub fn deflate(message: impl std::fmt::Display) -> Self {
        Self::Deflate {
            message: message.to_string(),
        }
    }

    /// The native status code carried by this error.
    pub fn status(&self) -> i32 {
        match self {
            Self::Io(_) => status::IO,
            Self::BadArchive { .. } | Self::EmptyDirectory | Self::Deflate { .. } => {
                status::BAD_ARCHIVE
            }
            Self::NoCurrentRecord | Self::EntryOpen | Self::NoEntryOpen => status::INTERNAL,
            Self::Param { .. } | Self::UnsupportedMethod { .. } | Self::SizeOverflow { .. } => {
                status::PARAM
            }
            Self::CrcMismatch { .. } => status::CRC,
            Self::BadPassword => status::BAD_PASSWORD,
        }
    }
}

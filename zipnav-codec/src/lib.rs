//! # ZipNav Codec
//!
//! Low-level stateful ZIP codec underpinning the `zipnav-archive` crate.
//!
//! The codec exposes two handle types over a ZIP file on disk:
//!
//! - [`CodecReader`]: materializes the central directory, runs a cursor over
//!   its records, and streams one entry's decompressed payload at a time
//! - [`CodecWriter`]: appends entries (stored or raw deflate, optionally
//!   under traditional encryption) and writes the central directory and end
//!   records on close
//!
//! Sizes and offsets are 64-bit throughout; the legacy 32-bit on-disk fields
//! and the Zip64 extended information extra field are reconciled at the
//! record layer. Entry names are raw bytes with no encoding applied.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zipnav_codec::CodecReader;
//! use std::path::Path;
//!
//! let mut reader = CodecReader::open(Path::new("archive.zip"), false).unwrap();
//! reader.goto_first().unwrap();
//! loop {
//!     let record = reader.current_record().unwrap();
//!     println!("{} bytes", record.uncompressed_size);
//!     if !reader.goto_next().unwrap() {
//!         break;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod dostime;
pub mod error;
pub mod record;
pub mod reader;
pub mod writer;

// Re-exports
pub use crypto::{CRYPT_HEADER_LEN, ZipCrypto};
pub use error::{CodecError, Result, status};
pub use reader::CodecReader;
pub use record::{DirectoryInfo, DirectoryRecord};
pub use writer::{CodecWriter, EntryWriteSpec};

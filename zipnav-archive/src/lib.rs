//! # ZipNav Archive
//!
//! Cursor-based navigation and entry streaming over ZIP archives.
//!
//! This crate sits on top of the `zipnav-codec` crate and exposes the
//! caller-facing model:
//!
//! - [`Archive`]: an open archive in a mode fixed at construction, either
//!   [`ReadArchive`] or [`WriteArchive`]
//! - [`EntryMetadata`]: an immutable snapshot of one directory record, with
//!   the name decoded and the compression level derived from the flag bits
//! - [`EntryReader`] / [`EntryWriter`]: sequential streams over one entry's
//!   payload, mutably borrowing the archive while they live
//!
//! Entry names are decoded UTF-8 first and windows-1252 otherwise; a full
//! [`ReadArchive::list_all`] retains each decoded name's original bytes so
//! [`ReadArchive::locate`] can find legacy-encoded entries byte-exactly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zipnav_archive::{Archive, OpenMode};
//! use std::path::Path;
//!
//! let archive = Archive::open(Path::new("data.zip"), OpenMode::Read, false).unwrap();
//! let Archive::Read(mut archive) = archive else { unreachable!() };
//! for entry in archive.list_all().unwrap() {
//!     println!("{} ({} bytes)", entry.name, entry.uncompressed_size);
//! }
//! archive.close().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod error;
pub mod metadata;
pub mod names;
pub mod stream;

// Re-exports
pub use archive::{Archive, EntryEncryption, OpenMode, ReadArchive, WriteArchive};
pub use error::{ArchiveError, Result};
pub use metadata::{CompressionLevel, EntryMetadata};
pub use names::decode_name;
pub use stream::{EntryReader, EntryWriter};

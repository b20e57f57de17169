//! The archive layer's error taxonomy.
//!
//! Every failure names the archive path, the attempted operation or entry,
//! and the native status code reported by the codec. End-of-directory and
//! name-not-found are boolean results on the navigation API, never errors.

use std::path::Path;
use thiserror::Error;
use zipnav_codec::CodecError;

/// The error type for archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("cannot open archive {path}: {source}")]
    NoSuchFile {
        /// Path of the archive file.
        path: String,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// A cursor operation failed for a reason other than end of directory.
    #[error("navigation failure in {path} during {operation} (status {status}): {source}")]
    Navigation {
        /// Path of the archive file.
        path: String,
        /// The navigation operation that failed.
        operation: &'static str,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Directory record metadata could not be fetched.
    #[error("cannot fetch entry metadata from {path} (status {status}): {source}")]
    Info {
        /// Path of the archive file.
        path: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// An entry stream could not be opened.
    #[error("cannot open entry '{entry}' in {path} (status {status}): {source}")]
    OpenEntry {
        /// Path of the archive file.
        path: String,
        /// Name of the entry involved.
        entry: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Reading from an entry stream failed.
    #[error("read failure on entry '{entry}' in {path} (status {status}): {source}")]
    Read {
        /// Path of the archive file.
        path: String,
        /// Name of the entry involved.
        entry: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Writing to an entry stream failed.
    #[error("write failure on entry '{entry}' in {path} (status {status}): {source}")]
    Write {
        /// Path of the archive file.
        path: String,
        /// Name of the entry involved.
        entry: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Finalizing an entry stream failed.
    #[error("cannot close entry '{entry}' in {path} (status {status}): {source}")]
    CloseEntry {
        /// Path of the archive file.
        path: String,
        /// Name of the entry involved.
        entry: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Finalizing the archive failed.
    #[error("cannot close archive {path} (status {status}): {source}")]
    CloseArchive {
        /// Path of the archive file.
        path: String,
        /// Native codec status code.
        status: i32,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    pub(crate) fn no_such_file(path: &Path, source: CodecError) -> Self {
        Self::NoSuchFile {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn navigation(path: &Path, operation: &'static str, source: CodecError) -> Self {
        Self::Navigation {
            path: path.display().to_string(),
            operation,
            status: source.status(),
            source,
        }
    }

    pub(crate) fn info(path: &Path, source: CodecError) -> Self {
        Self::Info {
            path: path.display().to_string(),
            status: source.status(),
            source,
        }
    }

    pub(crate) fn open_entry(path: &Path, entry: &str, source: CodecError) -> Self {
        Self::OpenEntry {
            path: path.display().to_string(),
            entry: entry.to_string(),
            status: source.status(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, entry: &str, source: CodecError) -> Self {
        Self::Read {
            path: path.display().to_string(),
            entry: entry.to_string(),
            status: source.status(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, entry: &str, source: CodecError) -> Self {
        Self::Write {
            path: path.display().to_string(),
            entry: entry.to_string(),
            status: source.status(),
            source,
        }
    }

    pub(crate) fn close_entry(path: &Path, entry: &str, source: CodecError) -> Self {
        Self::CloseEntry {
            path: path.display().to_string(),
            entry: entry.to_string(),
            status: source.status(),
            source,
        }
    }

    pub(crate) fn close_archive(path: &Path, source: CodecError) -> Self {
        Self::CloseArchive {
            path: path.display().to_string(),
            status: source.status(),
            source,
        }
    }

    /// The native codec status code carried by this error.
    pub fn status(&self) -> i32 {
        match self {
            Self::NoSuchFile { source, .. } => source.status(),
            Self::Navigation { status, .. }
            | Self::Info { status, .. }
            | Self::OpenEntry { status, .. }
            | Self::Read { status, .. }
            | Self::Write { status, .. }
            | Self::CloseEntry { status, .. }
            | Self::CloseArchive { status, .. } => *status,
        }
    }
}

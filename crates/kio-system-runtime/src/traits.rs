/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types for the storage abstraction.
 *
 * This abstraction allows package readers to run against different storage:
 * - NativeRuntime: the real on-disk filesystem using std
 * - MemoryRuntime: an in-memory tree for deterministic, disk-free tests
 */

use std::io;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// File contents could not be decoded
    InvalidData {
        /// File whose contents were rejected
        path: PathBuf,
        /// Decoder message
        message: String,
    },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::InvalidData { path, message } => {
                write!(f, "Invalid data in {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            RuntimeError::InvalidData { .. } => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

impl RuntimeError {
    /// Whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Anything else (sockets, fifos, devices)
    Other,
}

/// Metadata about a file or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathMetadata {
    /// Type of path (file, directory, other), after following a symlink
    pub kind: PathKind,
    /// Whether the path itself is a symbolic link
    pub symlink: bool,
}

/// Read-only storage operations needed to load a package.
///
/// Implementations provide the actual storage interaction, so the walker and
/// loader never touch `std::fs` directly. All operations take `&self`: the
/// storage is treated as a shared, read-only resource and may be used from
/// several threads at once.
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| RuntimeError::InvalidData {
            path: path.to_path_buf(),
            message: format!("invalid UTF-8: {}", e),
        })
    }

    /// Get file/directory metadata.
    ///
    /// A symlink reports the kind of its target and sets `symlink`; a
    /// dangling link is not found.
    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata>;

    // ═══════════════════════════════════════════════════════════════════════
    // DIRECTORY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// List directory entries (excluding . and ..).
    ///
    /// Entries are returned as full paths (the directory joined with the
    /// entry name), in no particular order.
    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>>;
}

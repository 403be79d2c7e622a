/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime implementation backed by the on-disk filesystem.
 */

use std::fs;
use std::path::{Path, PathBuf};

use crate::traits::{PathKind, PathMetadata, RuntimeResult, SystemRuntime};

/// Runtime with full read access to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a new NativeRuntime.
    pub fn new() -> Self {
        Self
    }
}

fn kind_of(file_type: fs::FileType) -> PathKind {
    if file_type.is_file() {
        PathKind::File
    } else if file_type.is_dir() {
        PathKind::Directory
    } else {
        PathKind::Other
    }
}

impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata> {
        let metadata = fs::symlink_metadata(path)?;
        if !metadata.file_type().is_symlink() {
            return Ok(PathMetadata {
                kind: kind_of(metadata.file_type()),
                symlink: false,
            });
        }
        let target = fs::metadata(path)?;
        Ok(PathMetadata {
            kind: kind_of(target.file_type()),
            symlink: true,
        })
    }

    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        tracing::trace!(dir = %path.display(), count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_list() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "a: b\n").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let rt = NativeRuntime::new();
        assert_eq!(rt.file_read(&temp.path().join("a.yaml")).unwrap(), b"a: b\n");

        let mut listed = rt.dir_list(temp.path()).unwrap();
        listed.sort();
        assert_eq!(
            listed,
            vec![temp.path().join("a.yaml"), temp.path().join("sub")]
        );
    }

    #[test]
    fn test_metadata_kind() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("f"), "xyz").unwrap();

        let rt = NativeRuntime::new();
        let meta = rt.path_metadata(&temp.path().join("f")).unwrap();
        assert_eq!(meta.kind, PathKind::File);
        assert!(!meta.symlink);
        let meta = rt.path_metadata(temp.path()).unwrap();
        assert_eq!(meta.kind, PathKind::Directory);
        assert!(rt.path_metadata(&temp.path().join("nope")).unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_metadata() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("f.yaml"), "a: b\n").unwrap();
        symlink(temp.path().join("f.yaml"), temp.path().join("link.yaml")).unwrap();
        symlink(temp.path(), temp.path().join("loop")).unwrap();
        symlink(temp.path().join("gone"), temp.path().join("dangling")).unwrap();

        let rt = NativeRuntime::new();
        let meta = rt.path_metadata(&temp.path().join("link.yaml")).unwrap();
        assert_eq!(
            meta,
            PathMetadata {
                kind: PathKind::File,
                symlink: true
            }
        );
        let meta = rt.path_metadata(&temp.path().join("loop")).unwrap();
        assert_eq!(meta.kind, PathKind::Directory);
        assert!(meta.symlink);
        assert!(
            rt.path_metadata(&temp.path().join("dangling"))
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(rt.file_read(&temp.path().join("link.yaml")).unwrap(), b"a: b\n");
    }

    #[test]
    fn test_invalid_utf8() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("bin.yaml"), [0xff, 0xfe, 0x00]).unwrap();

        let rt = NativeRuntime::new();
        let err = rt.file_read_string(&temp.path().join("bin.yaml")).unwrap_err();
        assert!(err.to_string().contains("bin.yaml"));
    }
}

/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MemoryRuntime implementation over an in-memory file tree.
 *
 * This runtime never touches the disk:
 * - Files are populated up front (add_file / with_file)
 * - Directories are created implicitly for every file's parents
 * - Relative paths resolve against `/`
 */

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::traits::{PathKind, PathMetadata, RuntimeError, RuntimeResult, SystemRuntime};

/// Helper function to create a "not found" error.
fn not_found_error(path: &Path) -> RuntimeError {
    RuntimeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Path not found: {}", path.display()),
    ))
}

/// Normalize a path to an absolute path (remove `.` and resolve `..`).
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            // Popping at the root is a no-op, so `..` can't go above it
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// Files, directories and symlinks held in memory.
#[derive(Debug, Clone)]
struct VirtualFileSystem {
    /// File contents, keyed by normalized absolute path
    files: HashMap<PathBuf, Vec<u8>>,
    /// Directory entries (automatically includes parents of all files)
    directories: HashSet<PathBuf>,
    /// Symbolic links and the normalized path they point at
    links: HashMap<PathBuf, PathBuf>,
}

impl Default for VirtualFileSystem {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            directories: HashSet::from([PathBuf::from("/")]),
            links: HashMap::new(),
        }
    }
}

impl VirtualFileSystem {
    fn add_file(&mut self, path: &Path, contents: Vec<u8>) {
        let normalized = normalize_path(path);
        if let Some(parent) = normalized.parent() {
            self.add_directory_and_parents(parent);
        }
        self.files.insert(normalized, contents);
    }

    fn add_directory(&mut self, path: &Path) {
        self.add_directory_and_parents(&normalize_path(path));
    }

    fn add_symlink(&mut self, link: &Path, target: &Path) {
        let normalized = normalize_path(link);
        if let Some(parent) = normalized.parent() {
            self.add_directory_and_parents(parent);
        }
        self.links.insert(normalized, normalize_path(target));
    }

    /// Follow `path` if it is a link. Links to links are not followed.
    fn resolve(&self, path: &Path) -> (PathBuf, bool) {
        let normalized = normalize_path(path);
        match self.links.get(&normalized) {
            Some(target) => (target.clone(), true),
            None => (normalized, false),
        }
    }

    /// Direct children of a directory.
    fn list_directory(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        let (dir, _) = self.resolve(path);
        if !self.directories.contains(&dir) {
            return Err(not_found_error(path));
        }

        let shown = normalize_path(path);
        let children = self
            .files
            .keys()
            .chain(self.directories.iter())
            .chain(self.links.keys())
            .filter(|entry| entry.parent() == Some(dir.as_path()) && **entry != dir);
        let entries: HashSet<PathBuf> = children
            .filter_map(|entry| entry.file_name())
            .map(|name| shown.join(name))
            .collect();
        Ok(entries.into_iter().collect())
    }

    fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let (target, _) = self.resolve(path);
        self.files
            .get(&target)
            .cloned()
            .ok_or_else(|| not_found_error(path))
    }

    fn metadata(&self, path: &Path) -> RuntimeResult<PathMetadata> {
        let (target, symlink) = self.resolve(path);
        let kind = if self.files.contains_key(&target) {
            PathKind::File
        } else if self.directories.contains(&target) {
            PathKind::Directory
        } else {
            return Err(not_found_error(path));
        };
        Ok(PathMetadata { kind, symlink })
    }

    /// Add a directory and all its parent directories.
    fn add_directory_and_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

/// Runtime serving reads from an in-memory file tree.
///
/// Populate it with [`MemoryRuntime::add_file`] (or the chaining
/// [`MemoryRuntime::with_file`]) before handing it to a reader; once shared it
/// is read-only, so no locking is involved.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuntime {
    vfs: VirtualFileSystem,
}

impl MemoryRuntime {
    /// Create a MemoryRuntime with an empty filesystem rooted at `/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.vfs.add_file(path.as_ref(), contents.into());
    }

    /// Add a file and return self, for building fixtures inline.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, contents);
        self
    }

    /// Add an (empty) directory and its parents.
    pub fn add_directory(&mut self, path: impl AsRef<Path>) {
        self.vfs.add_directory(path.as_ref());
    }

    /// Add a symbolic link at `link` pointing to `target`.
    pub fn with_symlink(mut self, link: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.vfs.add_symlink(link.as_ref(), target.as_ref());
        self
    }
}

impl SystemRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.vfs.read_file(path)
    }

    fn path_metadata(&self, path: &Path) -> RuntimeResult<PathMetadata> {
        self.vfs.metadata(path)
    }

    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        self.vfs.list_directory(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(rt: &MemoryRuntime, path: &str) -> Option<PathKind> {
        rt.path_metadata(Path::new(path)).ok().map(|m| m.kind)
    }

    #[test]
    fn test_parents_created() {
        let rt = MemoryRuntime::new().with_file("a/b/c.yaml", "x: y\n");
        assert_eq!(kind(&rt, "/a"), Some(PathKind::Directory));
        assert_eq!(kind(&rt, "/a/b"), Some(PathKind::Directory));
        assert_eq!(kind(&rt, "/a/b/c.yaml"), Some(PathKind::File));
        assert_eq!(kind(&rt, "a/b/c.yaml"), Some(PathKind::File));
        assert_eq!(rt.file_read(Path::new("/a/b/c.yaml")).unwrap(), b"x: y\n");
    }

    #[test]
    fn test_list_direct_children_only() {
        let mut rt = MemoryRuntime::new();
        rt.add_file("/top.yaml", "a: b\n");
        rt.add_file("/dir/inner.yaml", "c: d\n");
        rt.add_file("/dir/deeper/x.yaml", "e: f\n");
        rt.add_directory("/empty");

        let mut root = rt.dir_list(Path::new("/")).unwrap();
        root.sort();
        assert_eq!(
            root,
            vec![
                PathBuf::from("/dir"),
                PathBuf::from("/empty"),
                PathBuf::from("/top.yaml"),
            ]
        );

        let mut dir = rt.dir_list(Path::new("/dir")).unwrap();
        dir.sort();
        assert_eq!(
            dir,
            vec![PathBuf::from("/dir/deeper"), PathBuf::from("/dir/inner.yaml")]
        );
    }

    #[test]
    fn test_normalization() {
        let rt = MemoryRuntime::new().with_file("/pkg/a.yaml", "a: b\n");
        assert_eq!(kind(&rt, "/pkg/./sub/../a.yaml"), Some(PathKind::File));
        assert_eq!(kind(&rt, "./pkg"), Some(PathKind::Directory));
        assert_eq!(kind(&rt, "/../../pkg"), Some(PathKind::Directory));
    }

    #[test]
    fn test_missing_paths() {
        let rt = MemoryRuntime::new();
        assert!(rt.file_read(Path::new("/nope.yaml")).unwrap_err().is_not_found());
        assert!(rt.dir_list(Path::new("/nope")).unwrap_err().is_not_found());
        assert!(rt.path_metadata(Path::new("/nope")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_symlinks() {
        let rt = MemoryRuntime::new()
            .with_file("/pkg/a.yaml", "a: b\n")
            .with_symlink("/pkg/link.yaml", "/pkg/a.yaml")
            .with_symlink("/pkg/loop", "/pkg")
            .with_symlink("/pkg/dangling", "/gone");

        let meta = rt.path_metadata(Path::new("/pkg/link.yaml")).unwrap();
        assert_eq!(
            meta,
            PathMetadata {
                kind: PathKind::File,
                symlink: true
            }
        );
        assert_eq!(rt.file_read(Path::new("/pkg/link.yaml")).unwrap(), b"a: b\n");

        let meta = rt.path_metadata(Path::new("/pkg/loop")).unwrap();
        assert_eq!(meta.kind, PathKind::Directory);
        assert!(meta.symlink);
        assert!(!rt.path_metadata(Path::new("/pkg")).unwrap().symlink);

        let mut through = rt.dir_list(Path::new("/pkg/loop")).unwrap();
        through.sort();
        assert_eq!(through[0], PathBuf::from("/pkg/loop/a.yaml"));
        assert_eq!(through.len(), 4);

        assert!(
            rt.path_metadata(Path::new("/pkg/dangling"))
                .unwrap_err()
                .is_not_found()
        );
    }
}

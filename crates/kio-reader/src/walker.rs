/*
 * walker.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Package tree traversal with subpackage pruning.
 */

use std::path::{Path, PathBuf};

use kio_system_runtime::{PathKind, SystemRuntime};
use tracing::{debug, trace};

use crate::error::{ReaderError, Result};

/// Collects the files of a package directory.
///
/// A directory below the root that directly holds the marker file is a
/// subpackage. Its subtree is left out unless subpackages are included, in
/// which case the same rule keeps applying further down. The root's own files
/// are always collected.
///
/// Symlinked files are collected. Symlinked directories are not descended
/// into, so a link back up the tree cannot loop.
pub struct Walker<'a> {
    runtime: &'a dyn SystemRuntime,
    marker_file_name: &'a str,
    include_subpackages: bool,
}

impl<'a> Walker<'a> {
    pub fn new(
        runtime: &'a dyn SystemRuntime,
        marker_file_name: &'a str,
        include_subpackages: bool,
    ) -> Self {
        Self {
            runtime,
            marker_file_name,
            include_subpackages,
        }
    }

    /// Relative paths of every file under `root`, sorted by component.
    ///
    /// Each directory is listed once; pruned subpackages are not descended into.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![PathBuf::new()];

        while let Some(relative_dir) = pending.pop() {
            let dir = if relative_dir.as_os_str().is_empty() {
                root.to_path_buf()
            } else {
                root.join(&relative_dir)
            };
            let entries = self
                .runtime
                .dir_list(&dir)
                .map_err(|source| ReaderError::access(&dir, source))?;
            trace!(dir = %dir.display(), entries = entries.len(), "Listed directory");

            if !relative_dir.as_os_str().is_empty()
                && !self.include_subpackages
                && self.holds_marker(&entries)
            {
                debug!(subpackage = %relative_dir.display(), "Skipping subpackage");
                continue;
            }

            for entry in entries {
                let Some(name) = entry.file_name() else {
                    continue;
                };
                let relative = relative_dir.join(name);
                let metadata = match self.runtime.path_metadata(&entry) {
                    Ok(metadata) => metadata,
                    // Vanished, or a dangling link
                    Err(e) if e.is_not_found() => continue,
                    Err(source) => return Err(ReaderError::access(&entry, source)),
                };
                match metadata.kind {
                    PathKind::File => {
                        debug!(?relative, "Discovered file");
                        files.push(relative);
                    }
                    PathKind::Directory if metadata.symlink => {
                        debug!(?relative, "Skipping symlinked directory");
                    }
                    PathKind::Directory => pending.push(relative),
                    PathKind::Other => {}
                }
            }
        }

        // Sort for deterministic ordering
        files.sort();
        Ok(files)
    }

    fn holds_marker(&self, entries: &[PathBuf]) -> bool {
        entries
            .iter()
            .any(|e| e.file_name().is_some_and(|n| n == self.marker_file_name))
    }
}

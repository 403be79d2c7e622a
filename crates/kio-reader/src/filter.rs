/*
 * filter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Decides which discovered files are loaded as document sources.
 */

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use glob::Pattern;

use crate::error::{ReaderError, Result};

/// Predicate over a portable relative path; returning true excludes the file.
pub type SkipFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Extensions loaded when no patterns are configured.
pub const STRUCTURED_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Relative path with `/` separators, whatever the host uses.
pub fn portable_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Accepts files by base-name pattern and an optional skip predicate.
///
/// Both gates must pass. A file named like the package marker is never
/// accepted.
pub struct FileFilter {
    patterns: Vec<Pattern>,
    marker_file_name: String,
    skip: Option<SkipFn>,
}

impl FileFilter {
    /// Compile `globs` once; an unusable pattern fails the whole filter.
    pub fn new(globs: &[String], marker_file_name: &str, skip: Option<SkipFn>) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|source| ReaderError::Pattern {
                    pattern: glob.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            marker_file_name: marker_file_name.to_string(),
            skip,
        })
    }

    pub fn accepts(&self, relative: &Path) -> bool {
        let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        if name == self.marker_file_name.as_str() {
            return false;
        }

        let matched = if self.patterns.is_empty() {
            relative
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| STRUCTURED_EXTENSIONS.contains(&ext))
        } else {
            self.patterns.iter().any(|p| p.matches(&name))
        };
        if !matched {
            return false;
        }

        match &self.skip {
            Some(skip) => !skip(&portable_path(relative)),
            None => true,
        }
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFilter")
            .field("patterns", &self.patterns)
            .field("marker_file_name", &self.marker_file_name)
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

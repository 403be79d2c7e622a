/*
 * reader.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * PackageReader: loads every document of a package, annotated with where it
 * came from.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kio_system_runtime::{NativeRuntime, PathKind, RuntimeError, SystemRuntime};
use kio_yaml::{Document, Format};
use rayon::prelude::*;
use tracing::{debug, info, info_span};

use crate::annotate::{Provenance, annotate};
use crate::config::{ErrorPolicy, ReaderConfig};
use crate::error::{ReaderError, Result};
use crate::filter::{FileFilter, SkipFn, portable_path};
use crate::walker::Walker;

/// One file to load: where to read it and the path recorded for it.
struct FileSource {
    path: PathBuf,
    relative: PathBuf,
}

/// Reads a package of configuration files into annotated documents.
///
/// The reader combines a [`ReaderConfig`] with the collaborators that cannot
/// be configured from text: the storage runtime and an optional skip
/// predicate.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kio_reader::{PackageReader, ReaderConfig};
/// use kio_system_runtime::MemoryRuntime;
///
/// let runtime = MemoryRuntime::new()
///     .with_file("/pkg/a.yaml", "a: b # keep\n")
///     .with_file("/pkg/notes.txt", "ignored");
/// let docs = PackageReader::new(ReaderConfig::new("/pkg"))
///     .with_runtime(Arc::new(runtime))
///     .read()
///     .unwrap();
///
/// assert_eq!(docs.len(), 1);
/// assert!(docs[0].to_string().starts_with("a: b # keep\nmetadata:\n"));
/// ```
pub struct PackageReader {
    config: ReaderConfig,
    skip: Option<SkipFn>,
    runtime: Arc<dyn SystemRuntime>,
}

impl Default for PackageReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

impl PackageReader {
    /// Create a reader over the local filesystem.
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            skip: None,
            runtime: Arc::new(NativeRuntime::new()),
        }
    }

    /// Read through `runtime` instead of the local filesystem.
    pub fn with_runtime(mut self, runtime: Arc<dyn SystemRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Exclude files for which `skip` returns true.
    ///
    /// The predicate receives the path relative to the package root with `/`
    /// separators.
    pub fn with_skip<F>(mut self, skip: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(skip));
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Load every accepted file of the package.
    ///
    /// Documents come back in file order (by relative path), and in source
    /// order within each file. Any failure fails the whole read.
    pub fn read(&self) -> Result<Vec<Document>> {
        let root = match &self.config.package_path {
            Some(path) if !path.as_os_str().is_empty() => path.as_path(),
            _ => return Err(ReaderError::MissingPackagePath),
        };
        let span = info_span!("read_package", root = %root.display());
        let _enter = span.enter();

        let sources = self.collect_sources(root)?;
        let results = self.load_all(&sources);

        let mut documents = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(docs) => documents.extend(docs),
                Err(e) if self.config.error_policy == ErrorPolicy::FailFast => return Err(e),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(ReaderError::Multiple(errors));
        }

        info!(
            files = sources.len(),
            documents = documents.len(),
            "Read package"
        );
        Ok(documents)
    }

    fn collect_sources(&self, root: &Path) -> Result<Vec<FileSource>> {
        let metadata = self
            .runtime
            .path_metadata(root)
            .map_err(|source| ReaderError::access(root, source))?;

        match metadata.kind {
            PathKind::File => {
                let relative = root.file_name().map(PathBuf::from).unwrap_or_default();
                Ok(vec![FileSource {
                    path: root.to_path_buf(),
                    relative,
                }])
            }
            PathKind::Directory => {
                let filter = FileFilter::new(
                    &self.config.match_globs,
                    &self.config.marker_file_name,
                    self.skip.clone(),
                )?;
                let walker = Walker::new(
                    self.runtime.as_ref(),
                    &self.config.marker_file_name,
                    self.config.include_subpackages,
                );
                Ok(walker
                    .walk(root)?
                    .into_iter()
                    .filter(|relative| filter.accepts(relative))
                    .map(|relative| FileSource {
                        path: root.join(&relative),
                        relative,
                    })
                    .collect())
            }
            PathKind::Other => Err(ReaderError::access(
                root,
                RuntimeError::InvalidData {
                    path: root.to_path_buf(),
                    message: "not a file or directory".to_string(),
                },
            )),
        }
    }

    /// Load each source, keeping results in source order.
    fn load_all(&self, sources: &[FileSource]) -> Vec<Result<Vec<Document>>> {
        if self.config.parallel {
            return sources.par_iter().map(|s| self.load_file(s)).collect();
        }
        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let result = self.load_file(source);
            let failed = result.is_err();
            results.push(result);
            if failed && self.config.error_policy == ErrorPolicy::FailFast {
                break;
            }
        }
        results
    }

    fn load_file(&self, source: &FileSource) -> Result<Vec<Document>> {
        let content = self
            .runtime
            .file_read_string(&source.path)
            .map_err(|e| ReaderError::access(&source.path, e))?;
        let mut documents = kio_yaml::parse(&content, Format::from_path(&source.path))
            .map_err(|e| ReaderError::parse(&source.path, e))?;

        let recorded = self.recorded_path(&source.relative);
        for (index, doc) in documents.iter_mut().enumerate() {
            let provenance = Provenance {
                index,
                path: &recorded,
            };
            annotate(doc, provenance, &self.config)
                .map_err(|e| ReaderError::parse(&source.path, e))?;
        }

        debug!(path = %recorded, documents = documents.len(), "Loaded file");
        Ok(documents)
    }

    /// Path written into the path annotation.
    fn recorded_path(&self, relative: &Path) -> String {
        if self.config.normalize_path_separators {
            portable_path(relative)
        } else {
            relative.to_string_lossy().into_owned()
        }
    }
}

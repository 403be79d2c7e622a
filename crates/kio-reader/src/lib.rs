/*
 * kio-reader
 * Copyright (c) 2025 Posit, PBC
 *
 * Package reader for configuration documents.
 *
 * Given a file or a directory tree, the reader:
 * - walks the tree, leaving out nested packages (directories holding a marker file)
 * - keeps the files whose names match the configured patterns
 * - splits every file into its documents without losing comments or layout
 * - records in each document which file it came from and its position there
 */

//! # kio-reader
//!
//! Reads a package of YAML/JSON configuration files into
//! [`kio_yaml::Document`]s. Every document is annotated under
//! `metadata.annotations`:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     config.kubernetes.io/index: '0'
//!     config.kubernetes.io/path: 'a/b/deploy.yaml'
//! ```
//!
//! Everything else in the document renders back exactly as it was read.

pub mod annotate;
pub mod config;
pub mod error;
pub mod filter;
pub mod reader;
pub mod walker;

pub use annotate::{
    BARE_SEQ_WRAPPING_KEY, INDEX_ANNOTATION, PATH_ANNOTATION, Provenance, SEQ_INDENT_ANNOTATION,
    annotate, strip_provenance,
};
pub use config::{DEFAULT_MARKER_FILE_NAME, ErrorPolicy, ReaderConfig};
pub use error::{ReaderError, Result};
pub use filter::{FileFilter, SkipFn, portable_path};
pub use reader::PackageReader;
pub use walker::Walker;

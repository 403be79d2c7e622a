//! Error types for kio-reader

use std::path::{Path, PathBuf};

use kio_system_runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("must specify package path")]
    MissingPackagePath,

    #[error("failed to read {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: kio_yaml::Error,
    },

    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Every failure of a read that kept going past the first one.
    #[error("{} files failed to load:\n{}", .0.len(), join_messages(.0))]
    Multiple(Vec<ReaderError>),
}

impl ReaderError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: RuntimeError) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: kio_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// The file this error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Access { path, .. } | Self::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn join_messages(errors: &[ReaderError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ReaderError>;

//! Error types for document parsing.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for kio-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or editing documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed YAML or JSON
    #[error("syntax error at {location}: {message}")]
    Syntax {
        message: String,
        location: SourceInfo,
    },

    /// Valid input that the lossless model cannot represent
    #[error("unsupported construct at {location}: {message}")]
    Unsupported {
        message: String,
        location: SourceInfo,
    },

    /// A document shape that an operation cannot work with
    #[error("invalid structure: {message}")]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceInfo) -> Self {
        Error::Syntax {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>, location: SourceInfo) -> Self {
        Error::Unsupported {
            message: message.into(),
            location,
        }
    }

    /// Create a structural error without a location.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Error::InvalidStructure {
            message: message.into(),
            location: None,
        }
    }

    /// Location of the error in the source text, when known.
    pub fn location(&self) -> Option<SourceInfo> {
        match self {
            Error::Syntax { location, .. } | Error::Unsupported { location, .. } => Some(*location),
            Error::InvalidStructure { location, .. } => *location,
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Syntax {
            message: err.info().to_string(),
            location: SourceInfo::from_marker(err.marker()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        // serde_json puts the position in its Display output; keep the message bare
        let message = err.to_string();
        let message = match message.rfind(" at line ") {
            Some(idx) => message[..idx].to_string(),
            None => message,
        };
        Error::Syntax {
            message,
            location: SourceInfo::new(err.line().max(1), err.column().max(1)),
        }
    }
}

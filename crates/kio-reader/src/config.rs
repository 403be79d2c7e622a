//! Reader configuration
//!
//! [`ReaderConfig`] holds the plain-data options of a package read. It can be
//! built in code with the `with_*` methods or loaded from YAML:
//!
//! ```yaml
//! package-path: ./deploy
//! include-subpackages: true
//! match-globs: ["*.yaml"]
//! set-annotations:
//!   example.com/owner: platform
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the file that marks a directory as a separate package.
pub const DEFAULT_MARKER_FILE_NAME: &str = "Kptfile";

/// What a read does when a file fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first failing file (in path order)
    #[default]
    FailFast,
    /// Try every file, then report all failures together
    CollectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReaderConfig {
    /// File or directory to read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_path: Option<PathBuf>,

    /// Descend into directories that hold their own marker file
    pub include_subpackages: bool,

    /// Return documents exactly as parsed
    pub omit_annotations: bool,

    /// Record each file's sequence indentation style as an annotation
    pub preserve_seq_indent: bool,

    /// Base-name patterns; empty means every `.yaml`, `.yml` and `.json` file
    pub match_globs: Vec<String>,

    pub marker_file_name: String,

    /// Extra annotations written on every document
    pub set_annotations: BTreeMap<String, String>,

    /// Wrap a sequence root in a mapping so it can be annotated
    pub wrap_bare_sequences: bool,

    /// Write `/` in path annotations on every platform
    pub normalize_path_separators: bool,

    pub error_policy: ErrorPolicy,

    /// Parse files on the rayon thread pool
    pub parallel: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            package_path: None,
            include_subpackages: false,
            omit_annotations: false,
            preserve_seq_indent: false,
            match_globs: Vec::new(),
            marker_file_name: DEFAULT_MARKER_FILE_NAME.to_string(),
            set_annotations: BTreeMap::new(),
            wrap_bare_sequences: false,
            normalize_path_separators: false,
            error_policy: ErrorPolicy::FailFast,
            parallel: false,
        }
    }
}

impl ReaderConfig {
    /// Create a configuration reading `path` with default options.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::default().with_package_path(path)
    }

    /// Parse a configuration from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn with_package_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.package_path = Some(path.into());
        self
    }

    pub fn with_include_subpackages(mut self, include: bool) -> Self {
        self.include_subpackages = include;
        self
    }

    pub fn with_omit_annotations(mut self, omit: bool) -> Self {
        self.omit_annotations = omit;
        self
    }

    pub fn with_preserve_seq_indent(mut self, preserve: bool) -> Self {
        self.preserve_seq_indent = preserve;
        self
    }

    /// Replace the file name patterns.
    pub fn with_match_globs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_globs = globs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_marker_file_name(mut self, name: impl Into<String>) -> Self {
        self.marker_file_name = name.into();
        self
    }

    /// Add one extra annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_wrap_bare_sequences(mut self, wrap: bool) -> Self {
        self.wrap_bare_sequences = wrap;
        self
    }

    pub fn with_normalized_path_separators(mut self, normalize: bool) -> Self {
        self.normalize_path_separators = normalize;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

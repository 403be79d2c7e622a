//! # kio-yaml
//!
//! Comment- and layout-preserving YAML/JSON documents.
//!
//! This crate parses configuration files into a [`Document`] tree that keeps
//! everything a plain deserializer throws away: comments, blank lines, key
//! order, quoting style and indentation. Rendering an unmodified YAML document
//! with [`std::fmt::Display`] reproduces its source text exactly, and editing
//! a few keys leaves the rest of the text untouched.
//!
//! ## Design
//!
//! Input is first checked with `yaml-rust2` (or `serde_json` for JSON), so
//! malformed files are reported with a line and column. The layout-preserving
//! tree is then built by a line-oriented parser: each mapping entry and
//! sequence item carries the comment lines above it and the text that follows
//! its value on the same line, and block collections remember their column.
//!
//! JSON documents are parsed into the same tree using flow collections and
//! render back as single-line YAML flow syntax.
//!
//! ## Example
//!
//! ```rust
//! use kio_yaml::{Node, Scalar, parse_yaml};
//!
//! let mut docs = parse_yaml("a: b # keep me\nmetadata:\n").unwrap();
//! let root = docs[0].root_mut().as_mapping_mut().unwrap();
//! let meta = root.ensure_mapping("metadata", 2).unwrap();
//! meta.set("name", Node::Scalar(Scalar::single_quoted("x")));
//!
//! assert_eq!(docs[0].to_string(), "a: b # keep me\nmetadata:\n  name: 'x'\n");
//! ```

mod emitter;
mod error;
mod flow;
mod node;
mod parser;
mod seqindent;
mod source_info;

pub use error::{Error, Result};
pub use node::{
    Document, Format, Mapping, MappingEntry, Node, Scalar, ScalarStyle, Sequence, SequenceItem,
};
pub use parser::{parse, parse_json, parse_yaml};
pub use seqindent::{SequenceIndentStyle, detect_in as detect_sequence_indent};
pub use source_info::SourceInfo;

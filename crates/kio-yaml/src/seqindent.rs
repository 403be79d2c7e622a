//! Sequence indentation style detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Document, Node};

/// How block sequences under a mapping key are indented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceIndentStyle {
    /// Dashes in the same column as the owning key
    Compact,
    /// Dashes indented under the owning key
    Wide,
}

impl SequenceIndentStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceIndentStyle::Compact => "compact",
            SequenceIndentStyle::Wide => "wide",
        }
    }
}

impl fmt::Display for SequenceIndentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style of the first block sequence written as a mapping value, if any.
pub fn detect_in(node: &Node) -> Option<SequenceIndentStyle> {
    match node {
        Node::Mapping(m) => {
            let parent = m.indent();
            m.entries().iter().find_map(|entry| {
                if let (Some(parent), Node::Sequence(seq)) = (parent, entry.value()) {
                    if let Some(indent) = seq.indent() {
                        return Some(if indent > parent {
                            SequenceIndentStyle::Wide
                        } else {
                            SequenceIndentStyle::Compact
                        });
                    }
                }
                detect_in(entry.value())
            })
        }
        Node::Sequence(seq) => seq.items().iter().find_map(|i| detect_in(i.value())),
        Node::Scalar(_) => None,
    }
}

/// Style for a whole file: the first document that shows one decides, compact otherwise.
pub(crate) fn detect_for_file(documents: &[Document]) -> SequenceIndentStyle {
    documents
        .iter()
        .find_map(|d| detect_in(d.root()))
        .unwrap_or(SequenceIndentStyle::Compact)
}

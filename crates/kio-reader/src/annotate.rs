/*
 * annotate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Provenance annotations: where each document was read from.
 */

use kio_yaml::{Document, Node, Scalar};

use crate::config::ReaderConfig;

/// Ordinal of the document within its file, from `'0'`.
pub const INDEX_ANNOTATION: &str = "config.kubernetes.io/index";

/// File the document was read from, relative to the package root.
pub const PATH_ANNOTATION: &str = "config.kubernetes.io/path";

/// Sequence indentation style of the file (`compact` or `wide`).
pub const SEQ_INDENT_ANNOTATION: &str = "internal.config.kubernetes.io/seqindent";

/// Key under which a bare sequence root is wrapped.
pub const BARE_SEQ_WRAPPING_KEY: &str = "bareSeqNodeWrappingKey";

const RESERVED_ANNOTATIONS: [&str; 3] = [INDEX_ANNOTATION, PATH_ANNOTATION, SEQ_INDENT_ANNOTATION];

/// Where one document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance<'a> {
    pub index: usize,
    pub path: &'a str,
}

/// Write the provenance of `doc` into `metadata.annotations`.
///
/// Only the reserved keys (plus the configured extra annotations) are set;
/// everything else in the document keeps its text. `metadata` and
/// `annotations` are created when missing and filled in place when null.
pub fn annotate(
    doc: &mut Document,
    provenance: Provenance<'_>,
    config: &ReaderConfig,
) -> kio_yaml::Result<()> {
    if config.wrap_bare_sequences && doc.root().as_sequence().is_some() {
        doc.wrap_root(BARE_SEQ_WRAPPING_KEY);
    }
    if config.omit_annotations {
        return Ok(());
    }

    let step = doc.indent_step();
    let seq_indent = doc.sequence_indent();
    let kind = doc.root().kind_name();
    let Some(root) = doc.root_mut().as_mapping_mut() else {
        return Err(kio_yaml::Error::invalid_structure(format!(
            "document root is a {kind}, expected a mapping"
        )));
    };

    let annotations = root
        .ensure_mapping("metadata", step)?
        .ensure_mapping("annotations", step)?;
    annotations.set(INDEX_ANNOTATION, quoted(&provenance.index.to_string()));
    annotations.set(PATH_ANNOTATION, quoted(provenance.path));
    if config.preserve_seq_indent {
        if let Some(style) = seq_indent {
            annotations.set(SEQ_INDENT_ANNOTATION, quoted(style.as_str()));
        }
    }
    for (key, value) in &config.set_annotations {
        annotations.set(key, quoted(value));
    }
    Ok(())
}

/// Remove the reserved annotations again.
///
/// `annotations` and `metadata` entries left empty are dropped if the
/// annotator added them, or set back to null if it filled them. Returns
/// whether the document changed.
pub fn strip_provenance(doc: &mut Document) -> bool {
    let Some(root) = doc.root_mut().as_mapping_mut() else {
        return false;
    };
    let Some(metadata) = root.get_mut("metadata").and_then(Node::as_mapping_mut) else {
        return false;
    };

    let mut changed = false;
    if let Some(annotations) = metadata
        .get_mut("annotations")
        .and_then(Node::as_mapping_mut)
    {
        for key in RESERVED_ANNOTATIONS {
            changed |= annotations.remove(key).is_some();
        }
    }
    changed |= metadata.discard_if_empty("annotations");
    changed |= root.discard_if_empty("metadata");
    changed
}

fn quoted(value: &str) -> Node {
    Node::Scalar(Scalar::single_quoted(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kio_yaml::{parse_json, parse_yaml};

    fn annotated(src: &str, config: &ReaderConfig) -> Vec<String> {
        let mut docs = parse_yaml(src).unwrap();
        for (index, doc) in docs.iter_mut().enumerate() {
            let provenance = Provenance {
                index,
                path: "f.yaml",
            };
            annotate(doc, provenance, config).unwrap();
        }
        docs.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_index_counts_per_document() {
        let out = annotated("a: 1\n---\nb: 2\n", &ReaderConfig::default());
        assert!(out[0].contains("config.kubernetes.io/index: '0'\n"));
        assert!(out[1].contains("config.kubernetes.io/index: '1'\n"));
    }

    #[test]
    fn test_existing_annotations_keep_position() {
        let src = "metadata:\n  annotations:\n    config.kubernetes.io/path: 'old.yaml'\n    owner: me # mine\n  name: x\nkind: K\n";
        let out = annotated(src, &ReaderConfig::default());
        assert_eq!(
            out[0],
            "metadata:\n  annotations:\n    config.kubernetes.io/path: 'f.yaml'\n    owner: me # mine\n    config.kubernetes.io/index: '0'\n  name: x\nkind: K\n"
        );
    }

    #[test]
    fn test_seq_indent_and_extra_annotations() {
        let config = ReaderConfig::default()
            .with_preserve_seq_indent(true)
            .with_annotation("z.example/b", "2")
            .with_annotation("z.example/a", "1");
        let out = annotated("a:\n    - b\n", &config);
        insta::assert_snapshot!(out[0], @r"
        a:
            - b
        metadata:
          annotations:
            config.kubernetes.io/index: '0'
            config.kubernetes.io/path: 'f.yaml'
            internal.config.kubernetes.io/seqindent: 'wide'
            z.example/a: '1'
            z.example/b: '2'
        ");
    }

    #[test]
    fn test_no_seq_indent_for_json() {
        let mut docs = parse_json("{\"a\": [1]}").unwrap();
        let config = ReaderConfig::default().with_preserve_seq_indent(true);
        annotate(
            &mut docs[0],
            Provenance {
                index: 0,
                path: "a.json",
            },
            &config,
        )
        .unwrap();
        assert!(!docs[0].to_string().contains("seqindent"));
    }

    #[test]
    fn test_omit_leaves_document_alone() {
        let config = ReaderConfig::default().with_omit_annotations(true);
        assert_eq!(annotated("a: b # c\n", &config), vec!["a: b # c\n"]);
    }

    #[test]
    fn test_sequence_root() {
        let mut docs = parse_yaml("- a\n- b\n").unwrap();
        let provenance = Provenance {
            index: 0,
            path: "list.yaml",
        };
        let err = annotate(&mut docs[0], provenance, &ReaderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("document root is a sequence"));

        let config = ReaderConfig::default().with_wrap_bare_sequences(true);
        annotate(&mut docs[0], provenance, &config).unwrap();
        assert_eq!(
            docs[0].to_string(),
            "bareSeqNodeWrappingKey:\n- a\n- b\nmetadata:\n  annotations:\n    config.kubernetes.io/index: '0'\n    config.kubernetes.io/path: 'list.yaml'\n"
        );
    }

    #[test]
    fn test_strip_restores_parse() {
        let sources = [
            "a: b #first\n",
            "a: b\nmetadata:\n",
            "a: b\nmetadata:\n  annotations:\n",
            "a: b\nmetadata:\n  name: x\n  annotations:\n    keep: 'yes'\n",
            "{kind: A}\n",
        ];
        let config = ReaderConfig::default().with_preserve_seq_indent(true);
        for src in sources {
            let mut docs = parse_yaml(src).unwrap();
            let provenance = Provenance {
                index: 0,
                path: "x.yaml",
            };
            annotate(&mut docs[0], provenance, &config).unwrap();
            assert!(strip_provenance(&mut docs[0]), "{src}");
            assert_eq!(docs[0].to_string(), src);
            assert!(!strip_provenance(&mut docs[0]));
        }
    }
}

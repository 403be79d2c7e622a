/*
 * tests/roundtrip.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Round-trip and editing tests for layout-preserving documents.
 */

//! Round-trip and editing tests for layout-preserving documents.
//!
//! Every document parsed here must render back to its exact source text, and
//! edits to a handful of keys must leave everything else untouched.

use kio_yaml::{
    Document, Error, Format, Node, Scalar, SequenceIndentStyle, parse, parse_json, parse_yaml,
};

const MULTI_DOC: &str = "---\na: b #first\n---\nc: d # second\n";

const COMMENTED_LIST: &str = "# second thing
e: f
g:
  h:
  - i # has a list
  - j
";

const NULL_ANNOTATIONS: &str = "---\na: b #third\nmetadata:\n  annotations:\n";

const NULL_METADATA: &str = "---\na: b #forth\nmetadata:\n";

const DEPLOYMENT: &str = r#"# Deployment for the frontend
apiVersion: apps/v1
kind: Deployment
metadata:
    name: frontend   # keep this name
    labels: {app: web, tier: "front"}
    annotations:
        team: 'platform'

spec:
    replicas: 3
    template:
        spec:
            containers:
                -   name: web
                    image: "nginx:1.25"
                    args:
                        - --port=8080
                        - >-
                          --motd=hello
                          world
                    env: []
"#;

fn render(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.to_string()).collect()
}

/// Add the index/path annotations the way the package reader does.
fn annotate(doc: &mut Document, index: usize, path: &str) {
    let step = doc.indent_step();
    let root = doc.root_mut().as_mapping_mut().unwrap();
    let annotations = root
        .ensure_mapping("metadata", step)
        .unwrap()
        .ensure_mapping("annotations", step)
        .unwrap();
    annotations.set(
        "config.kubernetes.io/index",
        Node::Scalar(Scalar::single_quoted(&index.to_string())),
    );
    annotations.set(
        "config.kubernetes.io/path",
        Node::Scalar(Scalar::single_quoted(path)),
    );
}

#[test]
fn test_multi_document_split() {
    let docs = parse_yaml(MULTI_DOC).unwrap();
    assert_eq!(render(&docs), vec!["a: b #first\n", "c: d # second\n"]);
}

#[test]
fn test_comment_before_first_key_is_kept() {
    let docs = parse_yaml(COMMENTED_LIST).unwrap();
    assert_eq!(render(&docs), vec![COMMENTED_LIST]);
    assert_eq!(docs[0].sequence_indent(), Some(SequenceIndentStyle::Compact));
}

#[test]
fn test_realistic_manifest_roundtrips() {
    let docs = parse_yaml(DEPLOYMENT).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].to_string(), DEPLOYMENT);
    assert_eq!(docs[0].indent_step(), 4);
    assert_eq!(docs[0].sequence_indent(), Some(SequenceIndentStyle::Wide));
}

#[test]
fn test_annotate_existing_annotations_in_place() {
    let mut docs = parse_yaml(DEPLOYMENT).unwrap();
    annotate(&mut docs[0], 0, "deploy.yaml");
    let out = docs[0].to_string();
    insta::assert_snapshot!(out, @r#"
    # Deployment for the frontend
    apiVersion: apps/v1
    kind: Deployment
    metadata:
        name: frontend   # keep this name
        labels: {app: web, tier: "front"}
        annotations:
            team: 'platform'
            config.kubernetes.io/index: '0'
            config.kubernetes.io/path: 'deploy.yaml'

    spec:
        replicas: 3
        template:
            spec:
                containers:
                    -   name: web
                        image: "nginx:1.25"
                        args:
                            - --port=8080
                            - >-
                              --motd=hello
                              world
                        env: []
    "#);
}

#[test]
fn test_annotate_appends_metadata() {
    let mut docs = parse_yaml(MULTI_DOC).unwrap();
    for (i, doc) in docs.iter_mut().enumerate() {
        annotate(doc, i, "a_test.yaml");
    }
    assert_eq!(
        render(&docs),
        vec![
            "a: b #first\nmetadata:\n  annotations:\n    config.kubernetes.io/index: '0'\n    config.kubernetes.io/path: 'a_test.yaml'\n",
            "c: d # second\nmetadata:\n  annotations:\n    config.kubernetes.io/index: '1'\n    config.kubernetes.io/path: 'a_test.yaml'\n",
        ]
    );
}

#[test]
fn test_annotate_fills_null_entries() {
    let expected = |comment: &str, path: &str| {
        format!(
            "a: b #{comment}\nmetadata:\n  annotations:\n    config.kubernetes.io/index: '0'\n    config.kubernetes.io/path: '{path}'\n"
        )
    };

    let mut docs = parse_yaml(NULL_ANNOTATIONS).unwrap();
    annotate(&mut docs[0], 0, "c_test.yaml");
    assert_eq!(docs[0].to_string(), expected("third", "c_test.yaml"));

    let mut docs = parse_yaml(NULL_METADATA).unwrap();
    annotate(&mut docs[0], 0, "d_test.yaml");
    assert_eq!(docs[0].to_string(), expected("forth", "d_test.yaml"));
}

#[test]
fn test_undo_restores_source() {
    for src in [MULTI_DOC, COMMENTED_LIST, NULL_ANNOTATIONS, NULL_METADATA, DEPLOYMENT] {
        let pristine = render(&parse_yaml(src).unwrap());
        let mut docs = parse_yaml(src).unwrap();
        for (i, doc) in docs.iter_mut().enumerate() {
            annotate(doc, i, "x.yaml");
            let root = doc.root_mut().as_mapping_mut().unwrap();
            let metadata = root.get_mut("metadata").unwrap().as_mapping_mut().unwrap();
            let annotations = metadata
                .get_mut("annotations")
                .unwrap()
                .as_mapping_mut()
                .unwrap();
            annotations.remove("config.kubernetes.io/index");
            annotations.remove("config.kubernetes.io/path");
            metadata.discard_if_empty("annotations");
            root.discard_if_empty("metadata");
        }
        assert_eq!(render(&docs), pristine, "source:\n{src}");
    }
}

#[test]
fn test_json_annotations_render_as_flow() {
    let a = "{\n\t\t\"a\": \"b\"\n\t  }";
    let b = "{\n\t\t\"e\": \"f\",\n\t\t\"g\": {\n\t\t  \"h\": [\"i\", \"j\"]\n\t\t}\n\t  }";

    let mut docs = parse_json(a).unwrap();
    annotate(&mut docs[0], 0, "a_test.json");
    assert_eq!(
        docs[0].to_string(),
        "{\"a\": \"b\", metadata: {annotations: {config.kubernetes.io/index: '0', config.kubernetes.io/path: 'a_test.json'}}}\n"
    );

    let mut docs = parse(b, Format::Json).unwrap();
    annotate(&mut docs[0], 0, "b_test.json");
    assert_eq!(
        docs[0].to_string(),
        "{\"e\": \"f\", \"g\": {\"h\": [\"i\", \"j\"]}, metadata: {annotations: {config.kubernetes.io/index: '0', config.kubernetes.io/path: 'b_test.json'}}}\n"
    );
}

#[test]
fn test_flow_root_document() {
    let mut docs = parse_yaml("{kind: A, spec: [1, 2]} # flow root\n").unwrap();
    assert_eq!(docs[0].to_string(), "{kind: A, spec: [1, 2]} # flow root\n");
    annotate(&mut docs[0], 0, "f.yaml");
    assert_eq!(
        docs[0].to_string(),
        "{kind: A, spec: [1, 2], metadata: {annotations: {config.kubernetes.io/index: '0', config.kubernetes.io/path: 'f.yaml'}}} # flow root\n"
    );
}

#[test]
fn test_non_mapping_metadata_is_rejected() {
    let mut docs = parse_yaml("metadata: [a]\n").unwrap();
    let root = docs[0].root_mut().as_mapping_mut().unwrap();
    let err = root.ensure_mapping("metadata", 2).unwrap_err();
    assert!(matches!(err, Error::InvalidStructure { .. }));
}

#[test]
fn test_document_markers_and_end_markers() {
    let src = "%YAML 1.2\n--- # first\na: 1\n...\n---\n- x\n- y\n";
    let docs = parse_yaml(src).unwrap();
    assert_eq!(
        render(&docs),
        vec!["%YAML 1.2\n---\n# first\na: 1\n", "- x\n- y\n"]
    );
}

#[test]
fn test_syntax_error_reports_line() {
    let err = parse_yaml("a: b\nc:\n  d: [e\nf: g\n").unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }));
    assert!(err.location().unwrap().line >= 3);
}

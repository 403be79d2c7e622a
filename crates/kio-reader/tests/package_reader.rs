/*
 * tests/package_reader.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end package reads, in memory and on disk.
 */

//! End-to-end package reads.
//!
//! Each scenario runs against a `MemoryRuntime` and against a temporary
//! directory read through the native runtime; both must produce the same
//! documents.

use std::fs;
use std::path::{MAIN_SEPARATOR_STR, Path};
use std::sync::Arc;

use kio_reader::{ErrorPolicy, PackageReader, ReaderConfig, strip_provenance};
use kio_system_runtime::MemoryRuntime;
use kio_yaml::Document;
use tempfile::TempDir;

const READ_FILE_A: &str = "---
a: b #first
---
c: d # second
";

const READ_FILE_B: &str = "# second thing
e: f
g:
  h:
  - i # has a list
  - j
";

const READ_FILE_C: &str = "---
a: b #third
metadata:
  annotations:
";

const READ_FILE_D: &str = "---
a: b #forth
metadata:
";

const A_TEST_JSON: &str = "{
\t\t\"a\": \"b\"
\t  }";

const B_TEST_JSON: &str = "{
\t\t\"e\": \"f\",
\t\t\"g\": {
\t\t  \"h\": [\"i\", \"j\"]
\t\t}
\t  }";

/// A package laid out both in memory (under `/`) and in a temp directory.
struct Package {
    memory: MemoryRuntime,
    disk: TempDir,
}

impl Package {
    fn new() -> Self {
        let disk = TempDir::new().unwrap();
        let mut memory = MemoryRuntime::new();
        for dir in ["a/b", "a/c"] {
            fs::create_dir_all(disk.path().join(dir)).unwrap();
            memory.add_directory(Path::new("/").join(dir));
        }
        Self { memory, disk }
    }

    fn file(mut self, relative: &str, content: &str) -> Self {
        let path = self.disk.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        self.memory.add_file(Path::new("/").join(relative), content);
        self
    }

    /// Read the package both ways and check the results agree.
    fn read(&self, config: ReaderConfig) -> Vec<String> {
        self.read_with(config, |r| r)
    }

    fn read_with(
        &self,
        config: ReaderConfig,
        customize: impl Fn(PackageReader) -> PackageReader,
    ) -> Vec<String> {
        let in_memory = customize(
            PackageReader::new(config.clone().with_package_path("/"))
                .with_runtime(Arc::new(self.memory.clone())),
        )
        .read()
        .unwrap();
        let on_disk = customize(PackageReader::new(
            config.with_package_path(self.disk.path()),
        ))
        .read()
        .unwrap();

        let in_memory = render(&in_memory);
        assert_eq!(in_memory, render(&on_disk));
        in_memory
    }
}

fn render(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.to_string()).collect()
}

fn annotated(body: &str, index: usize, path: &str) -> String {
    let path = path.replace('/', MAIN_SEPARATOR_STR);
    format!(
        "{body}metadata:\n  annotations:\n    config.kubernetes.io/index: '{index}'\n    config.kubernetes.io/path: '{path}'\n"
    )
}

fn with_seq_indent(doc: String) -> String {
    format!("{doc}    internal.config.kubernetes.io/seqindent: 'compact'\n")
}

fn flat_package() -> Package {
    Package::new()
        .file("a_test.yaml", READ_FILE_A)
        .file("b_test.yaml", READ_FILE_B)
        .file("c_test.yaml", READ_FILE_C)
        .file("d_test.yaml", READ_FILE_D)
}

#[test]
fn test_read_empty_config() {
    let err = PackageReader::new(ReaderConfig::default())
        .read()
        .unwrap_err();
    assert!(err.to_string().contains("must specify package path"));
}

#[test]
fn test_read_package() {
    let docs = flat_package().read(ReaderConfig::default());
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a_test.yaml"),
            annotated("c: d # second\n", 1, "a_test.yaml"),
            annotated(READ_FILE_B, 0, "b_test.yaml"),
            annotated("a: b #third\n", 0, "c_test.yaml"),
            annotated("a: b #forth\n", 0, "d_test.yaml"),
        ]
    );
}

#[test]
fn test_read_package_skipping_a_file() {
    let docs = flat_package().read_with(ReaderConfig::default(), |r| {
        r.with_skip(|path| path == "d_test.yaml")
    });
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a_test.yaml"),
            annotated("c: d # second\n", 1, "a_test.yaml"),
            annotated(READ_FILE_B, 0, "b_test.yaml"),
            annotated("a: b #third\n", 0, "c_test.yaml"),
        ]
    );
}

#[test]
fn test_read_json() {
    let package = Package::new()
        .file("a_test.json", A_TEST_JSON)
        .file("b_test.json", B_TEST_JSON);
    let docs = package.read(ReaderConfig::default().with_match_globs(["*.json"]));
    assert_eq!(
        docs,
        vec![
            "{\"a\": \"b\", metadata: {annotations: {config.kubernetes.io/index: '0', config.kubernetes.io/path: 'a_test.json'}}}\n",
            "{\"e\": \"f\", \"g\": {\"h\": [\"i\", \"j\"]}, metadata: {annotations: {config.kubernetes.io/index: '0', config.kubernetes.io/path: 'b_test.json'}}}\n",
        ]
    );
}

#[test]
fn test_read_single_file() {
    let package = Package::new()
        .file("a_test.yaml", READ_FILE_A)
        .file("b_test.yaml", READ_FILE_B);
    let expected = vec![
        annotated("a: b #first\n", 0, "a_test.yaml"),
        annotated("c: d # second\n", 1, "a_test.yaml"),
    ];

    let in_memory = PackageReader::new(ReaderConfig::new("/a_test.yaml"))
        .with_runtime(Arc::new(package.memory.clone()))
        .read()
        .unwrap();
    assert_eq!(render(&in_memory), expected);

    let on_disk = PackageReader::new(ReaderConfig::new(package.disk.path().join("a_test.yaml")))
        .read()
        .unwrap();
    assert_eq!(render(&on_disk), expected);
}

#[test]
fn test_read_omitting_annotations() {
    let package = Package::new()
        .file("a_test.yaml", READ_FILE_A)
        .file("b_test.yaml", READ_FILE_B);
    let docs = package.read(ReaderConfig::default().with_omit_annotations(true));
    assert_eq!(docs, vec!["a: b #first\n", "c: d # second\n", READ_FILE_B]);
}

#[test]
fn test_read_preserving_seq_indent() {
    let package = Package::new()
        .file("a_test.yaml", READ_FILE_A)
        .file("b_test.yaml", READ_FILE_B);
    let docs = package.read(ReaderConfig::default().with_preserve_seq_indent(true));
    assert_eq!(
        docs,
        vec![
            with_seq_indent(annotated("a: b #first\n", 0, "a_test.yaml")),
            with_seq_indent(annotated("c: d # second\n", 1, "a_test.yaml")),
            with_seq_indent(annotated(READ_FILE_B, 0, "b_test.yaml")),
        ]
    );
}

#[test]
fn test_read_nested_dirs() {
    let package = Package::new()
        .file("a/b/a_test.yaml", READ_FILE_A)
        .file("a/b/b_test.yaml", READ_FILE_B);
    let docs = package.read(ReaderConfig::default());
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a/b/a_test.yaml"),
            annotated("c: d # second\n", 1, "a/b/a_test.yaml"),
            annotated(READ_FILE_B, 0, "a/b/b_test.yaml"),
        ]
    );
}

#[test]
fn test_read_matching_glob() {
    let package = Package::new()
        .file("a/b/a_test.yaml", READ_FILE_A)
        .file("a/b/b_test.yaml", READ_FILE_B);
    let docs = package.read(ReaderConfig::default().with_match_globs(["a*.yaml"]));
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a/b/a_test.yaml"),
            annotated("c: d # second\n", 1, "a/b/a_test.yaml"),
        ]
    );
}

fn package_with_subpackage() -> Package {
    Package::new()
        .file("a/b/a_test.yaml", READ_FILE_A)
        .file("a/c/c_test.yaml", READ_FILE_B)
        .file("a/c/pkgFile", "")
}

#[test]
fn test_read_skips_subpackage() {
    let docs = package_with_subpackage().read(ReaderConfig::default().with_marker_file_name("pkgFile"));
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a/b/a_test.yaml"),
            annotated("c: d # second\n", 1, "a/b/a_test.yaml"),
        ]
    );
}

#[test]
fn test_read_includes_subpackage() {
    let config = ReaderConfig::default()
        .with_marker_file_name("pkgFile")
        .with_include_subpackages(true);
    let docs = package_with_subpackage().read(config);
    assert_eq!(
        docs,
        vec![
            annotated("a: b #first\n", 0, "a/b/a_test.yaml"),
            annotated("c: d # second\n", 1, "a/b/a_test.yaml"),
            annotated(READ_FILE_B, 0, "a/c/c_test.yaml"),
        ]
    );
}

#[test]
fn test_default_marker_and_root_marker() {
    let package = Package::new()
        .file("Kptfile", "apiVersion: kpt.dev/v1\nkind: Kptfile\n")
        .file("root.yaml", "kind: Root\n")
        .file("sub/Kptfile", "apiVersion: kpt.dev/v1\nkind: Kptfile\n")
        .file("sub/child.yaml", "kind: Child\n");

    let docs = package.read(ReaderConfig::default());
    assert_eq!(docs, vec![annotated("kind: Root\n", 0, "root.yaml")]);

    let docs = package.read(ReaderConfig::default().with_include_subpackages(true));
    assert_eq!(
        docs,
        vec![
            annotated("kind: Root\n", 0, "root.yaml"),
            annotated("kind: Child\n", 0, "sub/child.yaml"),
        ]
    );
}

#[test]
fn test_parallel_read_matches_sequential() {
    let mut package = flat_package()
        .file("a/b/a_test.yaml", READ_FILE_A)
        .file("a/c/c_test.json", A_TEST_JSON);
    for i in 0..20 {
        package = package.file(&format!("many/f{i:02}.yaml"), "x: y\n---\nz: w\n");
    }
    let sequential = package.read(ReaderConfig::default());
    let parallel = package.read(ReaderConfig::default().with_parallel(true));
    assert_eq!(sequential.len(), 5 + 2 + 1 + 40);
    assert_eq!(parallel, sequential);
}

#[test]
fn test_collect_all_in_parallel() {
    let rt = MemoryRuntime::new()
        .with_file("/pkg/a.yaml", "a: b\n")
        .with_file("/pkg/b.yaml", "- x\n")
        .with_file("/pkg/c.json", "{\"c\": }")
        .with_file("/pkg/d.yaml", "d: e\n");
    let config = ReaderConfig::new("/pkg")
        .with_error_policy(ErrorPolicy::CollectAll)
        .with_parallel(true);
    let err = PackageReader::new(config)
        .with_runtime(Arc::new(rt))
        .read()
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("2 files failed to load:"), "{msg}");
    let b = msg.find("/pkg/b.yaml").unwrap();
    let c = msg.find("/pkg/c.json").unwrap();
    assert!(b < c);
}

#[cfg(unix)]
#[test]
fn test_read_does_not_follow_symlinked_directories() {
    use std::os::unix::fs::symlink;

    let disk = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    fs::write(disk.path().join("a.yaml"), "a: b\n").unwrap();
    fs::write(outside.path().join("b.yaml"), "b: c\n").unwrap();
    symlink(disk.path(), disk.path().join("loop")).unwrap();
    symlink(outside.path(), disk.path().join("outside")).unwrap();
    symlink(outside.path().join("b.yaml"), disk.path().join("linked.yaml")).unwrap();

    let docs = PackageReader::new(ReaderConfig::new(disk.path()))
        .read()
        .unwrap();
    assert_eq!(
        render(&docs),
        vec![
            annotated("a: b\n", 0, "a.yaml"),
            annotated("b: c\n", 0, "linked.yaml"),
        ]
    );
}

#[test]
fn test_strip_restores_unannotated_documents() {
    let package = flat_package();
    let mut annotated = PackageReader::new(ReaderConfig::new("/"))
        .with_runtime(Arc::new(package.memory.clone()))
        .read()
        .unwrap();
    let plain = PackageReader::new(ReaderConfig::new("/").with_omit_annotations(true))
        .with_runtime(Arc::new(package.memory.clone()))
        .read()
        .unwrap();

    for doc in &mut annotated {
        assert!(strip_provenance(doc));
    }
    assert_eq!(render(&annotated), render(&plain));
    insta::assert_snapshot!(render(&plain).concat(), @r"
    a: b #first
    c: d # second
    # second thing
    e: f
    g:
      h:
      - i # has a list
      - j
    a: b #third
    metadata:
      annotations:
    a: b #forth
    metadata:
    ");
}

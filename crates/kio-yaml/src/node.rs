//! Format-preserving document tree.
//!
//! Nodes keep the exact source text of everything they were parsed from:
//! scalars hold their quoted/escaped spelling, mapping entries and sequence
//! items hold the comment and blank lines that precede them plus whatever
//! follows the value on its line, and block collections remember the column
//! they were written at. Serializing an untouched tree therefore reproduces
//! the input byte-for-byte, and editing one entry leaves the rest alone.

use std::path::Path;

use crate::seqindent::SequenceIndentStyle;
use crate::{Error, Result};

/// Source format of a document, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Block or flow YAML, possibly several documents per file
    Yaml,
    /// JSON, one document per file, rendered back as YAML flow syntax
    Json,
}

impl Format {
    /// Pick the format for a path: `.json` is JSON, everything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// How a scalar is spelled in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block scalar
    Literal,
    /// `>` block scalar
    Folded,
}

/// A scalar value together with its source spelling.
///
/// `text` is the part written on the line that introduces the value (for
/// block scalars, the `|`/`>` header); `tail` holds any following lines
/// verbatim, indentation included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub(crate) text: String,
    pub(crate) tail: Vec<String>,
    pub(crate) style: ScalarStyle,
}

impl Scalar {
    pub(crate) fn new(text: impl Into<String>, style: ScalarStyle) -> Self {
        Self {
            text: text.into(),
            tail: Vec::new(),
            style,
        }
    }

    /// An empty (null) value, as in `key:`.
    pub fn null() -> Self {
        Self::new("", ScalarStyle::Plain)
    }

    /// A plain scalar written exactly as given.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::Plain)
    }

    /// A single-quoted scalar holding `value`.
    pub fn single_quoted(value: &str) -> Self {
        Self::new(format!("'{}'", value.replace('\'', "''")), ScalarStyle::SingleQuoted)
    }

    /// A mapping key: plain when `value` reads back unchanged, single-quoted otherwise.
    pub fn key(value: &str) -> Self {
        if needs_quotes(value) {
            Self::single_quoted(value)
        } else {
            Self::plain(value)
        }
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    /// The scalar exactly as written in the source.
    pub fn source_text(&self) -> String {
        let mut out = self.text.clone();
        for line in &self.tail {
            out.push('\n');
            out.push_str(line);
        }
        out
    }

    pub fn is_multiline(&self) -> bool {
        !self.tail.is_empty()
    }

    /// Whether this scalar is YAML null (empty, `~` or `null`).
    pub fn is_null(&self) -> bool {
        self.style == ScalarStyle::Plain
            && self.tail.is_empty()
            && matches!(self.text.as_str(), "" | "~" | "null" | "Null" | "NULL")
    }

    /// The string value with quoting and escapes removed.
    pub fn value(&self) -> String {
        match self.style {
            ScalarStyle::Plain => fold_lines(&self.text, &self.tail, true),
            ScalarStyle::SingleQuoted => {
                let folded = fold_lines(&self.text, &self.tail, false);
                strip_quotes(&folded, '\'').replace("''", "'")
            }
            ScalarStyle::DoubleQuoted => {
                let folded = fold_lines(&self.text, &self.tail, false);
                unescape_double(strip_quotes(&folded, '"'))
            }
            ScalarStyle::Literal | ScalarStyle::Folded => block_value(self),
        }
    }

    /// Compare the decoded value against `value` without allocating for plain keys.
    pub(crate) fn matches(&self, value: &str) -> bool {
        if self.style == ScalarStyle::Plain && self.tail.is_empty() {
            self.text == value
        } else {
            self.value() == value
        }
    }
}

fn fold_lines(first: &str, tail: &[String], plain: bool) -> String {
    let mut out = first.trim().to_string();
    let mut pending_breaks = 0;
    for line in content_lines(first, tail) {
        let line = if plain {
            strip_comment(line)
        } else {
            line.as_str()
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            pending_breaks += 1;
            continue;
        }
        if pending_breaks > 0 {
            out.push_str(&"\n".repeat(pending_breaks));
        } else if !out.is_empty() {
            out.push(' ');
        }
        pending_breaks = 0;
        out.push_str(trimmed);
    }
    out
}

/// Tail lines that belong to the value.
///
/// A value written on the lines below its key may be preceded by comment
/// lines; those are kept in the tail but are not part of the value.
fn content_lines<'a>(first: &str, tail: &'a [String]) -> &'a [String] {
    if !first.trim().is_empty() {
        return tail;
    }
    let start = tail
        .iter()
        .position(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .unwrap_or(tail.len());
    &tail[start..]
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t')) {
            return &line[..i];
        }
    }
    line
}

fn strip_quotes(s: &str, quote: char) -> &str {
    let s = s.strip_prefix(quote).unwrap_or(s);
    s.strip_suffix(quote).unwrap_or(s)
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(' ') => out.push(' '),
            Some('/') => out.push('/'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(c @ ('x' | 'u' | 'U')) => {
                let width = match c {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(c);
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn block_value(scalar: &Scalar) -> String {
    let indent = scalar
        .tail
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let lines: Vec<&str> = scalar
        .tail
        .iter()
        .map(|l| if l.len() >= indent { &l[indent..] } else { "" })
        .collect();
    let separator = if scalar.style == ScalarStyle::Literal {
        "\n"
    } else {
        " "
    };
    let mut out = lines.join(separator);
    if !scalar.text.contains('-') {
        out.push('\n');
    }
    out
}

/// Whether a string must be quoted to survive as a plain scalar.
fn needs_quotes(value: &str) -> bool {
    if value.is_empty() || value.trim() != value {
        return true;
    }
    if matches!(
        value,
        "~" | "null" | "Null" | "NULL" | "true" | "True" | "TRUE" | "false" | "False" | "FALSE"
    ) {
        return true;
    }
    let first = value.chars().next().unwrap_or(' ');
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.contains('\n')
        || value.parse::<f64>().is_ok()
}

/// Verbatim text of a flow collection as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlowSource {
    pub(crate) text: String,
    pub(crate) tail: Vec<String>,
}

/// How a collection is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Indentation-based collection whose keys/dashes sit at `indent`.
    ///
    /// `inline_start` is set when the first entry shares the line of a
    /// parent sequence dash (`- a: b`).
    Block { indent: usize, inline_start: bool },
    /// `{...}` / `[...]`; `source` is dropped as soon as the collection is edited.
    Flow { source: Option<FlowSource> },
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(s) if s.is_null())
    }

    /// Whether the node is written on the line that introduces it.
    pub(crate) fn is_inline(&self) -> bool {
        match self {
            Node::Scalar(s) => !s.text.is_empty() || s.tail.is_empty(),
            Node::Mapping(m) => m.is_flow(),
            Node::Sequence(s) => s.is_flow(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar(s) if s.is_null() => "null",
            Node::Scalar(_) => "scalar",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
        }
    }
}

/// How an entry came to be in its mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Read from the source
    Parsed,
    /// Added by an edit
    Inserted,
    /// Read from the source with a null value that an edit replaced
    Filled {
        separator: String,
        props: String,
        value: Box<Node>,
    },
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Blank and comment lines written above the key
    pub(crate) before: Vec<String>,
    pub(crate) key: Scalar,
    /// Everything between the key and the value (`: `, `:`)
    pub(crate) separator: String,
    /// Anchor/tag written before a value that starts on the next line
    pub(crate) props: String,
    pub(crate) value: Node,
    /// Whitespace and comment following the value on its line
    pub(crate) trailer: String,
    pub(crate) origin: Origin,
}

impl MappingEntry {
    fn inserted(key: &str, separator: &str, value: Node) -> Self {
        Self {
            before: Vec::new(),
            key: Scalar::key(key),
            separator: separator.to_string(),
            props: String::new(),
            value,
            trailer: String::new(),
            origin: Origin::Inserted,
        }
    }

    pub fn key(&self) -> &Scalar {
        &self.key
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    /// The trailing comment on the key line, if any (without the `#`).
    pub fn comment(&self) -> Option<&str> {
        comment_of(&self.trailer)
    }

    /// Comment and blank lines written above this entry.
    pub fn leading_lines(&self) -> &[String] {
        &self.before
    }
}

fn comment_of(trailer: &str) -> Option<&str> {
    trailer.trim_start().strip_prefix('#').map(str::trim)
}

/// An ordered mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub(crate) entries: Vec<MappingEntry>,
    pub(crate) layout: Layout,
}

impl Mapping {
    /// An empty block mapping whose keys sit at column `indent`.
    pub fn new_block(indent: usize) -> Self {
        Self {
            entries: Vec::new(),
            layout: Layout::Block {
                indent,
                inline_start: false,
            },
        }
    }

    /// An empty flow mapping (`{}`).
    pub fn new_flow() -> Self {
        Self {
            entries: Vec::new(),
            layout: Layout::Flow { source: None },
        }
    }

    pub fn is_flow(&self) -> bool {
        matches!(self.layout, Layout::Flow { .. })
    }

    /// Column of the keys, for block mappings.
    pub fn indent(&self) -> Option<usize> {
        match self.layout {
            Layout::Block { indent, .. } => Some(indent),
            Layout::Flow { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Decoded keys in source order.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.key.value())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|idx| &self.entries[idx].value)
    }

    /// Mutable access to a value. Drops the verbatim text of a flow mapping.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        let idx = self.position(key)?;
        self.touch();
        Some(&mut self.entries[idx].value)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key.matches(key))
    }

    /// Forget the verbatim source of a flow mapping; it is re-rendered from the tree.
    fn touch(&mut self) {
        if let Layout::Flow { source } = &mut self.layout {
            *source = None;
        }
    }

    fn child_layout(&self, indent_step: usize) -> Layout {
        match self.layout {
            Layout::Block { indent, .. } => Layout::Block {
                indent: indent + indent_step,
                inline_start: false,
            },
            Layout::Flow { .. } => Layout::Flow { source: None },
        }
    }

    fn separator_for(&self, value: &Node) -> &'static str {
        if self.is_flow() || value.is_inline() {
            ": "
        } else {
            ":"
        }
    }

    /// Set `key` to `value`.
    ///
    /// An existing entry keeps its position, its key spelling and the comments
    /// around it; otherwise a new entry is appended.
    pub fn set(&mut self, key: &str, value: Node) {
        self.touch();
        let separator = self.separator_for(&value);
        match self.position(key) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if value.is_inline() {
                    if !entry.separator.ends_with([' ', '\t']) {
                        entry.separator.push(' ');
                    }
                } else {
                    entry.separator = entry.separator.trim_end().to_string();
                }
                entry.props.clear();
                entry.value = value;
            }
            None => self
                .entries
                .push(MappingEntry::inserted(key, separator, value)),
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.position(key)?;
        self.touch();
        Some(self.entries.remove(idx).value)
    }

    /// Return the mapping stored under `key`, creating it when the key is
    /// missing or holds null.
    ///
    /// A new block mapping is indented `indent_step` columns deeper than this
    /// one; under a flow mapping the new mapping is a flow mapping too. Fails
    /// when the key holds something other than a mapping or null.
    pub fn ensure_mapping(&mut self, key: &str, indent_step: usize) -> Result<&mut Mapping> {
        self.touch();
        let child = Mapping {
            entries: Vec::new(),
            layout: self.child_layout(indent_step),
        };
        let flow = self.is_flow();
        let idx = match self.position(key) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if entry.value.is_null() {
                    let separator = if flow {
                        entry.separator.clone()
                    } else {
                        entry.separator.trim_end().to_string()
                    };
                    let old_separator = std::mem::replace(&mut entry.separator, separator);
                    let old_props = std::mem::take(&mut entry.props);
                    let old_value = std::mem::replace(&mut entry.value, Node::Mapping(child));
                    entry.origin = Origin::Filled {
                        separator: old_separator,
                        props: old_props,
                        value: Box::new(old_value),
                    };
                }
                idx
            }
            None => {
                let separator = if flow { ": " } else { ":" };
                self.entries
                    .push(MappingEntry::inserted(key, separator, Node::Mapping(child)));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[idx].value {
            Node::Mapping(m) => Ok(m),
            other => Err(Error::invalid_structure(format!(
                "`{}` holds a {}, expected a mapping",
                key,
                other.kind_name()
            ))),
        }
    }

    /// Undo [`Mapping::ensure_mapping`] for `key` once the mapping it made is empty.
    ///
    /// An entry the edit inserted is removed; an entry whose null value was
    /// filled gets that null back. Entries read from the source are left alone.
    /// Returns whether anything changed.
    pub fn discard_if_empty(&mut self, key: &str) -> bool {
        let Some(idx) = self.position(key) else {
            return false;
        };
        let empty = matches!(&self.entries[idx].value, Node::Mapping(m) if m.is_empty());
        if !empty {
            return false;
        }
        match self.entries[idx].origin.clone() {
            Origin::Parsed => false,
            Origin::Inserted => {
                self.touch();
                self.entries.remove(idx);
                true
            }
            Origin::Filled {
                separator,
                props,
                value,
            } => {
                self.touch();
                let entry = &mut self.entries[idx];
                entry.separator = separator;
                entry.props = props;
                entry.value = *value;
                entry.origin = Origin::Parsed;
                true
            }
        }
    }
}

/// One item of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceItem {
    /// Blank and comment lines written above the dash
    pub(crate) before: Vec<String>,
    /// Whitespace between the dash and the value
    pub(crate) gap: String,
    pub(crate) props: String,
    pub(crate) value: Node,
    pub(crate) trailer: String,
}

impl SequenceItem {
    pub fn value(&self) -> &Node {
        &self.value
    }

    pub fn comment(&self) -> Option<&str> {
        comment_of(&self.trailer)
    }
}

/// An ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub(crate) items: Vec<SequenceItem>,
    pub(crate) layout: Layout,
}

impl Sequence {
    /// An empty block sequence whose dashes sit at column `indent`.
    pub fn new_block(indent: usize) -> Self {
        Self {
            items: Vec::new(),
            layout: Layout::Block {
                indent,
                inline_start: false,
            },
        }
    }

    /// An empty flow sequence (`[]`).
    pub fn new_flow() -> Self {
        Self {
            items: Vec::new(),
            layout: Layout::Flow { source: None },
        }
    }

    pub fn is_flow(&self) -> bool {
        matches!(self.layout, Layout::Flow { .. })
    }

    /// Column of the dashes, for block sequences.
    pub fn indent(&self) -> Option<usize> {
        match self.layout {
            Layout::Block { indent, .. } => Some(indent),
            Layout::Flow { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.items.get(idx).map(|i| &i.value)
    }

    /// Append an inline value.
    pub fn push(&mut self, value: Node) {
        if let Layout::Flow { source } = &mut self.layout {
            *source = None;
        }
        self.items.push(SequenceItem {
            before: Vec::new(),
            gap: " ".to_string(),
            props: String::new(),
            value,
            trailer: String::new(),
        });
    }
}

/// One document of a file: the root node plus the text around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// `%` directive lines, written before an explicit `---`
    pub(crate) directives: Vec<String>,
    /// Blank and comment lines before the root node
    pub(crate) head: Vec<String>,
    /// Text before the root on its first line (indentation, anchor, tag)
    pub(crate) root_lead: String,
    pub(crate) root: Node,
    /// Whitespace and comment after the root's first line
    pub(crate) root_trailer: String,
    /// Blank and comment lines after the root node
    pub(crate) foot: Vec<String>,
    pub(crate) format: Format,
    pub(crate) sequence_indent: Option<SequenceIndentStyle>,
}

impl Document {
    /// A document holding `root` and nothing else.
    pub fn new(root: Node, format: Format) -> Self {
        Self {
            directives: Vec::new(),
            head: Vec::new(),
            root_lead: String::new(),
            root,
            root_trailer: String::new(),
            foot: Vec::new(),
            format,
            sequence_indent: None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Sequence indentation style detected in the document's source file.
    pub fn sequence_indent(&self) -> Option<SequenceIndentStyle> {
        self.sequence_indent
    }

    /// Comment lines before the root node.
    pub fn head_comments(&self) -> &[String] {
        &self.head
    }

    /// Indentation step used by nested block mappings (2 when there are none).
    pub fn indent_step(&self) -> usize {
        find_indent_step(&self.root).unwrap_or(2)
    }

    /// Replace the root with a mapping holding the old root under `key`.
    pub fn wrap_root(&mut self, key: &str) {
        let inner = std::mem::replace(&mut self.root, Node::Mapping(Mapping::new_block(0)));
        if let Node::Mapping(m) = &mut self.root {
            m.set(key, inner);
        }
        self.root_lead.clear();
        self.root_trailer.clear();
    }
}

fn find_indent_step(node: &Node) -> Option<usize> {
    match node {
        Node::Mapping(m) => {
            if let Some(parent) = m.indent() {
                for entry in &m.entries {
                    if let Node::Mapping(child) = &entry.value {
                        match child.indent() {
                            Some(ci) if ci > parent => return Some(ci - parent),
                            _ => {}
                        }
                    }
                }
            }
            m.entries.iter().find_map(|e| find_indent_step(&e.value))
        }
        Node::Sequence(s) => s.items.iter().find_map(|i| find_indent_step(&i.value)),
        Node::Scalar(_) => None,
    }
}

//! Lossless parsing of YAML and JSON files into [`Document`]s.
//!
//! YAML files are checked with yaml-rust2 first, so the layout parser below
//! only ever sees well-formed input. The file is then split into documents at
//! `---`/`...` marker lines and each document is read line by line, keeping
//! every comment, blank line and spelling it meets.

use yaml_rust2::YamlLoader;

use crate::error::{Error, Result};
use crate::flow;
use crate::node::{
    Document, FlowSource, Format, Layout, Mapping, MappingEntry, Node, Origin, Scalar,
    ScalarStyle, Sequence, SequenceItem,
};
use crate::seqindent;
use crate::source_info::SourceInfo;

/// Parse file content in the given format.
///
/// Empty or whitespace-only content yields no documents.
pub fn parse(content: &str, format: Format) -> Result<Vec<Document>> {
    match format {
        Format::Yaml => parse_yaml(content),
        Format::Json => parse_json(content),
    }
}

/// Parse a YAML stream into its documents.
///
/// Documents that hold nothing but comments are dropped; their comment lines
/// move to the head of the next document (or the foot of the previous one at
/// the end of the file). Every document records the sequence indentation
/// style detected for the file.
///
/// # Example
///
/// ```
/// use kio_yaml::parse_yaml;
///
/// let docs = parse_yaml("a: b # note\n---\nc: [d]\n").unwrap();
/// assert_eq!(docs.len(), 2);
/// assert_eq!(docs[0].to_string(), "a: b # note\n");
/// ```
pub fn parse_yaml(content: &str) -> Result<Vec<Document>> {
    let src = normalize_newlines(content);
    if src.trim().is_empty() {
        return Ok(Vec::new());
    }
    YamlLoader::load_from_str(&src)?;

    let lines = split_lines(&src);
    let mut documents: Vec<Document> = Vec::new();
    let mut carried: Vec<String> = Vec::new();
    for segment in split_documents(&lines) {
        let mut parser = BlockParser::new(&src, segment.lines);
        match parser.parse_document()? {
            Some(mut doc) => {
                doc.directives = segment.directives;
                if !carried.is_empty() {
                    carried.append(&mut doc.head);
                    doc.head = std::mem::take(&mut carried);
                }
                documents.push(doc);
            }
            None => carried.extend(parser.lines.iter().map(|l| l.text.to_string())),
        }
    }
    if let Some(last) = documents.last_mut() {
        last.foot.append(&mut carried);
    }

    let style = seqindent::detect_for_file(&documents);
    for doc in &mut documents {
        doc.sequence_indent = Some(style);
    }
    Ok(documents)
}

/// Parse a JSON file into its single document.
///
/// The tree keeps key order and scalar spelling; it renders as one line of
/// YAML flow syntax.
pub fn parse_json(content: &str) -> Result<Vec<Document>> {
    let src = normalize_newlines(content);
    if src.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<serde::de::IgnoredAny>(&src)?;
    let root = flow::parse_flow(&src, SourceInfo::default())?;
    Ok(vec![Document::new(root, Format::Json)])
}

fn normalize_newlines(content: &str) -> String {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content.replace("\r\n", "\n")
}

/// One line of the normalized source.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    /// Byte offset of `text` in the source
    offset: usize,
    /// 1-based line number
    number: usize,
}

fn split_lines(src: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (idx, text) in src.split('\n').enumerate() {
        lines.push(Line {
            text,
            offset,
            number: idx + 1,
        });
        offset += text.len() + 1;
    }
    if src.ends_with('\n') {
        lines.pop();
    }
    lines
}

#[derive(Debug, Default)]
struct Segment<'a> {
    directives: Vec<String>,
    lines: Vec<Line<'a>>,
}

/// Text following a `---`/`...` marker, if the line is one.
fn marker_rest<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(marker)?;
    (rest.is_empty() || rest.starts_with([' ', '\t'])).then_some(rest)
}

/// Split a stream at document markers.
///
/// Whatever follows a marker on its line stays with the document the marker
/// opens, as the first line of its body.
fn split_documents<'a>(lines: &[Line<'a>]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut current = Segment::default();
    let mut in_prolog = true;
    for line in lines {
        let text = line.text;
        let start = marker_rest(text, "---").map(|rest| (rest, true));
        let start = start.or_else(|| marker_rest(text, "...").map(|rest| (rest, false)));
        if let Some((rest, opens)) = start {
            let directives = if opens {
                std::mem::take(&mut current.directives)
            } else {
                Vec::new()
            };
            segments.push(std::mem::take(&mut current));
            current.directives = directives;
            in_prolog = !opens;
            let body = rest.trim_start();
            if !body.is_empty() {
                current.lines.push(Line {
                    text: body,
                    offset: line.offset + (text.len() - body.len()),
                    number: line.number,
                });
            }
            continue;
        }
        if in_prolog && text.starts_with('%') {
            current.directives.push(text.to_string());
            continue;
        }
        if !is_blank_or_comment(text) {
            in_prolog = false;
        }
        current.lines.push(*line);
    }
    segments.push(current);
    segments
}

fn is_blank_or_comment(text: &str) -> bool {
    let t = text.trim_start();
    t.is_empty() || t.starts_with('#')
}

fn indent_of(text: &str) -> usize {
    text.len() - text.trim_start_matches(' ').len()
}

fn leading_ws(text: &str) -> usize {
    text.len() - text.trim_start_matches([' ', '\t']).len()
}

fn token_len(text: &str) -> usize {
    text.find([' ', '\t']).unwrap_or(text.len())
}

fn is_seq_indicator(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn is_complex_key(content: &str) -> bool {
    content == "?" || content.starts_with("? ") || content.starts_with("?\t")
}

/// Byte index of the quote closing the scalar that opens `content`, on the same line.
fn closing_quote(content: &str, quote: u8) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b if b == quote => {
                if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Locate the `key:` part of a block mapping line.
///
/// Returns the end of the key text and the index of its colon.
fn find_mapping_colon(content: &str) -> Option<(usize, usize)> {
    let bytes = content.as_bytes();
    let first = *bytes.first()?;
    let is_colon =
        |i: usize| bytes.get(i) == Some(&b':') && matches!(bytes.get(i + 1), None | Some(b' ' | b'\t'));
    match first {
        b'#' | b'{' | b'[' | b'|' | b'>' => None,
        b'-' if is_seq_indicator(content) => None,
        b'"' | b'\'' => {
            let close = closing_quote(content, first)?;
            let colon = close + 1 + leading_ws(&content[close + 1..]);
            is_colon(colon).then_some((close + 1, colon))
        }
        _ => {
            for i in 0..bytes.len() {
                if bytes[i] == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
                    return None;
                }
                if is_colon(i) {
                    return Some((content[..i].trim_end().len(), i));
                }
            }
            None
        }
    }
}

/// Whether `content` opens with a flow collection used as a mapping key,
/// as in `[a, b]: c`.
fn is_flow_key(content: &str) -> bool {
    let bytes = content.as_bytes();
    if !matches!(bytes.first(), Some(b'[' | b'{')) {
        return false;
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let rest = &content[i + 1..];
                    let colon = leading_ws(rest);
                    return rest.as_bytes().get(colon) == Some(&b':')
                        && matches!(rest.as_bytes().get(colon + 1), None | Some(b' ' | b'\t'));
                }
            }
            b'"' | b'\'' if matches!(bytes[i - 1], b'[' | b'{' | b',' | b':' | b' ' | b'\t') => {
                match closing_quote(&content[i..], bytes[i]) {
                    Some(close) => i += close,
                    None => return false,
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// End of a plain scalar on its first line, and whether a comment follows it.
fn plain_end(text: &str, col: usize) -> (usize, bool) {
    let bytes = text.as_bytes();
    for i in col + 1..bytes.len() {
        if bytes[i] == b'#' && matches!(bytes[i - 1], b' ' | b'\t') {
            return (col + text[col..i].trim_end().len(), true);
        }
    }
    (col + text[col..].trim_end().len(), false)
}

fn key_scalar(raw: &str) -> Scalar {
    let style = match raw.as_bytes().first() {
        Some(b'"') => ScalarStyle::DoubleQuoted,
        Some(b'\'') => ScalarStyle::SingleQuoted,
        _ => ScalarStyle::Plain,
    };
    Scalar::new(raw, style)
}

/// Re-attach the source text of a node that spans lines.
fn with_source(node: Node, text: String, tail: Vec<String>) -> Node {
    match node {
        Node::Scalar(mut s) => {
            s.text = text;
            s.tail = tail;
            Node::Scalar(s)
        }
        Node::Mapping(mut m) => {
            m.layout = Layout::Flow {
                source: Some(FlowSource { text, tail }),
            };
            Node::Mapping(m)
        }
        Node::Sequence(mut s) => {
            s.layout = Layout::Flow {
                source: Some(FlowSource { text, tail }),
            };
            Node::Sequence(s)
        }
    }
}

/// Where a value sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    MappingValue,
    SequenceItem,
}

/// A parsed value together with the text around it on its first line.
struct Value {
    /// Whitespace between the indicator and the value
    lead: String,
    props: String,
    node: Node,
    trailer: String,
}

struct BlockParser<'a> {
    src: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> BlockParser<'a> {
    fn new(src: &'a str, lines: Vec<Line<'a>>) -> Self {
        Self { src, lines, pos: 0 }
    }

    fn line(&self) -> Option<&'a str> {
        self.lines.get(self.pos).map(|l| l.text)
    }

    fn location(&self, idx: usize, col: usize) -> SourceInfo {
        match self.lines.get(idx) {
            Some(line) => {
                let col = line.text.get(..col).map_or(col, |s| s.chars().count());
                SourceInfo::new(line.number, col + 1)
            }
            None => {
                let number = self.lines.last().map_or(1, |l| l.number + 1);
                SourceInfo::new(number, 1)
            }
        }
    }

    fn check_indent(&self, text: &str) -> Result<()> {
        let indent = indent_of(text);
        if text[indent..].starts_with('\t') {
            return Err(Error::unsupported(
                "tab characters used for indentation",
                self.location(self.pos, indent),
            ));
        }
        Ok(())
    }

    /// Consume blank and comment lines.
    fn collect_pending(&mut self) -> Vec<String> {
        let mut pending = Vec::new();
        while let Some(text) = self.line() {
            if !is_blank_or_comment(text) {
                break;
            }
            pending.push(text.to_string());
            self.pos += 1;
        }
        pending
    }

    fn parse_document(&mut self) -> Result<Option<Document>> {
        let head = self.collect_pending();
        if self.pos >= self.lines.len() {
            return Ok(None);
        }
        let value = self.parse_value(-1, 0, Context::Root)?;
        let foot = self.collect_pending();
        if let Some(text) = self.line() {
            return Err(Error::syntax(
                "unexpected content after the document root",
                self.location(self.pos, indent_of(text)),
            ));
        }

        let block_root = !value.node.is_inline() && !matches!(value.node, Node::Scalar(_));
        let mut doc = Document::new(value.node, Format::Yaml);
        doc.head = head;
        doc.foot = foot;
        doc.root_trailer = value.trailer;
        if !block_root || !value.props.is_empty() {
            doc.root_lead = format!("{}{}", value.lead, value.props);
        }
        Ok(Some(doc))
    }

    /// Parse the value that follows an indicator ending at `col` on the current line.
    ///
    /// `parent` is the column of the owning key or dash, -1 at the root.
    fn parse_value(&mut self, parent: isize, col: usize, ctx: Context) -> Result<Value> {
        let text = self.lines[self.pos].text;
        let ws_end = col + leading_ws(&text[col..]);
        let rest = &text[ws_end..];
        if rest.is_empty() || rest.starts_with('#') {
            self.pos += 1;
            let node = self.parse_nested(parent, ctx)?;
            return Ok(Value {
                lead: String::new(),
                props: String::new(),
                node,
                trailer: text[col..].to_string(),
            });
        }

        let mut props_end = ws_end;
        let mut content_start = ws_end;
        while text[content_start..].starts_with(['&', '!']) {
            props_end = content_start + token_len(&text[content_start..]);
            content_start = props_end + leading_ws(&text[props_end..]);
        }
        let lead = text[col..ws_end].to_string();
        let content = &text[content_start..];
        if props_end > ws_end && (content.is_empty() || content.starts_with('#')) {
            self.pos += 1;
            let node = self.parse_nested(parent, ctx)?;
            return Ok(Value {
                lead,
                props: text[ws_end..props_end].to_string(),
                node,
                trailer: text[props_end..].to_string(),
            });
        }

        let props = text[ws_end..content_start].to_string();
        if ctx != Context::MappingValue {
            if is_complex_key(content) {
                return Err(Error::unsupported(
                    "explicit `?` mapping keys",
                    self.location(self.pos, content_start),
                ));
            }
            if is_flow_key(content) {
                return Err(Error::unsupported(
                    "flow collections as mapping keys",
                    self.location(self.pos, content_start),
                ));
            }
            let collection = is_seq_indicator(content) || find_mapping_colon(content).is_some();
            if collection && ctx == Context::Root && !props.is_empty() {
                return Err(Error::unsupported(
                    "anchors or tags on a collection sharing its first line",
                    self.location(self.pos, ws_end),
                ));
            }
            let inline_start = ctx == Context::SequenceItem;
            if is_seq_indicator(content) {
                let seq = self.parse_block_sequence(content_start, inline_start)?;
                return Ok(Value {
                    lead,
                    props,
                    node: Node::Sequence(seq),
                    trailer: String::new(),
                });
            }
            if collection {
                let map = self.parse_block_mapping(content_start, inline_start)?;
                return Ok(Value {
                    lead,
                    props,
                    node: Node::Mapping(map),
                    trailer: String::new(),
                });
            }
        }

        let (node, trailer) = self.parse_inline(parent, content_start)?;
        Ok(Value {
            lead,
            props,
            node,
            trailer,
        })
    }

    /// Parse a value that starts on a line below its key or dash.
    ///
    /// Leaves the blank and comment lines in place when there is no such
    /// value, so they attach to whatever comes next.
    fn parse_nested(&mut self, parent: isize, ctx: Context) -> Result<Node> {
        let start = self.pos;
        let pending = self.collect_pending();
        let Some(text) = self.line() else {
            self.pos = start;
            return Ok(Node::Scalar(Scalar::null()));
        };
        self.check_indent(text)?;
        let indent = indent_of(text);
        let content = &text[indent..];

        if indent as isize > parent {
            if is_complex_key(content) {
                return Err(Error::unsupported(
                    "explicit `?` mapping keys",
                    self.location(self.pos, indent),
                ));
            }
            if is_flow_key(content) {
                return Err(Error::unsupported(
                    "flow collections as mapping keys",
                    self.location(self.pos, indent),
                ));
            }
            if is_seq_indicator(content) {
                self.pos = start;
                return Ok(Node::Sequence(self.parse_block_sequence(indent, false)?));
            }
            if find_mapping_colon(content).is_some() {
                self.pos = start;
                return Ok(Node::Mapping(self.parse_block_mapping(indent, false)?));
            }
            // A scalar or flow collection on its own lines
            let (node, _) = self.parse_inline(parent, indent)?;
            let rest = match &node {
                Node::Scalar(s) => s.tail.clone(),
                Node::Mapping(Mapping { layout, .. }) | Node::Sequence(Sequence { layout, .. }) => {
                    match layout {
                        Layout::Flow { source: Some(src) } => src.tail.clone(),
                        _ => Vec::new(),
                    }
                }
            };
            let mut tail = pending;
            tail.push(text.to_string());
            tail.extend(rest);
            return Ok(with_source(node, String::new(), tail));
        }

        if ctx == Context::MappingValue && indent as isize == parent && is_seq_indicator(content) {
            self.pos = start;
            return Ok(Node::Sequence(self.parse_block_sequence(indent, false)?));
        }

        self.pos = start;
        Ok(Node::Scalar(Scalar::null()))
    }

    fn parse_block_mapping(&mut self, indent: usize, inline_start: bool) -> Result<Mapping> {
        let mut entries = Vec::new();
        loop {
            let start = self.pos;
            let first_inline = inline_start && entries.is_empty();
            let before = if first_inline {
                Vec::new()
            } else {
                self.collect_pending()
            };
            let Some(text) = self.line() else {
                self.pos = start;
                break;
            };
            if !first_inline {
                self.check_indent(text)?;
                if indent_of(text) != indent {
                    self.pos = start;
                    break;
                }
            }
            let content = &text[indent..];
            if is_complex_key(content) {
                return Err(Error::unsupported(
                    "explicit `?` mapping keys",
                    self.location(self.pos, indent),
                ));
            }
            if is_flow_key(content) {
                return Err(Error::unsupported(
                    "flow collections as mapping keys",
                    self.location(self.pos, indent),
                ));
            }
            let Some((key_end, colon)) = find_mapping_colon(content) else {
                if is_seq_indicator(content) && !entries.is_empty() {
                    self.pos = start;
                    break;
                }
                return Err(Error::syntax(
                    "expected a mapping key",
                    self.location(self.pos, indent),
                ));
            };
            let after_colon = indent + colon + 1;
            let key = key_scalar(&content[..key_end]);
            let value = self.parse_value(indent as isize, after_colon, Context::MappingValue)?;
            let mut separator = text[indent + key_end..after_colon].to_string();
            separator.push_str(&value.lead);
            entries.push(MappingEntry {
                before,
                key,
                separator,
                props: value.props,
                value: value.node,
                trailer: value.trailer,
                origin: Origin::Parsed,
            });
        }
        Ok(Mapping {
            entries,
            layout: Layout::Block {
                indent,
                inline_start,
            },
        })
    }

    fn parse_block_sequence(&mut self, indent: usize, inline_start: bool) -> Result<Sequence> {
        let mut items = Vec::new();
        loop {
            let start = self.pos;
            let first_inline = inline_start && items.is_empty();
            let before = if first_inline {
                Vec::new()
            } else {
                self.collect_pending()
            };
            let Some(text) = self.line() else {
                self.pos = start;
                break;
            };
            if !first_inline {
                self.check_indent(text)?;
                if indent_of(text) != indent {
                    self.pos = start;
                    break;
                }
            }
            if !is_seq_indicator(&text[indent..]) {
                self.pos = start;
                break;
            }
            let value = self.parse_value(indent as isize, indent + 1, Context::SequenceItem)?;
            items.push(SequenceItem {
                before,
                gap: value.lead,
                props: value.props,
                value: value.node,
                trailer: value.trailer,
            });
        }
        Ok(Sequence {
            items,
            layout: Layout::Block {
                indent,
                inline_start,
            },
        })
    }

    /// Parse a scalar or flow collection starting at `col` of the current line.
    fn parse_inline(&mut self, parent: isize, col: usize) -> Result<(Node, String)> {
        let text = self.lines[self.pos].text;
        match text.as_bytes().get(col) {
            Some(b'"' | b'\'' | b'{' | b'[') => self.parse_spanning(col),
            Some(b'|' | b'>') => Ok(self.parse_block_scalar(parent, col)),
            _ => Ok(self.parse_plain(parent, col)),
        }
    }

    /// Quoted scalars and flow collections, which may continue over several lines.
    fn parse_spanning(&mut self, col: usize) -> Result<(Node, String)> {
        let first = self.lines[self.pos];
        let start = first.offset + col;
        let base = self.location(self.pos, col);
        let (node, used) = flow::parse_prefix(&self.src[start..], base)?;
        let end = start + used;

        let mut last = self.pos;
        while last + 1 < self.lines.len() && self.lines[last + 1].offset < end {
            last += 1;
        }
        let last_line = self.lines[last];
        let end_col = end - last_line.offset;
        if end_col > last_line.text.len() {
            return Err(Error::syntax(
                "value runs past the end of the document",
                self.location(last, last_line.text.len()),
            ));
        }
        if !is_blank_or_comment(&last_line.text[end_col..]) {
            return Err(Error::unsupported(
                "content following a quoted scalar or flow collection",
                self.location(last, end_col),
            ));
        }

        let result = if last == self.pos {
            (
                with_source(node, first.text[col..end_col].to_string(), Vec::new()),
                first.text[end_col..].to_string(),
            )
        } else {
            let tail = self.lines[self.pos + 1..=last]
                .iter()
                .map(|l| l.text.to_string())
                .collect();
            (
                with_source(node, first.text[col..].to_string(), tail),
                String::new(),
            )
        };
        self.pos = last + 1;
        Ok(result)
    }

    fn parse_block_scalar(&mut self, parent: isize, col: usize) -> (Node, String) {
        let text = self.lines[self.pos].text;
        let header_end = col + token_len(&text[col..]);
        let header = &text[col..header_end];
        let explicit = header.bytes().any(|b| b.is_ascii_digit());
        self.pos += 1;

        let mut body_indent: Option<usize> = None;
        let mut idx = self.pos;
        let mut end = self.pos;
        while let Some(line) = self.lines.get(idx) {
            if line.text.trim().is_empty() {
                idx += 1;
                continue;
            }
            let indent = indent_of(line.text);
            if indent as isize <= parent {
                break;
            }
            if !explicit {
                match body_indent {
                    None => body_indent = Some(indent),
                    Some(required) if indent < required => break,
                    Some(_) => {}
                }
            }
            idx += 1;
            end = idx;
        }
        let tail = self.lines[self.pos..end]
            .iter()
            .map(|l| l.text.to_string())
            .collect();
        self.pos = end;

        let style = if header.starts_with('|') {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        let scalar = Scalar {
            text: header.to_string(),
            tail,
            style,
        };
        (Node::Scalar(scalar), text[header_end..].to_string())
    }

    fn parse_plain(&mut self, parent: isize, col: usize) -> (Node, String) {
        let text = self.lines[self.pos].text;
        let (value_end, commented) = plain_end(text, col);
        self.pos += 1;

        if !commented {
            let mut idx = self.pos;
            let mut end = self.pos;
            while let Some(line) = self.lines.get(idx) {
                if line.text.trim().is_empty() {
                    idx += 1;
                    continue;
                }
                let indent = indent_of(line.text);
                if indent as isize <= parent || line.text[indent..].starts_with('#') {
                    break;
                }
                idx += 1;
                end = idx;
                if plain_end(line.text, indent).1 {
                    break;
                }
            }
            if end > self.pos {
                let tail = self.lines[self.pos..end]
                    .iter()
                    .map(|l| l.text.to_string())
                    .collect();
                self.pos = end;
                let scalar = Scalar {
                    text: text[col..].to_string(),
                    tail,
                    style: ScalarStyle::Plain,
                };
                return (Node::Scalar(scalar), String::new());
            }
        }

        (
            Node::Scalar(Scalar::plain(&text[col..value_end])),
            text[value_end..].to_string(),
        )
    }
}

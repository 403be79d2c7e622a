//! Flow-style parsing: `{...}` mappings, `[...]` sequences and quoted scalars.
//!
//! JSON documents go through here as a whole; YAML documents use it for
//! flow collections and quoted scalars embedded in block structure.

use crate::error::{Error, Result};
use crate::node::{Layout, Mapping, MappingEntry, Node, Origin, Scalar, ScalarStyle, Sequence, SequenceItem};
use crate::source_info::SourceInfo;

/// Parse a complete flow node; only whitespace and comments may follow it.
pub(crate) fn parse_flow(text: &str, base: SourceInfo) -> Result<Node> {
    let mut parser = FlowParser::new(text, base);
    let node = parser.parse_node()?;
    parser.skip_ws();
    if parser.pos < text.len() {
        return Err(Error::syntax(
            "unexpected content after value",
            parser.location(parser.pos),
        ));
    }
    Ok(node)
}

/// Parse the node that starts at the beginning of `text`.
///
/// Returns the node and the number of bytes it spans; whatever follows is
/// left to the caller.
pub(crate) fn parse_prefix(text: &str, base: SourceInfo) -> Result<(Node, usize)> {
    let mut parser = FlowParser::new(text, base);
    let node = parser.parse_node()?;
    Ok((node, parser.pos))
}

fn is_flow_indicator(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Split raw scalar text into its first line and continuation lines.
fn scalar_from_raw(raw: &str, style: ScalarStyle) -> Scalar {
    let mut lines = raw.split('\n');
    let text = lines.next().unwrap_or_default().to_string();
    Scalar {
        text,
        tail: lines.map(str::to_string).collect(),
        style,
    }
}

struct FlowParser<'a> {
    src: &'a str,
    pos: usize,
    base: SourceInfo,
}

impl<'a> FlowParser<'a> {
    fn new(src: &'a str, base: SourceInfo) -> Self {
        Self { src, pos: 0, base }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_after(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset..).and_then(|s| s.chars().next())
    }

    fn prev_is_ws(&self) -> bool {
        self.pos == 0 || matches!(self.src.as_bytes()[self.pos - 1], b' ' | b'\t' | b'\n')
    }

    fn location(&self, at: usize) -> SourceInfo {
        let before = &self.src[..at];
        let line = before.matches('\n').count() + 1;
        let col = match before.rfind('\n') {
            Some(idx) => before[idx + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        SourceInfo::new(line, col).offset_by(self.base)
    }

    /// Skip whitespace, line breaks and comments.
    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if is_ws(c) {
                self.pos += 1;
            } else if c == '#' && self.prev_is_ws() {
                match self.src[self.pos..].find('\n') {
                    Some(idx) => self.pos += idx,
                    None => self.pos = self.src.len(),
                }
            } else {
                break;
            }
        }
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.parse_mapping(),
            Some('[') => self.parse_sequence(),
            Some('"') => self.parse_quoted('"').map(Node::Scalar),
            Some('\'') => self.parse_quoted('\'').map(Node::Scalar),
            Some('&' | '!') => self.parse_with_props(),
            Some('?') if self.peek_after(1).is_none_or(is_ws) => Err(Error::unsupported(
                "explicit `?` mapping keys",
                self.location(self.pos),
            )),
            Some(c) if is_flow_indicator(c) => Err(Error::syntax(
                format!("unexpected `{c}`"),
                self.location(self.pos),
            )),
            Some(_) => self.parse_plain().map(Node::Scalar),
            None => Err(Error::syntax(
                "unexpected end of input",
                self.location(self.pos),
            )),
        }
    }

    fn parse_mapping(&mut self) -> Result<Node> {
        let open = self.pos;
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                None => {
                    return Err(Error::syntax(
                        "unterminated flow mapping",
                        self.location(open),
                    ));
                }
                _ => {}
            }
            let key_at = self.pos;
            let key = match self.parse_node()? {
                Node::Scalar(s) => s,
                _ => {
                    return Err(Error::unsupported(
                        "collections used as mapping keys",
                        self.location(key_at),
                    ));
                }
            };
            self.skip_ws();
            let value = if self.peek() == Some(':') {
                self.pos += 1;
                self.skip_ws();
                match self.peek() {
                    Some(',' | '}') => Node::Scalar(Scalar::null()),
                    _ => self.parse_node()?,
                }
            } else {
                Node::Scalar(Scalar::null())
            };
            entries.push(MappingEntry {
                before: Vec::new(),
                key,
                separator: ": ".to_string(),
                props: String::new(),
                value,
                trailer: String::new(),
                origin: Origin::Parsed,
            });
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(Error::syntax(
                        "expected `,` or `}` in flow mapping",
                        self.location(self.pos),
                    ));
                }
            }
        }
        Ok(Node::Mapping(Mapping {
            entries,
            layout: Layout::Flow { source: None },
        }))
    }

    fn parse_sequence(&mut self) -> Result<Node> {
        let open = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                None => {
                    return Err(Error::syntax(
                        "unterminated flow sequence",
                        self.location(open),
                    ));
                }
                _ => {}
            }
            let value = self.parse_node()?;
            self.skip_ws();
            if self.peek() == Some(':') {
                return Err(Error::unsupported(
                    "single-pair mappings inside flow sequences",
                    self.location(self.pos),
                ));
            }
            items.push(SequenceItem {
                before: Vec::new(),
                gap: String::new(),
                props: String::new(),
                value,
                trailer: String::new(),
            });
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(Error::syntax(
                        "expected `,` or `]` in flow sequence",
                        self.location(self.pos),
                    ));
                }
            }
        }
        Ok(Node::Sequence(Sequence {
            items,
            layout: Layout::Flow { source: None },
        }))
    }

    fn parse_quoted(&mut self, quote: char) -> Result<Scalar> {
        let start = self.pos;
        self.pos += 1;
        loop {
            let Some(c) = self.peek() else {
                return Err(Error::syntax(
                    "unterminated quoted scalar",
                    self.location(start),
                ));
            };
            self.pos += c.len_utf8();
            if quote == '"' && c == '\\' {
                if let Some(escaped) = self.peek() {
                    self.pos += escaped.len_utf8();
                }
            } else if c == quote {
                if quote == '\'' && self.peek() == Some('\'') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        let style = if quote == '"' {
            ScalarStyle::DoubleQuoted
        } else {
            ScalarStyle::SingleQuoted
        };
        Ok(scalar_from_raw(&self.src[start..self.pos], style))
    }

    fn parse_plain(&mut self) -> Result<Scalar> {
        let start = self.pos;
        let mut end = start;
        while let Some(c) = self.peek() {
            if is_flow_indicator(c) {
                break;
            }
            if c == ':' && self.peek_after(1).is_none_or(|n| is_ws(n) || is_flow_indicator(n)) {
                break;
            }
            if c == '#' && self.pos > start && self.prev_is_ws() {
                break;
            }
            self.pos += c.len_utf8();
            if !is_ws(c) {
                end = self.pos;
            }
        }
        self.pos = end;
        if end == start {
            return Err(Error::syntax("expected a value", self.location(start)));
        }
        Ok(scalar_from_raw(&self.src[start..end], ScalarStyle::Plain))
    }

    /// Anchors and tags are kept as part of the scalar text they decorate.
    fn parse_with_props(&mut self) -> Result<Node> {
        let start = self.pos;
        while matches!(self.peek(), Some('&' | '!')) {
            while let Some(c) = self.peek() {
                if is_ws(c) || is_flow_indicator(c) {
                    break;
                }
                self.pos += c.len_utf8();
            }
            while matches!(self.peek(), Some(' ' | '\t')) {
                self.pos += 1;
            }
        }
        let props = &self.src[start..self.pos];
        match self.peek() {
            Some(',' | ']' | '}') | None => {
                Ok(Node::Scalar(Scalar::plain(props.trim_end())))
            }
            _ => match self.parse_node()? {
                Node::Scalar(mut s) => {
                    s.text = format!("{props}{}", s.text);
                    Ok(Node::Scalar(s))
                }
                _ => Err(Error::unsupported(
                    "anchors or tags on flow collections",
                    self.location(start),
                )),
            },
        }
    }
}

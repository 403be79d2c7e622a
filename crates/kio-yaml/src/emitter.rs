//! Rendering documents back to text.
//!
//! Everything read from the source is written back as it was found. Only
//! collections that were edited after parsing (or built in code) are laid out
//! fresh: block collections at their recorded column, flow collections on a
//! single line.

use std::fmt;

use crate::node::{Document, Layout, Mapping, Node, Sequence};

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_document(&mut out, self);
        f.write_str(&out)
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn write_document(out: &mut String, doc: &Document) {
    for directive in &doc.directives {
        push_line(out, directive);
    }
    if !doc.directives.is_empty() {
        push_line(out, "---");
    }
    for line in &doc.head {
        push_line(out, line);
    }

    match &doc.root {
        Node::Mapping(m) if !m.is_flow() => {
            if !doc.root_lead.is_empty() {
                out.push_str(&doc.root_lead);
                push_line(out, &doc.root_trailer);
            }
            write_block_mapping(out, m);
        }
        Node::Sequence(s) if !s.is_flow() => {
            if !doc.root_lead.is_empty() {
                out.push_str(&doc.root_lead);
                push_line(out, &doc.root_trailer);
            }
            write_block_sequence(out, s);
        }
        node => {
            out.push_str(&doc.root_lead);
            write_inline(out, node, &doc.root_trailer);
        }
    }

    for line in &doc.foot {
        push_line(out, line);
    }
}

fn block_layout(layout: &Layout) -> (usize, bool) {
    match layout {
        Layout::Block {
            indent,
            inline_start,
        } => (*indent, *inline_start),
        Layout::Flow { .. } => (0, false),
    }
}

fn write_block_mapping(out: &mut String, mapping: &Mapping) {
    let (indent, inline_start) = block_layout(&mapping.layout);
    let pad = " ".repeat(indent);
    for (i, entry) in mapping.entries.iter().enumerate() {
        if i > 0 || !inline_start {
            for line in &entry.before {
                push_line(out, line);
            }
            out.push_str(&pad);
        }
        out.push_str(&entry.key.text);
        out.push_str(&entry.separator);
        out.push_str(&entry.props);
        write_value(out, &entry.value, &entry.trailer);
    }
}

fn write_block_sequence(out: &mut String, sequence: &Sequence) {
    let (indent, inline_start) = block_layout(&sequence.layout);
    let pad = " ".repeat(indent);
    for (i, item) in sequence.items.iter().enumerate() {
        if i > 0 || !inline_start {
            for line in &item.before {
                push_line(out, line);
            }
            out.push_str(&pad);
        }
        out.push('-');
        out.push_str(&item.gap);
        out.push_str(&item.props);
        write_value(out, &item.value, &item.trailer);
    }
}

/// Write a value that follows a key or dash, starting on the current line.
fn write_value(out: &mut String, value: &Node, trailer: &str) {
    match value {
        Node::Mapping(m) if !m.is_flow() => {
            let (_, inline_start) = block_layout(&m.layout);
            if !inline_start || m.is_empty() {
                push_line(out, trailer);
            }
            write_block_mapping(out, m);
        }
        Node::Sequence(s) if !s.is_flow() => {
            let (_, inline_start) = block_layout(&s.layout);
            if !inline_start || s.is_empty() {
                push_line(out, trailer);
            }
            write_block_sequence(out, s);
        }
        other => write_inline(out, other, trailer),
    }
}

/// Write a scalar or flow collection, its trailer and any following lines.
fn write_inline(out: &mut String, node: &Node, trailer: &str) {
    let source = match node {
        Node::Scalar(s) => Some((&s.text, &s.tail)),
        Node::Mapping(Mapping {
            layout: Layout::Flow {
                source: Some(src), ..
            },
            ..
        })
        | Node::Sequence(Sequence {
            layout: Layout::Flow {
                source: Some(src), ..
            },
            ..
        }) => Some((&src.text, &src.tail)),
        _ => None,
    };
    match source {
        Some((text, tail)) => {
            out.push_str(text);
            push_line(out, trailer);
            for line in tail {
                push_line(out, line);
            }
        }
        None => {
            if !out.is_empty() && !out.ends_with([' ', '\t', '\n']) {
                out.push(' ');
            }
            render_flow(out, node);
            push_line(out, trailer);
        }
    }
}

/// Single-line flow rendering.
fn render_flow(out: &mut String, node: &Node) {
    match node {
        Node::Scalar(s) => out.push_str(&s.source_text()),
        Node::Mapping(m) => {
            if let Some(text) = single_line_source(&m.layout) {
                out.push_str(text);
                return;
            }
            out.push('{');
            for (i, entry) in m.entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key.source_text());
                let implicit_null =
                    matches!(&entry.value, Node::Scalar(s) if s.text.is_empty() && s.tail.is_empty());
                if !implicit_null {
                    out.push_str(": ");
                    render_flow(out, &entry.value);
                }
            }
            out.push('}');
        }
        Node::Sequence(s) => {
            if let Some(text) = single_line_source(&s.layout) {
                out.push_str(text);
                return;
            }
            out.push('[');
            for (i, item) in s.items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_flow(out, &item.value);
            }
            out.push(']');
        }
    }
}

fn single_line_source(layout: &Layout) -> Option<&str> {
    match layout {
        Layout::Flow {
            source: Some(src),
        } if src.tail.is_empty() && !src.text.is_empty() => Some(&src.text),
        _ => None,
    }
}

//! XML output formatting
//!
//! The inverse of the parser for structural content. Output is not
//! byte-exact with the input: whitespace is normalized to one element per
//! line with depth indentation, and attributes with empty values are
//! dropped.

use std::io;

use crate::model::{Document, NodeId};

/// Version emitted when the document carries none
pub const DEFAULT_VERSION: &str = "1.0";
/// Encoding emitted when the document carries none
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Format a document as indented XML text
pub fn format(doc: &Document, indent_width: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<?xml version=\"{}\" encoding=\"{}\" ?>\n",
        doc.version().unwrap_or(DEFAULT_VERSION),
        doc.encoding().unwrap_or(DEFAULT_ENCODING),
    ));
    format_children(doc, doc.root(), indent_width, 0, &mut out);
    out
}

/// Format a document into an output sink
///
/// The whole document is buffered during one traversal and written in a
/// single call; sink failures surface as-is.
pub fn write_to<W: io::Write>(doc: &Document, sink: &mut W, indent_width: usize) -> io::Result<()> {
    sink.write_all(format(doc, indent_width).as_bytes())
}

fn format_children(
    doc: &Document,
    parent: NodeId,
    indent_width: usize,
    depth: usize,
    out: &mut String,
) {
    for &child in doc.node(parent).children() {
        format_node(doc, child, indent_width, depth, out);
    }
}

fn format_node(doc: &Document, id: NodeId, indent_width: usize, depth: usize, out: &mut String) {
    let node = doc.node(id);
    let tag = node.tag().unwrap_or_default();
    let pad = " ".repeat(indent_width * depth);

    out.push_str(&pad);
    out.push('<');
    out.push_str(tag);
    for attr in node.attributes() {
        if attr.value.is_empty() {
            continue;
        }
        out.push_str(&format!(" {}=\"{}\"", attr.key, attr.value));
    }

    if node.children().is_empty() && node.inner_text().is_none() {
        out.push_str(" />\n");
        return;
    }

    out.push('>');
    if node.children().is_empty() {
        out.push_str(node.inner_text().unwrap_or_default());
        out.push_str(&format!("</{tag}>\n"));
    } else {
        out.push('\n');
        format_children(doc, id, indent_width, depth + 1, out);
        out.push_str(&pad);
        out.push_str(&format!("</{tag}>\n"));
    }
}

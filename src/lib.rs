//! xparse: a small XML document engine
//!
//! This crate provides functionality to:
//! - Parse XML documents into an ordered tree
//! - Query elements and attributes of the parsed tree
//! - Format a tree back to indented XML text
//! - Handle errors with detailed position context
//!
//! # Examples
//! ```
//! use xparse::parse;
//!
//! # fn main() -> xparse::Result<()> {
//! let doc = parse(r#"<server host="localhost" port="8080" />"#)?;
//! let port = doc
//!     .children_by_tag(doc.root(), "server")
//!     .first()
//!     .and_then(|&id| doc.node(id).attribute_value("port"));
//! assert_eq!(port, Some("8080"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use tracing::{debug, error, instrument};

pub mod cursor;
pub mod error;
pub mod formatter;
pub mod input;
pub mod model;
pub mod parser;

// Re-exports
pub use error::{Construct, Error, ErrorKind, Pos, Result};
pub use formatter::{format, write_to, DEFAULT_ENCODING, DEFAULT_VERSION};
pub use input::Input;
pub use model::{Attribute, Document, Node, NodeId};
pub use parser::{Parser, State, TagKind};

/// Parse an XML document from a string
pub fn parse(text: &str) -> Result<Document> {
    let input = Input::from_str(text);
    Parser::new(input.as_str()).parse()
}

/// Read and parse an XML document from a file
#[instrument]
pub fn load_file(path: &str) -> Result<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        error!("failed to read {path}: {e}");
        Error::new(ErrorKind::Io(e.to_string()))
    })?;

    debug!(bytes = text.len(), "file read, parsing");
    let doc = parse(&text)?;
    debug!("parsing completed");
    Ok(doc)
}

/// Format and write an XML document to a file
#[instrument(skip(doc))]
pub fn save_file(doc: &Document, path: &str, indent_width: usize) -> Result<()> {
    let out = formatter::format(doc, indent_width);
    std::fs::write(path, out).map_err(|e| {
        error!("failed to write {path}: {e}");
        Error::new(ErrorKind::Io(e.to_string()))
    })
}

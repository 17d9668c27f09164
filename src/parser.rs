//! XML parser
//!
//! A single forward pass over the input. Text accumulates until a `<`; the
//! byte after the `<` selects the construct to scan next, and each construct
//! has its own scanning method. The current-node index starts at the
//! document's synthetic root, descends on every opening tag and climbs back
//! on every closing tag.

use tracing::warn;

use crate::cursor::Cursor;
use crate::error::{Construct, Error, ErrorKind, Pos, Result};
use crate::model::{Attribute, Document, Node, NodeId};

/// Construct selected by the byte following a `<`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Text,
    ClosingTag,
    Comment,
    ProcessingInstruction,
    ElementOpen,
}

impl State {
    /// Classify the byte after an opening `<`
    ///
    /// `Comment` covers the whole `<!` family; which member it is gets
    /// decided while scanning. End of input classifies as `ElementOpen` and
    /// fails inside the tag scanner.
    pub const fn classify(next: Option<u8>) -> Self {
        match next {
            Some(b'/') => Self::ClosingTag,
            Some(b'!') => Self::Comment,
            Some(b'?') => Self::ProcessingInstruction,
            _ => Self::ElementOpen,
        }
    }
}

/// Whether a scanned tag stays open or closed itself
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Opened,
    SelfClosed,
}

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    lexeme: String,
    doc: Document,
    current: NodeId,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the input text
    pub fn new(input: &'a str) -> Self {
        let doc = Document::new();
        let current = doc.root();
        Self {
            cursor: Cursor::new(input),
            lexeme: String::new(),
            doc,
            current,
        }
    }

    /// Parse the input into a document
    pub fn parse(mut self) -> Result<Document> {
        loop {
            let text_start = self.cursor.pos();
            let text_pos = self.cursor.position();
            while let Some(b) = self.cursor.current() {
                if b == b'<' {
                    break;
                }
                self.cursor.advance();
            }
            if self.cursor.is_eof() {
                break;
            }

            let run = self.cursor.slice_from(text_start);
            self.flush_text(run, text_pos)?;

            match State::classify(self.cursor.peek(1)) {
                State::ClosingTag => self.scan_closing_tag()?,
                State::Comment => self.scan_comment_or_declaration()?,
                State::ProcessingInstruction => self.scan_instruction()?,
                State::Text | State::ElementOpen => self.scan_element()?,
            }
        }
        Ok(self.doc)
    }

    /// Assign an accumulated text run to the current node
    ///
    /// At the synthetic root a whitespace-only run is discarded (documents
    /// routinely carry newlines between top-level constructs); anything else
    /// outside an element is an error.
    fn flush_text(&mut self, run: &str, pos: Pos) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        if self.current == self.doc.root() {
            if run.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::at(ErrorKind::MisplacedText, pos));
        }
        self.doc.node_mut(self.current).set_inner_text(run);
        Ok(())
    }

    /// Scan `</name>` and climb back to the parent node
    fn scan_closing_tag(&mut self) -> Result<()> {
        let open_pos = self.cursor.position();
        self.cursor.advance_by(2);

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'>' {
                break;
            }
            self.cursor.advance();
        }
        if self.cursor.is_eof() {
            return Err(self.error_here(ErrorKind::Unterminated(Construct::ClosingTag)));
        }
        let found = self.cursor.slice_from(start).trim();

        if self.current == self.doc.root() {
            return Err(Error::at(ErrorKind::UnbalancedClose, open_pos));
        }

        let node = self.doc.node(self.current);
        let expected = node.tag().unwrap_or_default();
        if expected != found {
            return Err(Error::at(
                ErrorKind::MismatchedTag {
                    expected: expected.to_string(),
                    found: found.to_string(),
                },
                open_pos,
            ));
        }

        self.current = node.parent().unwrap_or_else(|| self.doc.root());
        self.cursor.advance();
        Ok(())
    }

    /// Scan a `<!` construct, discarding its content
    ///
    /// `<!--` comments run to `-->`. Every other member of the family
    /// (DOCTYPE and friends) is skipped to the next `>`.
    fn scan_comment_or_declaration(&mut self) -> Result<()> {
        if self.cursor.starts_with(b"<!--") {
            self.cursor.advance_by(4);
            return self.skip_until(b"-->", Construct::Comment);
        }

        warn!(
            offset = self.cursor.pos(),
            "skipping unrecognized markup declaration"
        );
        self.skip_until(b">", Construct::Comment)
    }

    /// Scan a `<?...?>` instruction
    ///
    /// Only the `<?xml` declaration is interpreted: its attributes land on a
    /// transient node that is never attached to the tree, and the document
    /// keeps whatever `version` / `encoding` it carried. Anything else is
    /// skipped to its closing `?>`.
    fn scan_instruction(&mut self) -> Result<()> {
        let is_declaration = self.cursor.starts_with(b"<?xml")
            && matches!(
                self.cursor.peek(5),
                None | Some(b' ' | b'\t' | b'\r' | b'\n' | b'?' | b'>')
            );
        if !is_declaration {
            warn!(
                offset = self.cursor.pos(),
                "skipping processing instruction"
            );
            self.cursor.advance_by(2);
            return self.skip_until(b"?>", Construct::ProcessingInstruction);
        }

        self.cursor.advance_by(5);
        let mut declaration = Node::default();
        self.scan_tag(&mut declaration)?;

        self.doc
            .set_version(declaration.attribute_value("version").map(String::from));
        self.doc
            .set_encoding(declaration.attribute_value("encoding").map(String::from));
        Ok(())
    }

    /// Scan an opening tag, attach the new node and descend into it
    fn scan_element(&mut self) -> Result<()> {
        self.cursor.advance();

        let mut node = Node::default();
        let kind = self.scan_tag(&mut node)?;
        let id = self.doc.add_child(self.current, node);
        if kind == TagKind::Opened {
            self.current = id;
        }
        Ok(())
    }

    /// Attribute scanner: consume a tag's name and attributes up to `>`
    ///
    /// The first whitespace-terminated lexeme names the tag; a lexeme
    /// terminated by `=` becomes the pending attribute key; a quoted run
    /// becomes the pending value. Whitespace only separates, it is never
    /// preserved. A `/` (or, in the declaration, `?`) directly before the
    /// `>` self-closes the tag.
    fn scan_tag(&mut self, node: &mut Node) -> Result<TagKind> {
        let mut pending_key: Option<String> = None;

        loop {
            let Some(b) = self.cursor.current() else {
                return Err(self.error_here(ErrorKind::Unterminated(Construct::Tag)));
            };

            match b {
                b'>' => {
                    self.finish_tag_name(node);
                    self.cursor.advance();
                    return Ok(TagKind::Opened);
                }
                b'/' if self.cursor.peek(1) == Some(b'>') => {
                    self.finish_tag_name(node);
                    self.cursor.advance_by(2);
                    return Ok(TagKind::SelfClosed);
                }
                b'?' if self.cursor.peek(1) == Some(b'>') => {
                    self.cursor.advance();
                }
                b'=' => {
                    self.cursor.advance();
                    pending_key = Some(std::mem::take(&mut self.lexeme));
                }
                b'"' => {
                    let quote_pos = self.cursor.position();
                    self.cursor.advance();
                    let value = self.scan_quoted_value()?;
                    let Some(key) = pending_key.take() else {
                        return Err(Error::at(ErrorKind::ValueWithoutKey, quote_pos));
                    };
                    node.push_attribute(Attribute::new(key, value));
                    self.lexeme.clear();
                }
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.cursor.advance();
                    if node.tag().is_none() && !self.lexeme.is_empty() {
                        node.set_tag(std::mem::take(&mut self.lexeme));
                    }
                }
                _ => {
                    let word = self.scan_word();
                    self.lexeme.push_str(word);
                }
            }
        }
    }

    /// If the tag has no name yet, the accumulated lexeme becomes it
    fn finish_tag_name(&mut self, node: &mut Node) {
        if node.tag().is_none() && !self.lexeme.is_empty() {
            node.set_tag(std::mem::take(&mut self.lexeme));
        }
        self.lexeme.clear();
    }

    /// Consume a run of bytes up to the next delimiter inside a tag
    fn scan_word(&mut self) -> &'a str {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            match b {
                b'>' | b'=' | b'"' | b' ' | b'\t' | b'\r' | b'\n' => break,
                b'/' | b'?' if self.cursor.peek(1) == Some(b'>') => break,
                _ => self.cursor.advance(),
            }
        }
        self.cursor.slice_from(start)
    }

    /// Consume a quoted attribute value, cursor already past the open quote
    fn scan_quoted_value(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'"' {
                let value = self.cursor.slice_from(start).to_string();
                self.cursor.advance();
                return Ok(value);
            }
            self.cursor.advance();
        }
        Err(self.error_here(ErrorKind::Unterminated(Construct::AttributeValue)))
    }

    /// Skip forward until `pattern` has been consumed
    fn skip_until(&mut self, pattern: &[u8], construct: Construct) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here(ErrorKind::Unterminated(construct)))
    }

    fn error_here(&self, kind: ErrorKind) -> Error {
        Error::at(kind, self.cursor.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Document> {
        Parser::new(input).parse()
    }

    #[test]
    fn test_classify_states() {
        assert_eq!(State::classify(Some(b'/')), State::ClosingTag);
        assert_eq!(State::classify(Some(b'!')), State::Comment);
        assert_eq!(State::classify(Some(b'?')), State::ProcessingInstruction);
        assert_eq!(State::classify(Some(b'a')), State::ElementOpen);
        assert_eq!(State::classify(None), State::ElementOpen);
    }

    #[test]
    fn test_parse_empty_input() {
        let doc = parse("").unwrap();
        assert!(doc.node(doc.root()).children().is_empty());
    }

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<root></root>").unwrap();
        let children = doc.node(doc.root()).children();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node(children[0]).tag(), Some("root"));
    }

    #[test]
    fn test_parse_inner_text() {
        let doc = parse("<greeting>hello</greeting>").unwrap();
        let id = doc.node(doc.root()).children()[0];
        assert_eq!(doc.node(id).inner_text(), Some("hello"));
    }

    #[test]
    fn test_self_closing_with_attributes() {
        let doc = parse(r#"<item id="1" name="left" />"#).unwrap();
        let id = doc.node(doc.root()).children()[0];
        let node = doc.node(id);
        assert_eq!(node.tag(), Some("item"));
        assert_eq!(node.attribute_value("id"), Some("1"));
        assert_eq!(node.attribute_value("name"), Some("left"));
        assert!(node.children().is_empty());
        assert_eq!(node.inner_text(), None);
    }

    #[test]
    fn test_self_closing_without_attributes_takes_lexeme_as_tag() {
        let doc = parse("<br/>").unwrap();
        let id = doc.node(doc.root()).children()[0];
        assert_eq!(doc.node(id).tag(), Some("br"));
    }

    #[test]
    fn test_attribute_scanner_collapses_whitespace() {
        let doc = parse("<item  id = \"1\"   next=\"2\"/>").unwrap();
        let id = doc.node(doc.root()).children()[0];
        let node = doc.node(id);
        assert_eq!(node.attribute_value("id"), Some("1"));
        assert_eq!(node.attribute_value("next"), Some("2"));
    }

    #[test]
    fn test_duplicate_attribute_keys_kept_in_order() {
        let doc = parse(r#"<item id="1" id="2"/>"#).unwrap();
        let id = doc.node(doc.root()).children()[0];
        let node = doc.node(id);
        assert_eq!(node.attributes().len(), 2);
        assert_eq!(node.attribute_value("id"), Some("1"));
    }

    #[test]
    fn test_value_without_key_rejected() {
        let err = parse(r#"<item "loose"/>"#).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValueWithoutKey);
    }

    #[test]
    fn test_declaration_harvested_from_transient_node() {
        let doc = parse("<?xml version=\"1.1\" encoding=\"ASCII\" ?>\n<a/>").unwrap();
        assert_eq!(doc.version(), Some("1.1"));
        assert_eq!(doc.encoding(), Some("ASCII"));
        // the declaration itself never lands in the tree
        assert_eq!(doc.node(doc.root()).children().len(), 1);
    }

    #[test]
    fn test_declaration_without_trailing_space() {
        let doc = parse("<?xml version=\"1.0\"?><a/>").unwrap();
        assert_eq!(doc.version(), Some("1.0"));
        assert_eq!(doc.encoding(), None);
    }

    #[test]
    fn test_foreign_instruction_skipped() {
        let doc = parse("<?php echo 1; ?><a/>").unwrap();
        assert_eq!(doc.node(doc.root()).children().len(), 1);
        assert_eq!(doc.version(), None);
    }

    #[test]
    fn test_comment_content_never_produces_nodes() {
        let doc = parse("<a><!-- <b></b> --></a>").unwrap();
        let id = doc.node(doc.root()).children()[0];
        assert!(doc.node(id).children().is_empty());
    }

    #[test]
    fn test_doctype_skipped_to_closing_angle() {
        let doc = parse("<!DOCTYPE note>\n<note/>").unwrap();
        let children = doc.node(doc.root()).children();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node(children[0]).tag(), Some("note"));
    }

    #[test]
    fn test_mismatched_tag() {
        let err = parse("<a><b></a></b>").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::MismatchedTag {
                expected: "b".to_string(),
                found: "a".to_string(),
            }
        );
    }

    #[test]
    fn test_unbalanced_close() {
        let err = parse("</a>").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnbalancedClose);
    }

    #[test]
    fn test_misplaced_text_outside_elements() {
        let err = parse("orphan<a/>").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MisplacedText);
        assert_eq!(err.pos().offset, 0);
    }

    #[test]
    fn test_whitespace_between_top_level_constructs_is_fine() {
        let doc = parse("<?xml version=\"1.0\" ?>\n<a/>\n").unwrap();
        assert_eq!(doc.node(doc.root()).children().len(), 1);
    }

    #[test]
    fn test_unterminated_tag() {
        let err = parse("<a href=\"x\"").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unterminated(Construct::Tag));
    }

    #[test]
    fn test_unterminated_closing_tag() {
        let err = parse("<a></a").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unterminated(Construct::ClosingTag));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = parse("<a><!-- never closed").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unterminated(Construct::Comment));
    }

    #[test]
    fn test_unterminated_attribute_value() {
        let err = parse("<a href=\"broken>").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Unterminated(Construct::AttributeValue)
        );
    }

    #[test]
    fn test_error_position_points_at_closing_tag() {
        let err = parse("<a><b></a>").unwrap_err();
        assert_eq!(err.pos().offset, 6);
        assert_eq!(err.pos().line, 1);
    }

    #[test]
    fn test_multibyte_text_and_values() {
        let doc = parse("<s lang=\"héh\">über</s>").unwrap();
        let id = doc.node(doc.root()).children()[0];
        let node = doc.node(id);
        assert_eq!(node.inner_text(), Some("über"));
        assert_eq!(node.attribute_value("lang"), Some("héh"));
    }

    #[test]
    fn test_nested_structure() {
        let doc = parse("<a><b><c/></b><b/></a>").unwrap();
        let a = doc.node(doc.root()).children()[0];
        let bs = doc.children_by_tag(a, "b");
        assert_eq!(bs.len(), 2);
        assert_eq!(doc.children_by_tag(bs[0], "c").len(), 1);
    }
}

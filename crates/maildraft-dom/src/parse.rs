//! HTML parsing for the fixed email-template document shape.
//!
//! This is not a general-purpose HTML parser. It handles the subset the
//! rendered templates actually use: doctype, comments, elements with
//! quoted/unquoted attributes, void elements, raw-text `<style>`/`<script>`
//! bodies, and the basic named/numeric character references. Mismatched
//! closing tags are tolerated (popped to the nearest open match, otherwise
//! ignored); truncated markup is an error.

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use crate::node::{self, Document, NodeKind};

#[derive(Debug, Error, Diagnostic)]
pub enum DomError {
    #[error("unexpected end of input while parsing {context}")]
    #[diagnostic(code(maildraft::dom::unexpected_eof))]
    UnexpectedEof { context: &'static str },

    #[error("invalid markup at byte {offset}: {message}")]
    #[diagnostic(code(maildraft::dom::invalid_markup))]
    InvalidMarkup { offset: usize, message: String },
}

pub(crate) fn parse_document(html: &str) -> Result<Document, DomError> {
    Parser {
        src: html,
        pos: 0,
        doc: Document::new(),
    }
    .run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    doc: Document,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Document, DomError> {
        let root = self.doc.root();
        let mut stack = vec![root];

        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            let parent = *stack.last().expect("stack never empties below root");

            if let Some(comment) = rest.strip_prefix("<!--") {
                let end = comment.find("-->").ok_or(DomError::UnexpectedEof {
                    context: "comment",
                })?;
                self.doc
                    .push_node(parent, NodeKind::Comment(comment[..end].to_string()));
                self.pos += 4 + end + 3;
            } else if rest.starts_with("<!") {
                let end = rest.find('>').ok_or(DomError::UnexpectedEof {
                    context: "doctype",
                })?;
                let content = rest[2..end].trim();
                // "DOCTYPE html" -> keep only the payload after the keyword
                let payload = content
                    .strip_prefix("DOCTYPE")
                    .or_else(|| content.strip_prefix("doctype"))
                    .map(str::trim)
                    .unwrap_or(content);
                self.doc
                    .push_node(parent, NodeKind::Doctype(payload.to_string()));
                self.pos += end + 1;
            } else if let Some(closing) = rest.strip_prefix("</") {
                let end = closing.find('>').ok_or(DomError::UnexpectedEof {
                    context: "closing tag",
                })?;
                let name = closing[..end].trim().to_ascii_lowercase();
                if let Some(depth) = stack
                    .iter()
                    .rposition(|&n| self.doc.tag(n) == Some(name.as_str()))
                {
                    stack.truncate(depth);
                }
                self.pos += 2 + end + 1;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                let (node, raw, closed) = self.parse_open_tag(parent)?;
                if raw {
                    let tag = self.doc.tag(node).expect("just created").to_string();
                    self.consume_raw_text(node, &tag)?;
                } else if !closed {
                    stack.push(node);
                }
            } else {
                // Text run up to the next markup. A stray '<' that does not
                // open markup is treated as text.
                let next = rest[1..].find('<').map(|i| i + 1).unwrap_or(rest.len());
                let raw = &rest[..next];
                if !raw.is_empty() {
                    self.doc
                        .push_node(parent, NodeKind::Text(decode_entities(raw)));
                }
                self.pos += next;
            }
        }

        Ok(self.doc)
    }

    /// Parse `<tag attr="v" ...>` starting at `self.pos`. Returns the new
    /// element plus whether its content is raw text and whether the tag is
    /// already closed (void or self-closing).
    fn parse_open_tag(
        &mut self,
        parent: crate::NodeId,
    ) -> Result<(crate::NodeId, bool, bool), DomError> {
        let start = self.pos;
        self.pos += 1; // '<'
        let name_start = self.pos;
        while self
            .src
            .as_bytes()
            .get(self.pos)
            .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'-')
        {
            self.pos += 1;
        }
        let tag = self.src[name_start..self.pos].to_ascii_lowercase();
        if tag.is_empty() {
            return Err(DomError::InvalidMarkup {
                offset: start,
                message: "empty tag name".to_string(),
            });
        }

        let mut attrs: Vec<(SmolStr, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let Some(&b) = self.src.as_bytes().get(self.pos) else {
                return Err(DomError::UnexpectedEof { context: "tag" });
            };
            match b {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' => {
                    self.pos += 1;
                    self_closing = true;
                }
                _ => {
                    let (name, value) = self.parse_attr()?;
                    attrs.push((name, value));
                }
            }
        }

        let node = self.doc.push_node(
            parent,
            NodeKind::Element {
                tag: SmolStr::new(&tag),
                attrs,
                children: Vec::new(),
            },
        );
        let closed = self_closing || node::is_void(&tag);
        Ok((node, !closed && node::is_raw_text(&tag), closed))
    }

    fn parse_attr(&mut self) -> Result<(SmolStr, String), DomError> {
        let name_start = self.pos;
        while self
            .src
            .as_bytes()
            .get(self.pos)
            .is_some_and(|&b| !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/')
        {
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_ascii_lowercase();
        if name.is_empty() {
            return Err(DomError::InvalidMarkup {
                offset: name_start,
                message: "empty attribute name".to_string(),
            });
        }
        self.skip_whitespace();
        if self.src.as_bytes().get(self.pos) != Some(&b'=') {
            // Bare attribute.
            return Ok((SmolStr::new(&name), String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.src.as_bytes().get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let value_start = self.pos;
                let end = self.src[self.pos..]
                    .find(quote as char)
                    .ok_or(DomError::UnexpectedEof {
                        context: "attribute value",
                    })?;
                self.pos += end + 1;
                &self.src[value_start..value_start + end]
            }
            Some(_) => {
                let value_start = self.pos;
                while self
                    .src
                    .as_bytes()
                    .get(self.pos)
                    .is_some_and(|&b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                &self.src[value_start..self.pos]
            }
            None => {
                return Err(DomError::UnexpectedEof {
                    context: "attribute value",
                })
            }
        };
        Ok((SmolStr::new(&name), decode_entities(value)))
    }

    /// Consume content of a raw-text element up to its matching close tag.
    fn consume_raw_text(&mut self, node: crate::NodeId, tag: &str) -> Result<(), DomError> {
        let close = format!("</{tag}");
        let rest = &self.src[self.pos..];
        let lower = rest.to_ascii_lowercase();
        let end = lower.find(&close).ok_or(DomError::UnexpectedEof {
            context: "raw text element",
        })?;
        if end > 0 {
            self.doc
                .push_node(node, NodeKind::Text(rest[..end].to_string()));
        }
        let tail = self.src[self.pos + end..]
            .find('>')
            .ok_or(DomError::UnexpectedEof {
                context: "raw text close tag",
            })?;
        self.pos += end + tail + 1;
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self
            .src
            .as_bytes()
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }
}

/// Decode the character references the templates actually contain.
/// Unknown references pass through verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        // References are short; give up after a dozen chars.
        let Some(semi) = rest
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .map(|(i, _)| i)
        else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn test_parse_doctype_and_comment() {
        let d = Document::parse("<!DOCTYPE html><!-- hi --><html><body></body></html>").unwrap();
        assert!(d.to_html().starts_with("<!DOCTYPE html><!-- hi --><html>"));
    }

    #[test]
    fn test_parse_attrs_variants() {
        let d = Document::parse(
            r#"<html><body><p id="a" class='b c' hidden data-n=5>t</p></body></html>"#,
        )
        .unwrap();
        let p = d.element_by_id("a").unwrap();
        assert_eq!(d.attr(p, "class"), Some("b c"));
        assert_eq!(d.attr(p, "hidden"), Some(""));
        assert_eq!(d.attr(p, "data-n"), Some("5"));
    }

    #[test]
    fn test_parse_uppercase_normalized() {
        let d = Document::parse(r#"<HTML><BODY><P ID="a">t</P></BODY></HTML>"#).unwrap();
        assert!(d.element_by_id("a").is_some());
        assert!(d.to_html().contains("<p id=\"a\">t</p>"));
    }

    #[test]
    fn test_raw_text_style_kept_verbatim() {
        let d = Document::parse(
            "<html><head><style>.x > a { color: red; }</style></head><body></body></html>",
        )
        .unwrap();
        assert!(d.to_html().contains(".x > a { color: red; }"));
    }

    #[test]
    fn test_void_and_self_closing() {
        let d = Document::parse(r#"<html><body><img src="a.png"><br/><p id="x">t</p></body></html>"#)
            .unwrap();
        assert!(d.element_by_id("x").is_some());
        assert!(d.to_html().contains(r#"<img src="a.png"><br><p id="x">t</p>"#));
    }

    #[test]
    fn test_mismatched_close_tolerated() {
        let d = Document::parse("<html><body><p id=\"x\">t</span></p></body></html>").unwrap();
        assert_eq!(d.text_content(d.element_by_id("x").unwrap()), "t");
    }

    #[test]
    fn test_truncated_tag_is_error() {
        assert!(Document::parse("<html><body><p id=\"x").is_err());
    }

    #[test]
    fn test_entities_decoded() {
        let d = Document::parse("<html><body><p id=\"x\">A &amp; B&#174;&nbsp;&#x41;</p></body></html>")
            .unwrap();
        assert_eq!(
            d.text_content(d.element_by_id("x").unwrap()),
            "A & B\u{ae}\u{a0}A"
        );
    }
}

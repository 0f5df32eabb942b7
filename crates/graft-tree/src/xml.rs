//! XML rendering and a small XML reader for [`Tree`].
//!
//! Only the subset of XML the wire format needs is supported: a prolog
//! with declaration, comments and doctype, elements with quoted
//! attributes, text, CDATA sections and entity/character references.

use crate::{Result, Tree, TreeError};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const MAX_DEPTH: usize = 4096;

pub(crate) fn render(tree: &Tree) -> String {
    let mut out = String::from(DECLARATION);
    out.push('\n');
    write_node(&mut out, tree, 0);
    out.truncate(out.trim_end().len());
    out
}

fn write_node(out: &mut String, node: &Tree, depth: usize) {
    let indent = " ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in &node.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }

    match (node.children.is_empty(), node.text()) {
        (true, None) => out.push_str("/>\n"),
        (true, Some(text)) => {
            out.push('>');
            escape_into(out, text, false);
            out.push_str("</");
            out.push_str(&node.tag);
            out.push_str(">\n");
        }
        (false, text) => {
            out.push_str(">\n");
            for child in &node.children {
                write_node(out, child, depth + 1);
            }
            if let Some(text) = text {
                out.push_str(&indent);
                out.push(' ');
                escape_into(out, text, false);
                out.push('\n');
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(&node.tag);
            out.push_str(">\n");
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\r' if attribute => out.push_str("&#13;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
}

/// Parse an XML document into a [`Tree`] rooted at its document element.
pub fn parse(src: &str) -> Result<Tree> {
    let mut reader = Reader { src, pos: 0 };
    reader.skip_misc(true)?;
    if reader.at_end() {
        return Err(reader.error("no document element"));
    }
    let root = reader.element(0)?;
    reader.skip_misc(false)?;
    if !reader.at_end() {
        return Err(reader.error("content after document element"));
    }
    Ok(root)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn error(&self, message: impl Into<String>) -> TreeError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        TreeError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn skip_until(&mut self, terminator: &str, what: &str) -> Result<&'a str> {
        match self.rest().find(terminator) {
            Some(idx) => {
                let body = &self.rest()[..idx];
                self.bump(idx + terminator.len());
                Ok(body)
            }
            None => Err(self.error(format!("unterminated {}", what))),
        }
    }

    /// Skip whitespace, comments and processing instructions; in the
    /// prolog also the doctype.
    fn skip_misc(&mut self, prolog: bool) -> Result<()> {
        loop {
            self.skip_ws();
            if self.starts_with("<?") {
                self.skip_until("?>", "processing instruction")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->", "comment")?;
            } else if prolog && self.starts_with("<!DOCTYPE") {
                self.skip_until(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.bump(len);
        Ok(&rest[..len])
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.starts_with(token) {
            self.bump(token.len());
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn element(&mut self, depth: usize) -> Result<Tree> {
        if depth > MAX_DEPTH {
            return Err(self.error("document nested too deeply"));
        }
        self.expect("<")?;
        let mut node = Tree::new(self.name()?);

        loop {
            self.skip_ws();
            if self.starts_with("/>") {
                self.bump(2);
                return Ok(node);
            }
            if self.starts_with(">") {
                self.bump(1);
                break;
            }
            let name = self.name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let quote = match self.peek() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error("expected a quoted attribute value")),
            };
            self.bump(1);
            let raw = self.skip_until(&quote.to_string(), "attribute value")?;
            let value = self.unescape(raw)?;
            node.set_attr(name, value);
        }

        let mut segments: Vec<String> = vec![String::new()];
        loop {
            if self.at_end() {
                return Err(self.error(format!("unclosed element <{}>", node.tag)));
            }
            if self.starts_with("</") {
                self.bump(2);
                let name = self.name()?;
                if name != node.tag {
                    return Err(self.error(format!(
                        "closing tag </{}> does not match <{}>",
                        name, node.tag
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                break;
            } else if self.starts_with("<!--") {
                self.skip_until("-->", "comment")?;
            } else if self.starts_with("<![CDATA[") {
                self.bump("<![CDATA[".len());
                let data = self.skip_until("]]>", "CDATA section")?;
                if let Some(last) = segments.last_mut() {
                    last.push_str(data);
                }
            } else if self.starts_with("<?") {
                self.skip_until("?>", "processing instruction")?;
            } else if self.starts_with("<") {
                node.add_child(self.element(depth + 1)?);
                segments.push(String::new());
            } else {
                let rest = self.rest();
                let len = rest.find('<').unwrap_or(rest.len());
                let text = self.unescape(&rest[..len])?;
                self.bump(len);
                if let Some(last) = segments.last_mut() {
                    last.push_str(&text);
                }
            }
        }

        if node.children.is_empty() {
            node.set_text(segments.pop());
        } else {
            for segment in &segments {
                node.add_text(segment, "\n");
            }
        }
        Ok(node)
    }

    fn unescape(&self, raw: &str) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(idx) = rest.find('&') {
            out.push_str(&rest[..idx]);
            rest = &rest[idx + 1..];
            let end = rest
                .find(';')
                .ok_or_else(|| self.error("unterminated entity reference"))?;
            let entity = &rest[..end];
            let ch = match entity {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" => '\'',
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                        .ok_or_else(|| self.error(format!("unknown entity '&{};'", entity)))?
                }
            };
            out.push(ch);
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

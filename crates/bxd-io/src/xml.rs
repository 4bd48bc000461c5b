//! Element/attribute tree encoding for the skeleton document
//!
//! `XmlWriter` is a stack-discipline writer: elements open and close in LIFO
//! order, attributes must precede children, and dropping the writer
//! force-closes anything still open so the emitted document is well-formed
//! on every exit path. `parse` is the matching reader, used for round-trip
//! verification and by skeleton consumers; it tolerates unknown elements and
//! attributes.

use std::io::Write;

use crate::{ExportError, FormatError};

/// Escape reserved markup characters in names, values, and text
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stack-discipline writer over one output stream
pub struct XmlWriter<W: Write> {
    out: W,
    stack: Vec<String>,
    /// Innermost start tag is still open for attributes
    tag_open: bool,
    /// The root element has been closed; nothing more may be written
    root_closed: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            tag_open: false,
            root_closed: false,
        }
    }

    fn indent(&mut self, depth: usize) -> std::io::Result<()> {
        for _ in 0..depth {
            self.out.write_all(b"  ")?;
        }
        Ok(())
    }

    /// Terminate the pending start tag, if any; attributes are no longer
    /// accepted on the current element afterwards
    fn seal_open_tag(&mut self) -> std::io::Result<()> {
        if self.tag_open {
            self.out.write_all(b">\n")?;
            self.tag_open = false;
        }
        Ok(())
    }

    /// Open an element
    pub fn start_element(&mut self, name: &str) -> Result<(), ExportError> {
        if self.root_closed {
            return Err(FormatError::DocumentFinalized.into());
        }
        self.seal_open_tag()?;
        self.indent(self.stack.len())?;
        write!(self.out, "<{}", escape(name))?;
        self.stack.push(name.to_string());
        self.tag_open = true;
        Ok(())
    }

    /// Attach an attribute to the most recently opened element
    pub fn write_attribute(&mut self, name: &str, value: &str) -> Result<(), ExportError> {
        if self.stack.is_empty() {
            return Err(FormatError::NoOpenElement.into());
        }
        if !self.tag_open {
            return Err(FormatError::AttributeAfterChildren.into());
        }
        write!(self.out, " {}=\"{}\"", escape(name), escape(value))?;
        Ok(())
    }

    /// Open, fill with text content, and close a leaf element
    pub fn write_element(&mut self, name: &str, value: &str) -> Result<(), ExportError> {
        if self.root_closed {
            return Err(FormatError::DocumentFinalized.into());
        }
        self.seal_open_tag()?;
        self.indent(self.stack.len())?;
        writeln!(self.out, "<{0}>{1}</{0}>", escape(name), escape(value))?;
        if self.stack.is_empty() {
            // A lone leaf is itself the whole document
            self.root_closed = true;
        }
        Ok(())
    }

    /// Close the most recently opened element
    pub fn end_element(&mut self) -> Result<(), ExportError> {
        let Some(name) = self.stack.last().cloned() else {
            return Err(FormatError::UnbalancedClose.into());
        };
        if self.tag_open {
            self.out.write_all(b" />\n")?;
            self.tag_open = false;
        } else {
            self.indent(self.stack.len() - 1)?;
            writeln!(self.out, "</{}>", escape(&name))?;
        }
        self.stack.pop();
        if self.stack.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    /// Close all remaining elements and flush the stream
    ///
    /// `Drop` performs the same closing best-effort; call this to observe
    /// write errors.
    pub fn finish(&mut self) -> Result<(), ExportError> {
        while !self.stack.is_empty() {
            self.end_element()?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for XmlWriter<W> {
    fn drop(&mut self) {
        // Force-close in LIFO order so the document stays well-formed even
        // on abnormal termination
        while !self.stack.is_empty() {
            if self.end_element().is_err() {
                break;
            }
        }
        let _ = self.out.flush();
    }
}

/// One parsed element: attributes, child elements, concatenated text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// First attribute with the given name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of the first child element with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

/// Parse a document into its root element
pub fn parse(input: &str) -> Result<Element, FormatError> {
    let mut parser = Parser {
        input: input.as_bytes(),
        pos: 0,
    };
    parser.skip_whitespace();
    parser.skip_declaration()?;
    parser.skip_whitespace();
    let root = parser.parse_element()?;
    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return Err(FormatError::Malformed(
            "content after document element".into(),
        ));
    }
    Ok(root)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<u8, FormatError> {
        let b = self
            .peek()
            .ok_or_else(|| FormatError::Malformed("unexpected end of document".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, b: u8) -> Result<(), FormatError> {
        let got = self.bump()?;
        if got != b {
            return Err(FormatError::Malformed(format!(
                "expected '{}', found '{}'",
                b as char, got as char
            )));
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_declaration(&mut self) -> Result<(), FormatError> {
        if self.input[self.pos..].starts_with(b"<?") {
            while !self.input[self.pos..].starts_with(b"?>") {
                self.bump()?;
            }
            self.pos += 2;
        }
        Ok(())
    }

    fn read_name(&mut self) -> Result<String, FormatError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'>' | b'/' | b'=') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(FormatError::Malformed("empty name".into()));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn read_until(&mut self, terminator: u8) -> Result<String, FormatError> {
        let start = self.pos;
        while self.peek() != Some(terminator) {
            self.bump()?;
        }
        let raw = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        unescape(&raw)
    }

    fn parse_element(&mut self) -> Result<Element, FormatError> {
        self.expect(b'<')?;
        let name = self.read_name()?;
        let mut element = Element {
            name: name.clone(),
            ..Element::default()
        };

        // Attributes until '>' or '/>'
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(element);
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let attr_name = self.read_name()?;
                    self.skip_whitespace();
                    self.expect(b'=')?;
                    self.skip_whitespace();
                    self.expect(b'"')?;
                    let value = self.read_until(b'"')?;
                    self.expect(b'"')?;
                    element.attributes.push((attr_name, value));
                }
                None => return Err(FormatError::Malformed("unterminated start tag".into())),
            }
        }

        // Content until the matching close tag
        loop {
            if self.peek() == Some(b'<') {
                if self.input[self.pos..].starts_with(b"</") {
                    self.pos += 2;
                    let close = self.read_name()?;
                    if close != name {
                        return Err(FormatError::Malformed(format!(
                            "mismatched close tag: expected </{name}>, found </{close}>"
                        )));
                    }
                    self.skip_whitespace();
                    self.expect(b'>')?;
                    return Ok(element);
                }
                element.children.push(self.parse_element()?);
            } else {
                // Keep text runs verbatim; only purely inter-element
                // whitespace (indentation, newlines) is formatting
                let text = self.read_until(b'<')?;
                if !text.trim().is_empty() {
                    element.text.push_str(&text);
                }
            }
        }
    }
}

fn unescape(raw: &str) -> Result<String, FormatError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .find(';')
            .ok_or_else(|| FormatError::Malformed("unterminated entity".into()))?;
        match &rest[..=semi] {
            "&amp;" => out.push('&'),
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" => out.push('"'),
            "&apos;" => out.push('\''),
            other => {
                return Err(FormatError::Malformed(format!("unknown entity: {other}")));
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

//! Minimal mutable XML tree
//!
//! WordprocessingML rendering needs to clone paragraphs and rows and rewrite
//! run text in place, which a streaming reader cannot do. Parts are parsed
//! into this tree, edited, and serialized back. Comments and processing
//! instructions are dropped; the XML declaration is regenerated.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{DocxError, DocxResult};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// A child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Element children, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Concatenated text of every descendant element named `name`, in document order
    pub fn descendant_text(&self, name: &str) -> String {
        let mut out = String::new();
        self.push_descendant_text(name, &mut out);
        out
    }

    fn push_descendant_text(&self, name: &str, out: &mut String) {
        for child in self.elements() {
            if child.name == name {
                out.push_str(&child.text());
            } else {
                child.push_descendant_text(name, out);
            }
        }
    }

    /// Collect mutable references to every descendant named `name` (not nested within a match)
    pub fn collect_mut<'a>(&'a mut self, name: &str, out: &mut Vec<&'a mut Element>) {
        for child in self.elements_mut() {
            if child.name == name {
                out.push(child);
            } else {
                child.collect_mut(name, out);
            }
        }
    }

    /// Serialize with an XML declaration
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(DECLARATION);
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v, true));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_into(out),
                Node::Text(t) => out.push_str(&escape(t, false)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse a part into its root element
pub fn parse(xml: &[u8], part: &str) -> DocxResult<Element> {
    let malformed = |reason: String| DocxError::Malformed {
        part: part.to_string(),
        reason,
    };

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()));
                for a in e.attributes() {
                    let a = a.map_err(|err| malformed(err.to_string()))?;
                    let value = a.unescape_value()?;
                    el.attrs.push((String::from_utf8_lossy(a.key.as_ref()).into_owned(), value.into_owned()));
                }
                stack.push(el);
            }
            Event::Empty(e) => {
                let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()));
                for a in e.attributes() {
                    let a = a.map_err(|err| malformed(err.to_string()))?;
                    let value = a.unescape_value()?;
                    el.attrs.push((String::from_utf8_lossy(a.key.as_ref()).into_owned(), value.into_owned()));
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(el)),
                    None => root = Some(el),
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(el)),
                    None => root = Some(el),
                }
            }
            Event::Text(t) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(t.unescape()?.into_owned()));
                }
            }
            Event::CData(t) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Text(String::from_utf8_lossy(&t.into_inner()).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed("unclosed element".into()));
    }
    root.ok_or_else(|| malformed("no root element".into()))
}

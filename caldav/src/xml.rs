// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV processing.

use quick_xml::Reader;
use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::{BytesStart, Event};

use crate::error::CalDavError;

/// XML namespaces used in `CalDAV`.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// Calendar server extensions (`getctag`).
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";

    /// Apple iCal extensions (`calendar-color`).
    pub const APPLE_ICAL: &str = "http://apple.com/ns/ical/";
}

/// An element of a decoded XML document.
///
/// Elements are matched by local name; prefixes vary between servers and
/// are kept only in `qualified_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name, without prefix.
    pub name: String,
    /// Name as written in the document.
    pub qualified_name: String,
    /// Attributes as `(local name, unescaped value)`.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated text content, with references resolved.
    pub text: String,
}

impl XmlElement {
    /// Whether the element has the given local name, ignoring case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// First child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(name))
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// Trimmed text of the first child with the given name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, CalDavError> {
        let qualified_name = decode_name(start.name().as_ref())?;
        let name = decode_name(start.name().local_name().as_ref())?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(CalDavError::malformed)?;
            let key = decode_name(attr.key.local_name().as_ref())?;
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let value = attr.unescape_value().map_err(CalDavError::malformed)?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            qualified_name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }
}

fn decode_name(raw: &[u8]) -> Result<String, CalDavError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(CalDavError::malformed)
}

/// Parses a complete XML document into its root element.
///
/// # Errors
///
/// Returns [`CalDavError::MalformedProtocolResponse`] if the document is not
/// well-formed or has no root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, CalDavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(XmlElement::from_start(e)?),
            Event::Empty(ref e) => {
                let element = XmlElement::from_start(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(CalDavError::malformed("unbalanced end tag"));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(ref e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.decode().map_err(CalDavError::malformed)?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(e.as_ref()).map_err(CalDavError::malformed)?;
                    current.text.push_str(text);
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(current) = stack.last_mut() {
                    if let Some(ch) = e.resolve_char_ref().map_err(CalDavError::malformed)? {
                        current.text.push(ch);
                    } else {
                        let name = decode_name(e.as_ref())?;
                        let resolved = resolve_predefined_entity(&name).ok_or_else(|| {
                            CalDavError::malformed(format!("unknown entity '&{name};'"))
                        })?;
                        current.text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CalDavError::malformed("unexpected end of document"));
    }
    root.ok_or_else(|| CalDavError::malformed("document has no root element"))
}

/// Builds small XML request bodies.
///
/// Names are written with the `D:`/`C:`/`CS:`/`A:` prefixes declared on the
/// root element; text and attribute values are escaped.
#[derive(Debug, Default)]
pub struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    /// Starts a document with the given root element and namespace
    /// declarations `(prefix, uri)`.
    #[must_use]
    pub fn new(root: &str, namespaces: &[(&str, &str)]) -> Self {
        let mut writer = Self {
            buf: String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"),
        };
        let attrs: Vec<(String, &str)> = namespaces
            .iter()
            .map(|(prefix, uri)| (format!("xmlns:{prefix}"), *uri))
            .collect();
        let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        writer.start_with(root, &attrs);
        writer
    }

    /// Opens an element.
    pub fn start(&mut self, name: &str) -> &mut Self {
        self.start_with(name, &[])
    }

    /// Opens an element with attributes.
    pub fn start_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(name);
        self.push_attrs(attrs);
        self.buf.push('>');
        self
    }

    /// Writes an empty element.
    pub fn empty(&mut self, name: &str) -> &mut Self {
        self.empty_with(name, &[])
    }

    /// Writes an empty element with attributes.
    pub fn empty_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(name);
        self.push_attrs(attrs);
        self.buf.push_str("/>");
        self
    }

    /// Writes an element holding only text.
    pub fn text_element(&mut self, name: &str, text: &str) -> &mut Self {
        self.start(name).text(text).end(name)
    }

    /// Writes escaped text inside the current element.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(&escape(text));
        self
    }

    /// Closes an element.
    pub fn end(&mut self, name: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    /// Closes the root element and returns the document.
    #[must_use]
    pub fn finish(mut self, root: &str) -> String {
        self.end(root);
        self.buf
    }

    fn push_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(*value));
            self.buf.push('"');
        }
    }
}

//! Small XML helpers shared by the part readers.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Strip a UTF-8 byte order mark.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "w:p" -> "p").
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Value of the attribute with the given local name (namespace prefix ignored).
pub fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// A direct child of an element, as a slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child<'a> {
    /// A child element with its local name and full source text
    Element { local: Vec<u8>, xml: &'a str },
    /// Anything else at child level (whitespace, comments, processing instructions)
    Other(&'a str),
}

/// An element split into its start tag, direct children and end tag.
#[derive(Debug, Clone)]
pub struct ElementSlices<'a> {
    /// Start tag text; an empty-element tag when `close` is empty
    pub open: &'a str,
    /// Qualified tag name
    pub qname: String,
    /// Direct children in document order
    pub children: Vec<Child<'a>>,
    /// End tag text (empty for `<x/>`)
    pub close: &'a str,
}

impl ElementSlices<'_> {
    /// Whether the element was written as `<x/>`.
    pub fn is_empty_element(&self) -> bool {
        self.close.is_empty()
    }
}

/// Split one element's source text into its start tag, direct children and end tag.
///
/// Leading text before the first element (an XML declaration, whitespace) is
/// not allowed; the slice must start at the element.
pub fn split_element(xml: &str) -> Result<ElementSlices<'_>> {
    let mut reader = Reader::from_str(xml);

    let mut start = reader.buffer_position() as usize;
    let (open, qname) = loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let end = reader.buffer_position() as usize;
                let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                break (&xml[start..end], qname);
            }
            Event::Empty(e) => {
                let end = reader.buffer_position() as usize;
                let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return Ok(ElementSlices {
                    open: &xml[start..end],
                    qname,
                    children: Vec::new(),
                    close: "",
                });
            }
            Event::Eof => return Err(Error::InvalidPart("element expected".into())),
            _ => start = reader.buffer_position() as usize,
        }
    };

    let mut children = Vec::new();
    let mut depth = 0usize;
    let mut child_start = 0usize;
    let mut child_local: Vec<u8> = Vec::new();

    loop {
        let pos = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => {
                if depth == 0 {
                    child_start = pos;
                    child_local = local_name(e.name().as_ref()).to_vec();
                }
                depth += 1;
            }
            Event::End(_) if depth == 0 => {
                return Ok(ElementSlices {
                    open,
                    qname,
                    children,
                    close: &xml[pos..end],
                });
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    children.push(Child::Element {
                        local: std::mem::take(&mut child_local),
                        xml: &xml[child_start..end],
                    });
                }
            }
            Event::Empty(e) if depth == 0 => {
                children.push(Child::Element {
                    local: local_name(e.name().as_ref()).to_vec(),
                    xml: &xml[pos..end],
                });
            }
            Event::Eof => {
                return Err(Error::InvalidPart(format!("unclosed element <{}>", qname)));
            }
            _ if depth == 0 => children.push(Child::Other(&xml[pos..end])),
            _ => {}
        }
    }
}

/// Locate the first element with the given local name, returning its byte span.
pub fn find_element_span(xml: &str, local: &[u8]) -> Result<Option<(usize, usize)>> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut span_start = None;

    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                if span_start.is_none() && local_name(e.name().as_ref()) == local {
                    span_start = Some(pos);
                    depth = 0;
                }
                if span_start.is_some() {
                    depth += 1;
                }
            }
            Event::Empty(e) => {
                if span_start.is_none() && local_name(e.name().as_ref()) == local {
                    return Ok(Some((pos, reader.buffer_position() as usize)));
                }
            }
            Event::End(_) => {
                if let Some(start) = span_start {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Some((start, reader.buffer_position() as usize)));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Read an attribute of the first element with the given local name.
pub fn first_attr(xml: &str, local: &[u8], key: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if local_name(e.name().as_ref()) == local => {
                return attr_value(&e, key);
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Read the `val` attribute of the first element with the given local name.
pub fn first_val(xml: &str, local: &[u8]) -> Option<String> {
    first_attr(xml, local, b"val")
}

//! WordprocessingML part model.
//!
//! A part (main document, header, footer) is kept as the text before its
//! content container, the container's direct children and the text after.
//! Paragraphs are parsed into properties, runs and opaque children; runs into
//! properties, text, tabs, breaks and opaque children. Everything the model
//! does not understand is carried as raw XML, and paragraphs that were never
//! touched serialize back to their original bytes.

use super::xml::{first_attr, first_val, find_element_span, split_element, Child};
use crate::error::{Error, Result};
use quick_xml::escape::{escape, unescape};
use std::borrow::Cow;
use std::ops::Range;

/// Local names of the elements that hold a part's block content.
const CONTAINERS: [&[u8]; 3] = [b"body", b"hdr", b"ftr"];

/// A parsed document, header or footer part.
#[derive(Debug, Clone)]
pub struct WordPart {
    head: String,
    items: Vec<BodyItem>,
    tail: String,
}

/// A direct child of the part's content container.
#[derive(Debug, Clone)]
pub enum BodyItem {
    /// A paragraph (`w:p`)
    Paragraph(Paragraph),
    /// Any other element (`w:tbl`, `w:sectPr`, `w:sdt`, ...)
    Element {
        /// Local element name
        local: String,
        /// Source XML
        xml: String,
    },
    /// Whitespace, comments and other non-element content
    Other(String),
}

impl WordPart {
    /// Parse a part's XML.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut span = None;
        for container in CONTAINERS {
            span = find_element_span(xml, container)?;
            if span.is_some() {
                break;
            }
        }
        let (start, end) = span.ok_or_else(|| {
            Error::InvalidPart("no w:body, w:hdr or w:ftr element found".into())
        })?;

        let container = split_element(&xml[start..end])?;
        let (open, close) = open_close_tags(container.open, container.close, &container.qname);

        let mut items = Vec::with_capacity(container.children.len());
        for child in container.children {
            items.push(match child {
                Child::Element { local, xml } if local == b"p" => {
                    BodyItem::Paragraph(Paragraph::parse(xml)?)
                }
                Child::Element { local, xml } => BodyItem::Element {
                    local: String::from_utf8_lossy(&local).into_owned(),
                    xml: xml.to_string(),
                },
                Child::Other(text) => BodyItem::Other(text.to_string()),
            });
        }

        Ok(Self {
            head: format!("{}{}", &xml[..start], open),
            items,
            tail: format!("{}{}", close, &xml[end..]),
        })
    }

    /// All container children.
    pub fn items(&self) -> &[BodyItem] {
        &self.items
    }

    /// Paragraphs in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.items.iter().filter_map(|item| match item {
            BodyItem::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Mutable access to the paragraph at `index` (counting paragraphs only).
    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.items
            .iter_mut()
            .filter_map(|item| match item {
                BodyItem::Paragraph(p) => Some(p),
                _ => None,
            })
            .nth(index)
    }

    /// Insert paragraphs immediately after the paragraph at `index`.
    ///
    /// Returns `false` when no paragraph has that index.
    pub fn insert_after(&mut self, index: usize, paragraphs: Vec<Paragraph>) -> bool {
        let Some(position) = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item, BodyItem::Paragraph(_)))
            .nth(index)
            .map(|(i, _)| i)
        else {
            return false;
        };

        let at = position + 1;
        self.items
            .splice(at..at, paragraphs.into_iter().map(BodyItem::Paragraph));
        true
    }

    /// Source XML of the first container child with the given local name.
    pub fn element_xml(&self, local: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            BodyItem::Element { local: l, xml } if l == local => Some(xml.as_str()),
            _ => None,
        })
    }

    /// Whether any paragraph was changed or inserted since parsing.
    pub fn is_modified(&self) -> bool {
        self.paragraphs().any(|p| p.is_modified())
    }

    /// Serialize the part.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.head.len() + self.tail.len() + 1024);
        out.push_str(&self.head);
        for item in &self.items {
            match item {
                BodyItem::Paragraph(p) => out.push_str(&p.to_xml()),
                BodyItem::Element { xml, .. } => out.push_str(xml),
                BodyItem::Other(text) => out.push_str(text),
            }
        }
        out.push_str(&self.tail);
        out
    }
}

/// Normalize `<x/>` into an explicit start/end tag pair.
fn open_close_tags(open: &str, close: &str, qname: &str) -> (String, String) {
    if close.is_empty() {
        let trimmed = open.trim_end_matches("/>").trim_end();
        (format!("{}>", trimmed), format!("</{}>", qname))
    } else {
        (open.to_string(), close.to_string())
    }
}

/// A paragraph (`w:p`).
#[derive(Debug, Clone)]
pub struct Paragraph {
    source: Option<String>,
    open: String,
    close: String,
    properties: Option<String>,
    style_id: Option<String>,
    content: Vec<ParagraphContent>,
}

/// A direct child of a paragraph other than its properties.
#[derive(Debug, Clone)]
pub enum ParagraphContent {
    /// A run (`w:r`)
    Run(Run),
    /// Hyperlinks, bookmarks, field markers and anything else
    Raw(String),
}

impl Paragraph {
    /// Create an empty paragraph, optionally referencing a paragraph style.
    pub fn new(style_id: Option<&str>) -> Self {
        let properties = style_id.map(|id| {
            format!(
                r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
                escape(id)
            )
        });
        Self {
            source: None,
            open: "<w:p>".to_string(),
            close: "</w:p>".to_string(),
            properties,
            style_id: style_id.map(str::to_string),
            content: Vec::new(),
        }
    }

    /// Parse a paragraph from its source XML.
    pub fn parse(xml: &str) -> Result<Self> {
        let el = split_element(xml)?;
        let (open, close) = open_close_tags(el.open, el.close, &el.qname);

        let mut properties = None;
        let mut style_id = None;
        let mut content = Vec::new();

        for child in el.children {
            match child {
                Child::Element { local, xml } if local == b"pPr" => {
                    style_id = first_val(xml, b"pStyle");
                    properties = Some(xml.to_string());
                }
                Child::Element { local, xml } if local == b"r" => {
                    content.push(ParagraphContent::Run(Run::parse(xml)?));
                }
                Child::Element { xml, .. } | Child::Other(xml) => {
                    content.push(ParagraphContent::Raw(xml.to_string()));
                }
            }
        }

        Ok(Self {
            source: Some(xml.to_string()),
            open,
            close,
            properties,
            style_id,
            content,
        })
    }

    /// Explicit paragraph style id (`w:pStyle`).
    pub fn style_id(&self) -> Option<&str> {
        self.style_id.as_deref()
    }

    /// Runs in order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            ParagraphContent::Raw(_) => None,
        })
    }

    /// Paragraph text: the concatenated text of its runs.
    pub fn text(&self) -> String {
        self.runs().map(|r| r.text()).collect()
    }

    /// Whether any run carries a hard page break.
    pub fn has_page_break(&self) -> bool {
        self.runs().any(Run::has_page_break)
    }

    /// Whether the paragraph changed since parsing (or was created in memory).
    pub fn is_modified(&self) -> bool {
        self.source.is_none()
    }

    /// Append a run with the given text and direct formatting.
    pub fn push_run(&mut self, text: &str, format: &RunFormat) {
        let mut run = Run::new(format);
        run.set_text(text);
        self.content.push(ParagraphContent::Run(run));
        self.source = None;
    }

    /// Replace every occurrence of `pattern` in the paragraph text.
    ///
    /// Matches may span several runs; see [`Paragraph::replace_range`].
    /// Replacement text is never searched again. Returns whether anything
    /// was replaced.
    pub fn replace_text(&mut self, pattern: &str, replacement: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }

        let mut replaced = false;
        let mut search_from = 0;
        loop {
            let full = self.text();
            let Some(found) = full.get(search_from..).and_then(|s| s.find(pattern)) else {
                break;
            };
            let start = search_from + found;
            if !self.replace_range(start..start + pattern.len(), replacement) {
                break;
            }
            replaced = true;
            search_from = start + replacement.len();
        }
        replaced
    }

    /// Replace the byte range `range` of the paragraph text.
    ///
    /// The replacement is written into the run holding the first character
    /// of the range, keeping that run's properties; the rest of the range is
    /// removed from the following runs. Returns false for an empty range or
    /// one that does not fall on character boundaries of the text.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> bool {
        let texts: Vec<(usize, String)> = self
            .content
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                ParagraphContent::Run(r) => Some((i, r.text())),
                ParagraphContent::Raw(_) => None,
            })
            .collect();
        let full: String = texts.iter().map(|(_, t)| t.as_str()).collect();
        if range.is_empty() || full.get(range.clone()).is_none() {
            return false;
        }
        let (start, end) = (range.start, range.end);

        let mut offset = 0;
        let mut written = false;
        for (index, text) in &texts {
            let run_start = offset;
            let run_end = offset + text.len();
            offset = run_end;
            if run_end <= start || run_start >= end {
                continue;
            }

            let local_start = start.saturating_sub(run_start).min(text.len());
            let local_end = (end - run_start).min(text.len());
            let mut updated = String::with_capacity(text.len() + replacement.len());
            updated.push_str(&text[..local_start]);
            if !written {
                updated.push_str(replacement);
                written = true;
            }
            updated.push_str(&text[local_end..]);

            if let ParagraphContent::Run(run) = &mut self.content[*index] {
                run.set_text(&updated);
            }
        }

        self.source = None;
        true
    }

    /// Serialize the paragraph.
    pub fn to_xml(&self) -> Cow<'_, str> {
        if let Some(source) = &self.source {
            return Cow::Borrowed(source);
        }

        let mut out = String::new();
        out.push_str(&self.open);
        if let Some(props) = &self.properties {
            out.push_str(props);
        }
        for item in &self.content {
            match item {
                ParagraphContent::Run(run) => out.push_str(&run.to_xml()),
                ParagraphContent::Raw(xml) => out.push_str(xml),
            }
        }
        out.push_str(&self.close);
        Cow::Owned(out)
    }
}

/// A run (`w:r`).
#[derive(Debug, Clone)]
pub struct Run {
    open: String,
    close: String,
    properties: Option<String>,
    content: Vec<RunContent>,
}

/// Content of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContent {
    /// Literal text (`w:t`), unescaped
    Text(String),
    /// Tab character (`w:tab`)
    Tab,
    /// Break (`w:br`, `w:cr`)
    Break {
        /// Hard page break
        page: bool,
        /// Source XML
        xml: String,
    },
    /// Drawings, field codes and anything else
    Raw(String),
}

impl Run {
    fn new(format: &RunFormat) -> Self {
        Self {
            open: "<w:r>".to_string(),
            close: "</w:r>".to_string(),
            properties: format.to_properties(),
            content: Vec::new(),
        }
    }

    /// Parse a run from its source XML.
    pub fn parse(xml: &str) -> Result<Self> {
        let el = split_element(xml)?;
        let (open, close) = open_close_tags(el.open, el.close, &el.qname);

        let mut properties = None;
        let mut content = Vec::new();

        for child in el.children {
            match child {
                Child::Element { local, xml } => match local.as_slice() {
                    b"rPr" => properties = Some(xml.to_string()),
                    b"t" => content.push(RunContent::Text(parse_text(xml)?)),
                    b"tab" => content.push(RunContent::Tab),
                    b"br" => {
                        let page = first_attr(xml, b"br", b"type").as_deref() == Some("page");
                        content.push(RunContent::Break {
                            page,
                            xml: xml.to_string(),
                        });
                    }
                    b"cr" => content.push(RunContent::Break {
                        page: false,
                        xml: xml.to_string(),
                    }),
                    _ => content.push(RunContent::Raw(xml.to_string())),
                },
                Child::Other(text) => content.push(RunContent::Raw(text.to_string())),
            }
        }

        Ok(Self {
            open,
            close,
            properties,
            content,
        })
    }

    /// Run text. Tabs read as `\t`, line breaks as `\n`; page breaks add nothing.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for item in &self.content {
            match item {
                RunContent::Text(t) => out.push_str(t),
                RunContent::Tab => out.push('\t'),
                RunContent::Break { page: false, .. } => out.push('\n'),
                RunContent::Break { page: true, .. } | RunContent::Raw(_) => {}
            }
        }
        out
    }

    /// Raw run properties (`w:rPr`).
    pub fn properties(&self) -> Option<&str> {
        self.properties.as_deref()
    }

    /// Whether the run carries a hard page break.
    pub fn has_page_break(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, RunContent::Break { page: true, .. }))
    }

    /// Replace the run's text, keeping its properties and non-text content.
    ///
    /// `\n` becomes a line break and `\t` a tab. The new text takes the place
    /// of the first text item; page breaks, drawings and field codes stay.
    pub fn set_text(&mut self, text: &str) {
        let mut rebuilt = Vec::with_capacity(self.content.len() + 1);
        let mut inserted = false;

        for item in self.content.drain(..) {
            match item {
                RunContent::Text(_) | RunContent::Tab | RunContent::Break { page: false, .. } => {
                    if !inserted {
                        rebuilt.extend(text_content(text));
                        inserted = true;
                    }
                }
                other => rebuilt.push(other),
            }
        }
        if !inserted {
            rebuilt.extend(text_content(text));
        }

        self.content = rebuilt;
    }

    fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.open);
        if let Some(props) = &self.properties {
            out.push_str(props);
        }
        for item in &self.content {
            match item {
                RunContent::Text(t) => {
                    out.push_str(r#"<w:t xml:space="preserve">"#);
                    out.push_str(&escape(t.as_str()));
                    out.push_str("</w:t>");
                }
                RunContent::Tab => out.push_str("<w:tab/>"),
                RunContent::Break { xml, .. } | RunContent::Raw(xml) => out.push_str(xml),
            }
        }
        out.push_str(&self.close);
        out
    }
}

fn parse_text(xml: &str) -> Result<String> {
    let el = split_element(xml)?;
    let mut raw = String::new();
    for child in el.children {
        if let Child::Other(text) = child {
            raw.push_str(text);
        }
    }
    unescape(&raw)
        .map(Cow::into_owned)
        .map_err(|e| Error::InvalidPart(format!("bad text escape: {}", e)))
}

fn text_content(text: &str) -> Vec<RunContent> {
    let mut items = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            items.push(RunContent::Break {
                page: false,
                xml: "<w:br/>".to_string(),
            });
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                items.push(RunContent::Tab);
            }
            if !segment.is_empty() {
                items.push(RunContent::Text(segment.to_string()));
            }
        }
    }
    items
}

/// Direct run formatting for generated runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFormat {
    /// Font family applied to ASCII, high-ANSI and East Asian text
    pub font: Option<String>,
    /// Font size in points
    pub size_pt: Option<f32>,
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Strikethrough
    pub strike: bool,
    /// Hex color (`RRGGBB`)
    pub color: Option<String>,
}

impl RunFormat {
    /// Format with no direct properties.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Fixed-width format used for code.
    pub fn monospace(size_pt: f32) -> Self {
        Self {
            font: Some("Consolas".to_string()),
            size_pt: Some(size_pt),
            ..Self::default()
        }
    }

    /// Whether no property is set.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    fn to_properties(&self) -> Option<String> {
        if self.is_plain() {
            return None;
        }

        // Child order follows the CT_RPr sequence.
        let mut out = String::from("<w:rPr>");
        if let Some(font) = &self.font {
            let font = escape(font.as_str());
            out.push_str(&format!(
                r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:eastAsia="{0}"/>"#,
                font
            ));
        }
        if self.bold {
            out.push_str("<w:b/>");
        }
        if self.italic {
            out.push_str("<w:i/>");
        }
        if self.strike {
            out.push_str("<w:strike/>");
        }
        if let Some(color) = &self.color {
            out.push_str(&format!(r#"<w:color w:val="{}"/>"#, escape(color.as_str())));
        }
        if let Some(size) = self.size_pt {
            let half_points = (size * 2.0).round() as u32;
            out.push_str(&format!(r#"<w:sz w:val="{}"/>"#, half_points));
        }
        out.push_str("</w:rPr>");
        Some(out)
    }
}

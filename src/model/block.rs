//! Content blocks parsed from Markdown.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// ATX or setext heading
    Heading,
    /// Paragraph of inline text
    Paragraph,
    /// Bullet or ordered list; items are children
    List,
    /// Single list item
    ListItem,
    /// Pipe table; rows live in [`ContentBlock::rows`]
    Table,
    /// Fenced or indented code block
    Code,
    /// Paragraph consisting of an image
    Image,
    /// Block quote
    Blockquote,
    /// Thematic break
    HorizontalRule,
}

impl BlockType {
    /// Snake-case name used in prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::List => "list",
            Self::ListItem => "list_item",
            Self::Table => "table",
            Self::Code => "code",
            Self::Image => "image",
            Self::Blockquote => "blockquote",
            Self::HorizontalRule => "horizontal_rule",
        }
    }
}

/// List marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    /// `-`, `*` or `+` markers
    Bullet,
    /// `1.` or `1)` markers
    Ordered,
}

impl ListType {
    /// Snake-case name used in prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Ordered => "ordered",
        }
    }
}

/// Kind of inline formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Strong emphasis
    Bold,
    /// Emphasis
    Italic,
    /// Strikethrough
    Strike,
    /// Inline code
    Code,
}

/// Inline formatting over a range of a block's content.
///
/// Offsets count Unicode scalar values (chars), end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    /// First char covered
    pub start: usize,
    /// One past the last char covered
    pub end: usize,
    /// Formatting kind
    pub kind: SpanKind,
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cell texts
    pub cells: Vec<String>,
    /// Whether this is the header row
    pub is_header: bool,
}

/// A block of parsed Markdown content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block type
    pub block_type: BlockType,

    /// Plain text content
    pub content: String,

    /// Heading level (1-6) or list nesting depth (1 = top level); 0 otherwise
    pub level: u8,

    /// List marker style for lists and list items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ListType>,

    /// Child blocks (list items)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentBlock>,

    /// Free-form attributes (`src`, `title`, `language`, `start`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Table rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<TableRow>,

    /// Inline formatting spans over `content`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<InlineSpan>,
}

impl ContentBlock {
    /// Create a block with content.
    pub fn new(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            block_type,
            content: content.into(),
            level: 0,
            list_type: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            rows: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Create a heading block.
    pub fn heading(content: impl Into<String>, level: u8) -> Self {
        let mut block = Self::new(BlockType::Heading, content);
        block.level = level.clamp(1, 6);
        block
    }

    /// Create a paragraph block.
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::new(BlockType::Paragraph, content)
    }

    /// Create a list block from its items.
    pub fn list(list_type: ListType, items: Vec<ContentBlock>) -> Self {
        let mut block = Self::new(BlockType::List, "");
        block.level = 1;
        block.list_type = Some(list_type);
        block.children = items;
        block
    }

    /// Create a list item block.
    pub fn list_item(content: impl Into<String>, list_type: ListType, depth: u8) -> Self {
        let mut block = Self::new(BlockType::ListItem, content);
        block.level = depth.max(1);
        block.list_type = Some(list_type);
        block
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Get an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether this is a heading of exactly `level`.
    pub fn is_heading_level(&self, level: u8) -> bool {
        self.block_type == BlockType::Heading && self.level == level
    }

    /// Content length in chars.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Record an inline span, clamped to the content and merged with
    /// overlapping or touching spans of the same kind.
    pub fn add_span(&mut self, kind: SpanKind, start: usize, end: usize) {
        let len = self.char_len();
        let mut span = InlineSpan {
            start: start.min(len),
            end: end.min(len),
            kind,
        };
        if span.start >= span.end {
            return;
        }

        self.spans.retain(|s| {
            if s.kind == kind && s.start <= span.end && span.start <= s.end {
                span.start = span.start.min(s.start);
                span.end = span.end.max(s.end);
                false
            } else {
                true
            }
        });
        self.spans.push(span);
        self.spans.sort_by_key(|s| (s.start, s.end));
    }

    /// Whether a single span of `kind` covers the whole content.
    pub fn is_fully(&self, kind: SpanKind) -> bool {
        let len = self.char_len();
        len > 0
            && self
                .spans
                .iter()
                .any(|s| s.kind == kind && s.start == 0 && s.end == len)
    }

    /// Text used when the block replaces a placeholder in place.
    ///
    /// Lists become `- item` / `N. item` lines, tables become rows of
    /// ` | `-joined cells; everything else is its content.
    pub fn flattened_text(&self) -> String {
        match self.block_type {
            BlockType::List => {
                let ordered = self.list_type == Some(ListType::Ordered);
                let start: usize = self
                    .attribute("start")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                self.children
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let indent = "  ".repeat(usize::from(item.level.saturating_sub(1)));
                        let item_ordered = item.list_type.map_or(ordered, |t| t == ListType::Ordered);
                        if item_ordered {
                            let number = item
                                .attribute("number")
                                .map(str::to_string)
                                .unwrap_or_else(|| (start + i).to_string());
                            format!("{}{}. {}", indent, number, item.content)
                        } else {
                            format!("{}- {}", indent, item.content)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            BlockType::Table => self
                .rows
                .iter()
                .map(|row| row.cells.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => self.content.clone(),
        }
    }
}

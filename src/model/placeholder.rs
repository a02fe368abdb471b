//! Placeholder records found in a template.

use serde::{Deserialize, Serialize};

/// Semantic type inferred from a placeholder identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    /// `TITLE`
    Title,
    /// `SUBTITLE`
    Subtitle,
    /// `DATE`
    Date,
    /// `AUTHOR`
    Author,
    /// `TOC`
    Toc,
    /// `BODY`
    Body,
    /// `SECTION_n`
    Section(u32),
    /// `IMAGE`, `COVER_IMAGE`
    Image,
    /// Anything else
    Custom,
}

impl PlaceholderKind {
    /// Infer the kind from a placeholder identifier such as `TITLE` or `SECTION_2`.
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "TITLE" => Self::Title,
            "SUBTITLE" => Self::Subtitle,
            "DATE" => Self::Date,
            "AUTHOR" => Self::Author,
            "TOC" => Self::Toc,
            "BODY" => Self::Body,
            "IMAGE" | "COVER_IMAGE" => Self::Image,
            other => other
                .strip_prefix("SECTION_")
                .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|n| n.parse().ok())
                .map(Self::Section)
                .unwrap_or(Self::Custom),
        }
    }

    /// Snake-case name used in prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Date => "date",
            Self::Author => "author",
            Self::Toc => "toc",
            Self::Body => "body",
            Self::Section(_) => "section",
            Self::Image => "image",
            Self::Custom => "custom",
        }
    }

    /// Section number for `SECTION_n` placeholders.
    pub fn section_number(&self) -> Option<u32> {
        match self {
            Self::Section(n) => Some(*n),
            _ => None,
        }
    }
}

/// Template section a placeholder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    /// Cover page
    Cover,
    /// Table of contents
    Toc,
    /// Section divider page
    SectionBreak,
    /// Body content
    Body,
}

impl SectionType {
    /// Snake-case name used in prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Toc => "toc",
            Self::SectionBreak => "section_break",
            Self::Body => "body",
        }
    }
}

/// Part region a paragraph lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Main document body
    Body,
    /// Page header
    Header,
    /// Page footer
    Footer,
}

/// A placeholder token found in a template paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Identifier inside the marker (e.g. `TITLE`); mappings refer to it
    pub id: String,
    /// Literal marker text (e.g. `{{TITLE}}`)
    pub token: String,
    /// Inferred type
    pub kind: PlaceholderKind,
    /// Template section classification
    pub section: SectionType,
    /// Region of the part holding the paragraph
    pub region: Region,
    /// Part name holding the paragraph
    pub part: String,
    /// Paragraph index within the part
    pub paragraph_index: usize,
    /// Index of the run holding the start of the marker
    pub run_index: usize,
    /// Enclosing paragraph style id
    pub style_id: Option<String>,
    /// Enclosing paragraph style name
    pub style_name: Option<String>,
    /// Full text of the enclosing paragraph
    pub original_text: String,
}

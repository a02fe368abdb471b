//! Template page classification results.

use super::provenance::Provenance;
use serde::{Deserialize, Serialize};

/// Role of a template page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    /// Cover page
    Cover,
    /// Table of contents
    Toc,
    /// Section divider
    Section,
    /// Body content
    Body,
}

impl PageType {
    /// Serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Toc => "toc",
            Self::Section => "section",
            Self::Body => "body",
        }
    }
}

/// A page of the template, delimited by hard page breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page number, 0-based
    pub page_number: usize,
    /// Classified role
    pub page_type: PageType,
    /// Style ids used by the page's paragraphs, sorted
    pub styles_used: Vec<String>,
    /// Number of paragraphs on the page
    pub paragraph_count: usize,
    /// Short preview of the page text
    pub content_preview: String,
    /// Index of the first paragraph on the page
    pub first_paragraph: usize,
    /// Whether the role came from a style-set match or a heuristic
    pub provenance: Provenance,
}

impl PageInfo {
    /// Whether the paragraph index falls on this page.
    pub fn contains_paragraph(&self, index: usize) -> bool {
        index >= self.first_paragraph && index < self.first_paragraph + self.paragraph_count
    }
}

/// Page classification of a whole template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePageStructure {
    /// Pages in order
    pub pages: Vec<PageInfo>,
    /// The cover page (first one wins)
    pub cover_page: Option<usize>,
    /// The table-of-contents page (first one wins)
    pub toc_page: Option<usize>,
    /// All section divider pages
    pub section_pages: Vec<usize>,
    /// First body page
    pub body_start_page: Option<usize>,
}

impl TemplatePageStructure {
    /// Page holding the paragraph at `index`.
    pub fn page_of_paragraph(&self, index: usize) -> Option<&PageInfo> {
        self.pages.iter().find(|p| p.contains_paragraph(index))
    }

    /// Body pages: every page from the first body page on that is not the
    /// cover, the table of contents or a section divider.
    pub fn body_pages(&self) -> Vec<usize> {
        let Some(start) = self.body_start_page else {
            return Vec::new();
        };
        (start..self.pages.len())
            .filter(|&i| {
                Some(i) != self.cover_page
                    && Some(i) != self.toc_page
                    && !self.section_pages.contains(&i)
            })
            .collect()
    }
}

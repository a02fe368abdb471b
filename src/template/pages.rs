//! Page classification of template documents.
//!
//! Pages are delimited by hard page breaks. Each page is labeled cover, toc,
//! section or body from the style ids its paragraphs use, compared against
//! role sets discovered from the template's own style names.

use super::role_table::{PageRole, PAGE_ROLE_PATTERNS};
use super::styles::StyleGraph;
use crate::model::{PageInfo, PageType, Provenance, TemplatePageStructure};
use crate::package::{Paragraph, WordPart};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Maximum paragraph count of a cover page detected by heuristic.
const COVER_MAX_PARAGRAPHS: usize = 5;
/// A section page has fewer non-empty paragraphs than this.
const SECTION_MAX_NON_EMPTY: usize = 5;
/// A section page has at most this many body-styled paragraphs.
const SECTION_MAX_BODY_PARAGRAPHS: usize = 2;

/// Style ids playing each page role in one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRoleSets {
    /// Cover styles
    pub cover: BTreeSet<String>,
    /// Table-of-contents styles
    pub toc: BTreeSet<String>,
    /// Section divider styles
    pub section: BTreeSet<String>,
    /// Body styles
    pub body: BTreeSet<String>,
}

impl StyleRoleSets {
    fn set_mut(&mut self, role: PageRole) -> &mut BTreeSet<String> {
        match role {
            PageRole::Cover => &mut self.cover,
            PageRole::Toc => &mut self.toc,
            PageRole::Section => &mut self.section,
            PageRole::Body => &mut self.body,
        }
    }
}

/// Discover which style ids play which page role, from display names.
pub fn discover_style_ids(styles: &StyleGraph) -> StyleRoleSets {
    let mut sets = StyleRoleSets::default();
    for style in styles.styles() {
        for pattern in PAGE_ROLE_PATTERNS {
            if pattern.matches(&style.name) {
                sets.set_mut(pattern.role).insert(style.style_id.clone());
            }
        }
    }
    log::debug!(
        "Discovered role styles: cover={:?} toc={:?} section={:?} body={:?}",
        sets.cover,
        sets.toc,
        sets.section,
        sets.body
    );
    sets
}

/// Split paragraphs into pages.
///
/// A paragraph carrying a hard page break closes the page it is on. There
/// is always at least one page: a part without paragraphs gives `0..0`.
pub fn split_by_page_breaks(paragraphs: &[&Paragraph]) -> Vec<Range<usize>> {
    let mut pages = Vec::new();
    let mut start = 0;
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if paragraph.has_page_break() {
            pages.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < paragraphs.len() || pages.is_empty() {
        pages.push(start..paragraphs.len());
    }
    pages
}

/// Classifies template pages.
pub struct PageClassifier<'a> {
    styles: &'a StyleGraph,
    roles: StyleRoleSets,
}

impl<'a> PageClassifier<'a> {
    /// Create a classifier, discovering role style sets from the graph.
    pub fn new(styles: &'a StyleGraph) -> Self {
        Self {
            styles,
            roles: discover_style_ids(styles),
        }
    }

    /// Discovered role style sets.
    pub fn role_sets(&self) -> &StyleRoleSets {
        &self.roles
    }

    /// Classify every page of a part.
    pub fn analyze(&self, part: &WordPart) -> TemplatePageStructure {
        let paragraphs: Vec<&Paragraph> = part.paragraphs().collect();
        let mut structure = TemplatePageStructure::default();

        for (number, range) in split_by_page_breaks(&paragraphs).into_iter().enumerate() {
            let info = self.classify_page(number, range.start, &paragraphs[range.clone()]);
            match info.page_type {
                PageType::Cover if structure.cover_page.is_none() => {
                    structure.cover_page = Some(number);
                }
                PageType::Toc if structure.toc_page.is_none() => {
                    structure.toc_page = Some(number);
                }
                PageType::Section => structure.section_pages.push(number),
                PageType::Body if structure.body_start_page.is_none() => {
                    structure.body_start_page = Some(number);
                }
                _ => {}
            }
            structure.pages.push(info);
        }

        log::debug!(
            "Classified {} pages (cover={:?}, toc={:?}, sections={:?}, body from {:?})",
            structure.pages.len(),
            structure.cover_page,
            structure.toc_page,
            structure.section_pages,
            structure.body_start_page
        );
        structure
    }

    /// Classify one page.
    ///
    /// Precedence: cover (page 0 only, by style or by the short-page
    /// heuristic), toc, section, body.
    pub fn classify_page(
        &self,
        page_number: usize,
        first_paragraph: usize,
        paragraphs: &[&Paragraph],
    ) -> PageInfo {
        let style_ids: Vec<Option<&str>> = paragraphs
            .iter()
            .map(|p| self.styles.effective_style_id(p.style_id()))
            .collect();
        let styles_used: BTreeSet<&str> = style_ids.iter().flatten().copied().collect();
        let texts: Vec<String> = paragraphs.iter().map(|p| p.text()).collect();
        let non_empty = texts.iter().filter(|t| !t.trim().is_empty()).count();
        let body_styled = style_ids
            .iter()
            .flatten()
            .filter(|id| self.roles.body.contains(**id))
            .count();

        let intersects = |set: &BTreeSet<String>| styles_used.iter().any(|s| set.contains(*s));

        let (page_type, provenance) = if page_number == 0 && intersects(&self.roles.cover) {
            (PageType::Cover, Provenance::Resolved)
        } else if page_number == 0 && paragraphs.len() <= COVER_MAX_PARAGRAPHS && non_empty > 0 {
            (PageType::Cover, Provenance::Heuristic)
        } else if intersects(&self.roles.toc) {
            (PageType::Toc, Provenance::Resolved)
        } else if intersects(&self.roles.section)
            && non_empty < SECTION_MAX_NON_EMPTY
            && body_styled <= SECTION_MAX_BODY_PARAGRAPHS
        {
            (PageType::Section, Provenance::Resolved)
        } else {
            (PageType::Body, Provenance::FallbackDefault)
        };

        PageInfo {
            page_number,
            page_type,
            styles_used: styles_used.into_iter().map(str::to_string).collect(),
            paragraph_count: paragraphs.len(),
            content_preview: preview(&texts),
            first_paragraph,
            provenance,
        }
    }
}

fn preview(texts: &[String]) -> String {
    texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(3)
        .map(|t| t.chars().take(50).collect::<String>())
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<w:styles xmlns:w="x">
  <w:style w:type="paragraph" w:default="1" w:styleId="a"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="af0"><w:name w:val="Title"/></w:style>
  <w:style w:type="paragraph" w:styleId="10"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="TOCHeading"><w:name w:val="TOC Heading"/></w:style>
  <w:style w:type="paragraph" w:styleId="BodyText"><w:name w:val="Body Text"/></w:style>
</w:styles>"#;

    fn paragraph(style: Option<&str>, text: &str, page_break: bool) -> String {
        let ppr = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
            .unwrap_or_default();
        let brk = if page_break {
            r#"<w:r><w:br w:type="page"/></w:r>"#
        } else {
            ""
        };
        format!("<w:p>{}<w:r><w:t>{}</w:t></w:r>{}</w:p>", ppr, text, brk)
    }

    fn part(paragraphs: &[String]) -> WordPart {
        let xml = format!(
            r#"<w:document xmlns:w="x"><w:body>{}</w:body></w:document>"#,
            paragraphs.concat()
        );
        WordPart::parse(&xml).unwrap()
    }

    #[test]
    fn test_discover_style_ids() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let sets = discover_style_ids(&graph);
        assert!(sets.cover.contains("af0"));
        assert!(sets.section.contains("10"));
        assert!(sets.toc.contains("TOCHeading"));
        assert!(sets.body.contains("a"));
        assert!(sets.body.contains("BodyText"));
    }

    #[test]
    fn test_split_by_page_breaks() {
        let part = part(&[
            paragraph(None, "a", false),
            paragraph(None, "b", true),
            paragraph(None, "c", false),
        ]);
        let paragraphs: Vec<_> = part.paragraphs().collect();
        assert_eq!(split_by_page_breaks(&paragraphs), vec![0..2, 2..3]);
    }

    #[test]
    fn test_trailing_break_adds_no_empty_page() {
        let part = part(&[paragraph(None, "a", true)]);
        let paragraphs: Vec<_> = part.paragraphs().collect();
        assert_eq!(split_by_page_breaks(&paragraphs), vec![0..1]);
    }

    #[test]
    fn test_empty_part_is_one_body_page() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let part = part(&[]);
        let paragraphs: Vec<_> = part.paragraphs().collect();
        assert_eq!(split_by_page_breaks(&paragraphs), vec![0..0]);

        let structure = PageClassifier::new(&graph).analyze(&part);
        assert_eq!(structure.pages.len(), 1);
        assert_eq!(structure.pages[0].page_type, PageType::Body);
        assert_eq!(structure.pages[0].paragraph_count, 0);
        assert_eq!(structure.body_start_page, Some(0));
        assert_eq!(structure.cover_page, None);
    }

    #[test]
    fn test_full_template_classification() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let classifier = PageClassifier::new(&graph);
        let body: Vec<String> = (0..6).map(|i| paragraph(None, &format!("p{}", i), false)).collect();
        let mut paragraphs = vec![
            paragraph(Some("af0"), "{{TITLE}}", true),
            paragraph(Some("TOCHeading"), "Contents", true),
            paragraph(Some("10"), "Part One", true),
        ];
        paragraphs.extend(body);
        let structure = classifier.analyze(&part(&paragraphs));

        assert_eq!(structure.pages.len(), 4);
        assert_eq!(structure.cover_page, Some(0));
        assert_eq!(structure.toc_page, Some(1));
        assert_eq!(structure.section_pages, vec![2]);
        assert_eq!(structure.body_start_page, Some(3));
        assert_eq!(structure.pages[0].provenance, Provenance::Resolved);
        assert_eq!(structure.pages[3].page_type, PageType::Body);
        assert_eq!(structure.pages[3].first_paragraph, 3);
        assert_eq!(structure.pages[3].styles_used, vec!["a".to_string()]);
        assert_eq!(structure.pages[2].content_preview, "Part One");
    }

    #[test]
    fn test_single_page_short_is_cover_by_heuristic() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let classifier = PageClassifier::new(&graph);
        let structure = classifier.analyze(&part(&[
            paragraph(None, "{{BODY}}", false),
            paragraph(None, "", false),
        ]));
        assert_eq!(structure.pages.len(), 1);
        assert_eq!(structure.pages[0].page_type, PageType::Cover);
        assert_eq!(structure.pages[0].provenance, Provenance::Heuristic);
    }

    #[test]
    fn test_single_long_page_is_body() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let classifier = PageClassifier::new(&graph);
        let paragraphs: Vec<String> = (0..8).map(|i| paragraph(None, &format!("p{}", i), false)).collect();
        let structure = classifier.analyze(&part(&paragraphs));
        assert_eq!(structure.pages.len(), 1);
        assert_eq!(structure.pages[0].page_type, PageType::Body);
        assert_eq!(structure.body_start_page, Some(0));
        assert_eq!(structure.cover_page, None);
    }

    #[test]
    fn test_empty_first_page_is_not_cover() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let classifier = PageClassifier::new(&graph);
        let structure = classifier.analyze(&part(&[paragraph(None, " ", false)]));
        assert_eq!(structure.pages[0].page_type, PageType::Body);
    }

    #[test]
    fn test_section_page_with_body_text_is_body() {
        let graph = StyleGraph::from_xml(STYLES).unwrap();
        let classifier = PageClassifier::new(&graph);
        let structure = classifier.analyze(&part(&[
            paragraph(None, "cover", true),
            paragraph(Some("10"), "Heading", false),
            paragraph(Some("BodyText"), "one", false),
            paragraph(Some("BodyText"), "two", false),
            paragraph(Some("BodyText"), "three", false),
        ]));
        assert_eq!(structure.pages[1].page_type, PageType::Body);
        assert!(structure.section_pages.is_empty());
    }
}

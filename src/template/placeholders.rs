//! Placeholder token patterns and extraction.

use super::styles::StyleGraph;
use super::Template;
use crate::error::Error;
use crate::model::{
    PageType, Placeholder, PlaceholderKind, Region, SectionType, TemplatePageStructure,
};
use crate::package::{Paragraph, WordPart};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

static BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+(?:_\d+)?)\}\}").unwrap());
static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([A-Z_]+(?:_\d+)?)\]\]").unwrap());
static ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<([A-Z_]+(?:_\d+)?)>>").unwrap());
static UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"___([A-Z_]+(?:_\d+)?)___").unwrap());

/// Lexical form of placeholder markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPattern {
    /// `{{NAME}}`
    #[default]
    Brace,
    /// `[[NAME]]`
    Bracket,
    /// `<<NAME>>`
    Angle,
    /// `___NAME___`
    Underscore,
}

impl PlaceholderPattern {
    /// All supported forms.
    pub const ALL: [Self; 4] = [Self::Brace, Self::Bracket, Self::Angle, Self::Underscore];

    /// Configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Brace => "brace",
            Self::Bracket => "bracket",
            Self::Angle => "angle",
            Self::Underscore => "underscore",
        }
    }

    /// Compiled marker regex; capture group 1 is the identifier.
    pub fn regex(&self) -> &'static Regex {
        match self {
            Self::Brace => &BRACE_RE,
            Self::Bracket => &BRACKET_RE,
            Self::Angle => &ANGLE_RE,
            Self::Underscore => &UNDERSCORE_RE,
        }
    }

    /// Marker text for an identifier.
    pub fn token(&self, id: &str) -> String {
        match self {
            Self::Brace => format!("{{{{{}}}}}", id),
            Self::Bracket => format!("[[{}]]", id),
            Self::Angle => format!("<<{}>>", id),
            Self::Underscore => format!("___{}___", id),
        }
    }

    /// Marker matches in a text, in order.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<TokenMatch<'t>> {
        self.regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let id = caps.get(1)?;
                Some(TokenMatch {
                    start: whole.start(),
                    token: whole.as_str(),
                    id: id.as_str(),
                })
            })
            .collect()
    }
}

impl fmt::Display for PlaceholderPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlaceholderPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "brace" => Ok(Self::Brace),
            "bracket" => Ok(Self::Bracket),
            "angle" => Ok(Self::Angle),
            "underscore" => Ok(Self::Underscore),
            other => Err(Error::InvalidPattern(other.to_string())),
        }
    }
}

/// One marker occurrence inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch<'t> {
    /// Byte offset of the marker
    pub start: usize,
    /// Full marker text
    pub token: &'t str,
    /// Identifier inside the marker
    pub id: &'t str,
}

impl TokenMatch<'_> {
    /// Byte range of the marker in the searched text.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.token.len()
    }
}

/// Finds placeholders in template parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderExtractor {
    pattern: PlaceholderPattern,
}

impl PlaceholderExtractor {
    /// Create an extractor for one marker form.
    pub fn new(pattern: PlaceholderPattern) -> Self {
        Self { pattern }
    }

    /// Marker form in use.
    pub fn pattern(&self) -> PlaceholderPattern {
        self.pattern
    }

    /// Placeholders of the main document, then of each header and footer part.
    pub fn extract(&self, template: &Template) -> Vec<Placeholder> {
        let mut found = self.extract_from_part(
            template.document(),
            template.document_path(),
            Region::Body,
            template.styles(),
            Some(template.page_structure()),
        );
        for hf in template.headers_footers() {
            found.extend(self.extract_from_part(
                &hf.part,
                &hf.path,
                hf.region,
                template.styles(),
                None,
            ));
        }
        log::debug!(
            "Found {} placeholders using the {} pattern",
            found.len(),
            self.pattern
        );
        found
    }

    /// Placeholders of one part.
    ///
    /// Page classification applies to body paragraphs only.
    pub fn extract_from_part(
        &self,
        part: &WordPart,
        part_name: &str,
        region: Region,
        styles: &StyleGraph,
        pages: Option<&TemplatePageStructure>,
    ) -> Vec<Placeholder> {
        let mut found = Vec::new();

        for (index, paragraph) in part.paragraphs().enumerate() {
            let text = paragraph.text();
            let matches = self.pattern.find_all(&text);
            if matches.is_empty() {
                continue;
            }

            let style_id = styles
                .effective_style_id(paragraph.style_id())
                .map(str::to_string);
            let style_name = style_id.as_deref().map(|id| styles.display_name(id));
            let page_type = pages
                .and_then(|p| p.page_of_paragraph(index))
                .map(|p| p.page_type);

            for m in matches {
                let kind = PlaceholderKind::from_identifier(m.id);
                found.push(Placeholder {
                    id: m.id.to_string(),
                    token: m.token.to_string(),
                    kind,
                    section: section_for(kind, page_type),
                    region,
                    part: part_name.to_string(),
                    paragraph_index: index,
                    run_index: run_index_at(paragraph, m.start),
                    style_id: style_id.clone(),
                    style_name: style_name.clone(),
                    original_text: text.clone(),
                });
            }
        }

        found
    }
}

/// Section of a placeholder: from its kind, overridden by the page it sits on.
fn section_for(kind: PlaceholderKind, page_type: Option<PageType>) -> SectionType {
    match page_type {
        Some(PageType::Cover) => return SectionType::Cover,
        Some(PageType::Toc) => return SectionType::Toc,
        Some(PageType::Section) if kind.section_number().is_some() => {
            return SectionType::SectionBreak
        }
        _ => {}
    }
    match kind {
        PlaceholderKind::Title | PlaceholderKind::Subtitle => SectionType::Cover,
        PlaceholderKind::Toc => SectionType::Toc,
        _ => SectionType::Body,
    }
}

/// Index of the run holding byte offset `offset` of the paragraph text.
fn run_index_at(paragraph: &Paragraph, offset: usize) -> usize {
    let mut position = 0;
    for (i, run) in paragraph.runs().enumerate() {
        position += run.text().len();
        if position > offset {
            return i;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(body: &str) -> WordPart {
        WordPart::parse(&format!(
            r#"<w:document xmlns:w="x"><w:body>{}</w:body></w:document>"#,
            body
        ))
        .unwrap()
    }

    #[test]
    fn test_pattern_from_str() {
        assert_eq!("default".parse::<PlaceholderPattern>().unwrap(), PlaceholderPattern::Brace);
        assert_eq!("Bracket".parse::<PlaceholderPattern>().unwrap(), PlaceholderPattern::Bracket);
        assert_eq!("angle".parse::<PlaceholderPattern>().unwrap(), PlaceholderPattern::Angle);
        assert!(matches!(
            "curly".parse::<PlaceholderPattern>(),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_token_forms() {
        assert_eq!(PlaceholderPattern::Brace.token("TITLE"), "{{TITLE}}");
        assert_eq!(PlaceholderPattern::Bracket.token("BODY"), "[[BODY]]");
        assert_eq!(PlaceholderPattern::Angle.token("DATE"), "<<DATE>>");
        assert_eq!(PlaceholderPattern::Underscore.token("TOC"), "___TOC___");
    }

    #[test]
    fn test_find_all() {
        let matches = PlaceholderPattern::Brace.find_all("{{TITLE}} and {{SECTION_2}}, not {{lower}}");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "TITLE");
        assert_eq!(matches[1].id, "SECTION_2");
        assert_eq!(matches[1].start, 14);

        let matches = PlaceholderPattern::Underscore.find_all("___BODY___");
        assert_eq!(matches[0].id, "BODY");
    }

    #[test]
    fn test_bracket_mode_ignores_braces() {
        let part = part(
            "<w:p><w:r><w:t>[[BODY]]</w:t></w:r></w:p><w:p><w:r><w:t>{{TITLE}}</w:t></w:r></w:p>",
        );
        let extractor = PlaceholderExtractor::new(PlaceholderPattern::Bracket);
        let found =
            extractor.extract_from_part(&part, "word/document.xml", Region::Body, &StyleGraph::empty(), None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "BODY");
        assert_eq!(found[0].token, "[[BODY]]");
        assert_eq!(found[0].kind, PlaceholderKind::Body);
    }

    #[test]
    fn test_run_index_and_split_marker() {
        let part = part(
            r#"<w:p><w:r><w:t xml:space="preserve">Intro </w:t></w:r><w:r><w:t>{{SEC</w:t></w:r><w:r><w:t>TION_1}}</w:t></w:r></w:p>"#,
        );
        let found = PlaceholderExtractor::default().extract_from_part(
            &part,
            "word/document.xml",
            Region::Body,
            &StyleGraph::empty(),
            None,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "SECTION_1");
        assert_eq!(found[0].kind, PlaceholderKind::Section(1));
        assert_eq!(found[0].run_index, 1);
        assert_eq!(found[0].original_text, "Intro {{SECTION_1}}");
    }

    #[test]
    fn test_section_classification() {
        assert_eq!(section_for(PlaceholderKind::Title, None), SectionType::Cover);
        assert_eq!(section_for(PlaceholderKind::Toc, None), SectionType::Toc);
        assert_eq!(section_for(PlaceholderKind::Body, None), SectionType::Body);
        assert_eq!(
            section_for(PlaceholderKind::Body, Some(PageType::Cover)),
            SectionType::Cover
        );
        assert_eq!(
            section_for(PlaceholderKind::Title, Some(PageType::Body)),
            SectionType::Cover
        );
        assert_eq!(
            section_for(PlaceholderKind::Section(2), Some(PageType::Section)),
            SectionType::SectionBreak
        );
    }

    #[test]
    fn test_style_recorded() {
        let styles = StyleGraph::from_xml(
            r#"<w:styles xmlns:w="x"><w:style w:type="paragraph" w:styleId="T"><w:name w:val="Title"/></w:style></w:styles>"#,
        )
        .unwrap();
        let part = part(r#"<w:p><w:pPr><w:pStyle w:val="T"/></w:pPr><w:r><w:t>{{TITLE}}</w:t></w:r></w:p>"#);
        let found = PlaceholderExtractor::default().extract_from_part(
            &part,
            "word/document.xml",
            Region::Body,
            &styles,
            None,
        );
        assert_eq!(found[0].style_id.as_deref(), Some("T"));
        assert_eq!(found[0].style_name.as_deref(), Some("Title"));
        assert_eq!(found[0].section, SectionType::Cover);
    }
}

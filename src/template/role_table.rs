//! Declarative style-name tables.
//!
//! Template style names differ per locale and authoring tool. Page roles and
//! style-role fallbacks are looked up in these tables; supporting another
//! locale means adding names here.

use serde::{Deserialize, Serialize};

/// Role a style plays when classifying template pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRole {
    /// Cover page styles (title, subtitle)
    Cover,
    /// Table-of-contents styles
    Toc,
    /// Section divider styles
    Section,
    /// Body text styles
    Body,
}

/// How a pattern is compared with a lowercased style name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Whole name equals the pattern
    Exact,
    /// Name contains the pattern
    Contains,
}

/// Names that mark a style as playing a page role.
#[derive(Debug, Clone, Copy)]
pub struct RolePattern {
    /// Role assigned on match
    pub role: PageRole,
    /// Comparison
    pub kind: MatchKind,
    /// Lowercase names
    pub names: &'static [&'static str],
}

impl RolePattern {
    /// Whether a style display name matches, ignoring case and surrounding whitespace.
    pub fn matches(&self, style_name: &str) -> bool {
        let name = normalize_name(style_name);
        match self.kind {
            MatchKind::Exact => self.names.iter().any(|n| name == *n),
            MatchKind::Contains => self.names.iter().any(|n| name.contains(n)),
        }
    }
}

/// Page role patterns, English and Korean.
pub const PAGE_ROLE_PATTERNS: &[RolePattern] = &[
    RolePattern {
        role: PageRole::Cover,
        kind: MatchKind::Exact,
        names: &["title", "subtitle", "cover title", "제목", "부제목"],
    },
    RolePattern {
        role: PageRole::Toc,
        kind: MatchKind::Contains,
        names: &["toc", "table of contents", "목차", "차례"],
    },
    RolePattern {
        role: PageRole::Section,
        kind: MatchKind::Exact,
        names: &["heading 1", "제목 1", "part title", "section"],
    },
    RolePattern {
        role: PageRole::Body,
        kind: MatchKind::Exact,
        names: &["normal", "body text", "본문", "바탕글", "list paragraph"],
    },
];

/// Candidate names for the document title style.
pub const TITLE_NAMES: &[&str] = &["Title", "제목"];
/// Candidate names for the document subtitle style.
pub const SUBTITLE_NAMES: &[&str] = &["Subtitle", "부제목", "부제"];
/// Candidate names for section number headings.
pub const SECTION_NUMBER_NAMES: &[&str] = &["heading 1", "Heading 1", "제목 1"];
/// Candidate names for section title headings.
pub const SECTION_TITLE_NAMES: &[&str] = &["Subtitle", "heading 2", "Heading 2", "제목 2"];
/// Candidate names for body paragraphs.
pub const PARAGRAPH_NAMES: &[&str] = &["Body Text", "Normal", "본문", "바탕글"];
/// Candidate names for bullet list items.
pub const BULLET_LIST_NAMES: &[&str] = &["List Bullet", "List Bullet 2", "List Paragraph"];
/// Candidate names for ordered list items.
pub const ORDERED_LIST_NAMES: &[&str] = &["List Number", "List Number 2", "List Paragraph"];
/// Candidate names for block quotes.
pub const BLOCKQUOTE_NAMES: &[&str] = &["Quote", "Intense Quote", "Block Text"];
/// Candidate names for code blocks.
pub const CODE_NAMES: &[&str] = &["HTML Preformatted", "Plain Text", "Normal"];
/// Candidate names for tables.
pub const TABLE_NAMES: &[&str] = &["Table Grid"];

/// Candidate names for a heading level, most specific first.
pub fn heading_names(level: u8) -> Vec<String> {
    vec![
        format!("heading {}", level),
        format!("Heading {}", level),
        format!("Heading{}", level),
        format!("제목 {}", level),
    ]
}

/// Lowercase a style name and collapse runs of whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(role: PageRole) -> &'static RolePattern {
        PAGE_ROLE_PATTERNS.iter().find(|p| p.role == role).unwrap()
    }

    #[test]
    fn test_exact_patterns() {
        assert!(pattern(PageRole::Cover).matches("Title"));
        assert!(pattern(PageRole::Cover).matches("  부제목 "));
        assert!(!pattern(PageRole::Cover).matches("Title Char"));
        assert!(pattern(PageRole::Section).matches("Heading  1"));
        assert!(!pattern(PageRole::Section).matches("heading 2"));
        assert!(pattern(PageRole::Body).matches("바탕글"));
    }

    #[test]
    fn test_contains_patterns() {
        assert!(pattern(PageRole::Toc).matches("TOC Heading"));
        assert!(pattern(PageRole::Toc).matches("toc 1"));
        assert!(pattern(PageRole::Toc).matches("목차 제목"));
        assert!(!pattern(PageRole::Toc).matches("Normal"));
    }

    #[test]
    fn test_heading_names() {
        let names = heading_names(2);
        assert_eq!(names[0], "heading 2");
        assert_eq!(names[2], "Heading2");
        assert_eq!(names[3], "제목 2");
    }
}

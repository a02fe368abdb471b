//! Semantic style roles and their resolution against a template's styles.

use super::role_table::{
    heading_names, BLOCKQUOTE_NAMES, BULLET_LIST_NAMES, CODE_NAMES, ORDERED_LIST_NAMES,
    PARAGRAPH_NAMES, SECTION_NUMBER_NAMES, SECTION_TITLE_NAMES, SUBTITLE_NAMES, TABLE_NAMES,
    TITLE_NAMES,
};
use super::styles::StyleGraph;
use crate::error::Error;
use crate::model::{BlockType, ContentBlock, ListType, Provenance, Resolved, StyleInfo, StyleType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Direct heading sizes in points for levels 1-6, used without a heading style.
const DIRECT_HEADING_SIZES: [f32; 6] = [20.0, 16.0, 14.0, 13.0, 12.0, 11.0];

/// Semantic role a paragraph plays in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleRole {
    /// Document title
    Title,
    /// Document subtitle
    Subtitle,
    /// Section number line on section pages
    SectionNumber,
    /// Section title line on section pages
    SectionTitle,
    /// Heading of level 1-6
    Heading(u8),
    /// Body paragraph
    Paragraph,
    /// Bullet list item
    BulletList,
    /// Ordered list item
    OrderedList,
    /// Block quote
    Blockquote,
    /// Code block
    Code,
    /// Table
    Table,
}

impl StyleRole {
    /// Role used to style an inserted content block.
    pub fn for_block(block: &ContentBlock) -> Self {
        match block.block_type {
            BlockType::Heading => Self::Heading(block.level.clamp(1, 6)),
            BlockType::Code => Self::Code,
            BlockType::List | BlockType::ListItem => match block.list_type {
                Some(ListType::Ordered) => Self::OrderedList,
                _ => Self::BulletList,
            },
            BlockType::Blockquote => Self::Blockquote,
            BlockType::Table => Self::Table,
            BlockType::Paragraph | BlockType::Image | BlockType::HorizontalRule => {
                Self::Paragraph
            }
        }
    }

    /// Role key (`title`, `heading_2`, `bullet_list`, ...).
    pub fn key(&self) -> String {
        match self {
            Self::Heading(level) => format!("heading_{}", level),
            other => other.simple_key().to_string(),
        }
    }

    fn simple_key(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::SectionNumber => "section_number",
            Self::SectionTitle => "section_title",
            Self::Heading(_) => "heading",
            Self::Paragraph => "paragraph",
            Self::BulletList => "bullet_list",
            Self::OrderedList => "ordered_list",
            Self::Blockquote => "blockquote",
            Self::Code => "code",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for StyleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for StyleRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if let Some(level) = key.strip_prefix("heading_") {
            return match level.parse::<u8>() {
                Ok(n @ 1..=6) => Ok(Self::Heading(n)),
                _ => Err(Error::Other(format!("invalid heading role: {}", s))),
            };
        }
        match key.as_str() {
            "title" => Ok(Self::Title),
            "subtitle" => Ok(Self::Subtitle),
            "section_number" => Ok(Self::SectionNumber),
            "section_title" => Ok(Self::SectionTitle),
            "paragraph" => Ok(Self::Paragraph),
            "bullet_list" => Ok(Self::BulletList),
            "ordered_list" => Ok(Self::OrderedList),
            "blockquote" => Ok(Self::Blockquote),
            "code" => Ok(Self::Code),
            "table" => Ok(Self::Table),
            _ => Err(Error::Other(format!("unknown style role: {}", s))),
        }
    }
}

/// A style chosen for a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedStyle {
    /// Template style, or a synthetic record when nothing matched
    pub style: StyleInfo,
    /// Apply the record's formatting as direct run properties instead of
    /// referencing a style id
    pub apply_direct: bool,
}

impl MappedStyle {
    /// Style id to reference, `None` for synthetic styles.
    pub fn style_id(&self) -> Option<&str> {
        (!self.apply_direct).then_some(self.style.style_id.as_str())
    }
}

/// Resolves roles to template styles, memoized per role.
///
/// Each pipeline owns its mapper; the cache never outlives the template.
pub struct StyleRoleMapper<'a> {
    styles: &'a StyleGraph,
    cache: HashMap<StyleRole, Resolved<MappedStyle>>,
}

impl<'a> StyleRoleMapper<'a> {
    /// Create a mapper over a style graph.
    pub fn new(styles: &'a StyleGraph) -> Self {
        Self {
            styles,
            cache: HashMap::new(),
        }
    }

    /// Resolve a role. Repeated calls return the cached result.
    pub fn resolve(&mut self, role: StyleRole) -> Resolved<MappedStyle> {
        if let Some(hit) = self.cache.get(&role) {
            return hit.clone();
        }
        let resolved = self.lookup(role);
        match resolved.provenance {
            Provenance::FallbackDefault => log::warn!(
                "No template style for role {}; applying direct formatting",
                role
            ),
            _ => log::debug!(
                "Role {} -> {} ({:?})",
                role,
                resolved.value.style.style_id,
                resolved.provenance
            ),
        }
        self.cache.insert(role, resolved.clone());
        resolved
    }

    /// Number of memoized roles.
    pub fn cached_roles(&self) -> usize {
        self.cache.len()
    }

    fn lookup(&self, role: StyleRole) -> Resolved<MappedStyle> {
        let by_outline = |level: u8| self.styles.style_by_outline_level(level);

        let (outline, names): (Option<&StyleInfo>, Vec<String>) = match role {
            StyleRole::Heading(level) => (by_outline(level.saturating_sub(1)), heading_names(level)),
            StyleRole::SectionNumber => (by_outline(0), owned(SECTION_NUMBER_NAMES)),
            StyleRole::SectionTitle => (by_outline(1), owned(SECTION_TITLE_NAMES)),
            StyleRole::Title => (None, owned(TITLE_NAMES)),
            StyleRole::Subtitle => (None, owned(SUBTITLE_NAMES)),
            StyleRole::Paragraph => (None, owned(PARAGRAPH_NAMES)),
            StyleRole::BulletList => (None, owned(BULLET_LIST_NAMES)),
            StyleRole::OrderedList => (None, owned(ORDERED_LIST_NAMES)),
            StyleRole::Blockquote => (None, owned(BLOCKQUOTE_NAMES)),
            StyleRole::Code => (None, owned(CODE_NAMES)),
            StyleRole::Table => (None, owned(TABLE_NAMES)),
        };

        if let Some(style) = outline {
            return Resolved::resolved(template_style(style));
        }

        let wanted_type = match role {
            StyleRole::Table => StyleType::Table,
            _ => StyleType::Paragraph,
        };
        if let Some(style) = names
            .iter()
            .filter_map(|name| self.styles.find_candidate(name))
            .find(|s| s.style_type == wanted_type)
        {
            return Resolved::new(template_style(style), Provenance::FallbackByName);
        }

        Resolved::new(synthetic_style(role), Provenance::FallbackDefault)
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn template_style(style: &StyleInfo) -> MappedStyle {
    MappedStyle {
        style: style.clone(),
        apply_direct: false,
    }
}

/// Synthetic style carrying the direct formatting for a role.
fn synthetic_style(role: StyleRole) -> MappedStyle {
    let mut style = StyleInfo::new("default", "default", StyleType::Paragraph);
    match role {
        StyleRole::Heading(level) => {
            style.bold = Some(true);
            style.font_size_pt = Some(DIRECT_HEADING_SIZES[usize::from(level.clamp(1, 6)) - 1]);
        }
        StyleRole::Title | StyleRole::SectionNumber => {
            style.bold = Some(true);
            style.font_size_pt = Some(DIRECT_HEADING_SIZES[0]);
        }
        StyleRole::Subtitle | StyleRole::SectionTitle => {
            style.font_size_pt = Some(DIRECT_HEADING_SIZES[1]);
        }
        StyleRole::Blockquote => style.italic = Some(true),
        StyleRole::Code => {
            style.font_name = Some("Consolas".to_string());
            style.font_size_pt = Some(9.0);
        }
        StyleRole::Paragraph
        | StyleRole::BulletList
        | StyleRole::OrderedList
        | StyleRole::Table => {}
    }
    MappedStyle {
        style,
        apply_direct: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<w:styles xmlns:w="x">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="S1"><w:name w:val="Chapter"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/></w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/></w:style>
  <w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/></w:style>
</w:styles>"#;

    fn graph() -> StyleGraph {
        StyleGraph::from_xml(STYLES).unwrap()
    }

    #[test]
    fn test_heading_prefers_outline_level() {
        let graph = graph();
        let mut mapper = StyleRoleMapper::new(&graph);
        let h1 = mapper.resolve(StyleRole::Heading(1));
        assert_eq!(h1.value.style.style_id, "S1");
        assert_eq!(h1.provenance, Provenance::Resolved);
        assert_eq!(h1.value.style_id(), Some("S1"));
    }

    #[test]
    fn test_heading_falls_back_to_name() {
        let graph = graph();
        let mut mapper = StyleRoleMapper::new(&graph);
        let h2 = mapper.resolve(StyleRole::Heading(2));
        assert_eq!(h2.value.style.style_id, "Heading2");
        assert_eq!(h2.provenance, Provenance::FallbackByName);
    }

    #[test]
    fn test_synthetic_default() {
        let graph = graph();
        let mut mapper = StyleRoleMapper::new(&graph);
        let h4 = mapper.resolve(StyleRole::Heading(4));
        assert_eq!(h4.provenance, Provenance::FallbackDefault);
        assert!(h4.value.apply_direct);
        assert_eq!(h4.value.style_id(), None);
        assert_eq!(h4.value.style.bold, Some(true));
        assert_eq!(h4.value.style.font_size_pt, Some(13.0));

        let quote = mapper.resolve(StyleRole::Blockquote);
        assert!(quote.value.apply_direct);
        assert_eq!(quote.value.style.italic, Some(true));
    }

    #[test]
    fn test_generic_roles() {
        let graph = graph();
        let mut mapper = StyleRoleMapper::new(&graph);
        assert_eq!(mapper.resolve(StyleRole::Paragraph).value.style.style_id, "Normal");
        assert_eq!(mapper.resolve(StyleRole::BulletList).value.style.style_id, "ListBullet");
        assert_eq!(mapper.resolve(StyleRole::Table).value.style.style_id, "TableGrid");
        assert_eq!(mapper.resolve(StyleRole::Title).value.style.style_id, "Title");
        // Code falls through to Normal.
        assert_eq!(mapper.resolve(StyleRole::Code).value.style.style_id, "Normal");
        assert!(mapper.resolve(StyleRole::OrderedList).value.apply_direct);
    }

    #[test]
    fn test_memoized() {
        let graph = graph();
        let mut mapper = StyleRoleMapper::new(&graph);
        let first = mapper.resolve(StyleRole::Heading(1));
        let second = mapper.resolve(StyleRole::Heading(1));
        assert_eq!(first, second);
        assert_eq!(mapper.cached_roles(), 1);
    }

    #[test]
    fn test_role_keys() {
        assert_eq!(StyleRole::Heading(3).key(), "heading_3");
        assert_eq!(StyleRole::BulletList.to_string(), "bullet_list");
        assert_eq!("heading_2".parse::<StyleRole>().unwrap(), StyleRole::Heading(2));
        assert_eq!("Section_Title".parse::<StyleRole>().unwrap(), StyleRole::SectionTitle);
        assert!("heading_9".parse::<StyleRole>().is_err());
        assert!("sidebar".parse::<StyleRole>().is_err());
    }

    #[test]
    fn test_role_for_block() {
        assert_eq!(
            StyleRole::for_block(&ContentBlock::heading("x", 3)),
            StyleRole::Heading(3)
        );
        assert_eq!(
            StyleRole::for_block(&ContentBlock::list(ListType::Ordered, vec![])),
            StyleRole::OrderedList
        );
        assert_eq!(
            StyleRole::for_block(&ContentBlock::paragraph("x")),
            StyleRole::Paragraph
        );
    }
}

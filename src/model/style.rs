//! Template style records.

use serde::{Deserialize, Serialize};

/// Kind of style definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleType {
    /// Paragraph style
    #[default]
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
    /// Numbering style
    Numbering,
}

impl StyleType {
    /// Parse a `w:type` attribute value. Missing or unknown values mean paragraph.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("character") => Self::Character,
            Some("table") => Self::Table,
            Some("numbering") => Self::Numbering,
            _ => Self::Paragraph,
        }
    }
}

/// A style definition with its run and paragraph properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleInfo {
    /// Style id (unique key)
    pub style_id: String,
    /// Display name
    pub name: String,
    /// Style type
    pub style_type: StyleType,
    /// Base style id (`w:basedOn`)
    pub base_style: Option<String>,
    /// Font family
    pub font_name: Option<String>,
    /// Font size in points
    pub font_size_pt: Option<f32>,
    /// Bold
    pub bold: Option<bool>,
    /// Italic
    pub italic: Option<bool>,
    /// Hex color
    pub color: Option<String>,
    /// Paragraph justification (`left`, `center`, `both`, ...)
    pub alignment: Option<String>,
    /// Space before in points
    pub space_before_pt: Option<f32>,
    /// Space after in points
    pub space_after_pt: Option<f32>,
    /// Line spacing as a multiple of single spacing
    pub line_spacing: Option<f32>,
    /// Left indent in points
    pub left_indent_pt: Option<f32>,
    /// Outline level, 0-based (0 = top heading rank)
    pub outline_level: Option<u8>,
    /// Default style of its type (`w:default="1"`)
    pub is_default: bool,
}

impl StyleInfo {
    /// Create a style record with only id, name and type.
    pub fn new(style_id: impl Into<String>, name: impl Into<String>, style_type: StyleType) -> Self {
        Self {
            style_id: style_id.into(),
            name: name.into(),
            style_type,
            ..Self::default()
        }
    }

    /// Copy unset allowlisted attributes from an ancestor.
    ///
    /// Returns whether any attribute is still unset afterwards.
    pub(crate) fn inherit_from(&mut self, ancestor: &StyleInfo) -> bool {
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }

        fill(&mut self.font_name, &ancestor.font_name);
        fill(&mut self.font_size_pt, &ancestor.font_size_pt);
        fill(&mut self.bold, &ancestor.bold);
        fill(&mut self.italic, &ancestor.italic);
        fill(&mut self.color, &ancestor.color);
        fill(&mut self.alignment, &ancestor.alignment);
        fill(&mut self.space_before_pt, &ancestor.space_before_pt);
        fill(&mut self.space_after_pt, &ancestor.space_after_pt);
        fill(&mut self.line_spacing, &ancestor.line_spacing);
        fill(&mut self.outline_level, &ancestor.outline_level);

        self.font_name.is_none()
            || self.font_size_pt.is_none()
            || self.bold.is_none()
            || self.italic.is_none()
            || self.color.is_none()
            || self.alignment.is_none()
            || self.space_before_pt.is_none()
            || self.space_after_pt.is_none()
            || self.line_spacing.is_none()
            || self.outline_level.is_none()
    }
}

/// Document-wide run defaults (`w:docDefaults`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocDefaults {
    /// Default font family
    pub font_name: Option<String>,
    /// Default font size in points
    pub font_size_pt: Option<f32>,
}

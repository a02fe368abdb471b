//! Style graph: style definitions, inheritance and outline-level lookup.

use crate::error::Result;
use crate::model::{DocDefaults, StyleInfo, StyleType};
use crate::package::xml::{attr_value, local_name};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap, HashSet};

/// All style definitions of a template, in document order.
#[derive(Debug, Clone, Default)]
pub struct StyleGraph {
    styles: Vec<StyleInfo>,
    index: HashMap<String, usize>,
    defaults: DocDefaults,
    theme_colors: BTreeMap<String, String>,
}

impl StyleGraph {
    /// A graph without styles, used when the template has no style part.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a style part and resolve inheritance.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut graph = Self::parse_styles(xml)?;
        graph.resolve_inheritance();
        Ok(graph)
    }

    /// Parse style definitions without resolving inheritance.
    pub fn parse_styles(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut current: Option<StyleInfo> = None;
        let mut graph = Self::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    graph.handle_element(&e, &stack, &mut current);
                    stack.push(local_name(e.name().as_ref()).to_vec());
                }
                Event::Empty(e) => {
                    graph.handle_element(&e, &stack, &mut current);
                    if local_name(e.name().as_ref()) == b"style" {
                        if let Some(style) = current.take() {
                            graph.push(style);
                        }
                    }
                }
                Event::End(e) => {
                    stack.pop();
                    if local_name(e.name().as_ref()) == b"style" {
                        if let Some(style) = current.take() {
                            graph.push(style);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!("Parsed {} style definitions", graph.styles.len());
        Ok(graph)
    }

    fn handle_element(
        &mut self,
        e: &BytesStart<'_>,
        stack: &[Vec<u8>],
        current: &mut Option<StyleInfo>,
    ) {
        let name = e.name();
        let local = local_name(name.as_ref());
        let parent = stack.last().map(Vec::as_slice);
        let grandparent = stack.len().checked_sub(2).map(|i| stack[i].as_slice());

        if local == b"style" {
            let style_id = attr_value(e, b"styleId").unwrap_or_default();
            let mut style = StyleInfo::new(
                style_id.clone(),
                style_id,
                StyleType::from_attr(attr_value(e, b"type").as_deref()),
            );
            style.is_default = attr_value(e, b"default")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false);
            *current = Some(style);
            return;
        }

        if let Some(style) = current.as_mut() {
            match (grandparent, parent) {
                (_, Some(b"style")) => match local {
                    b"name" => {
                        if let Some(name) = attr_value(e, b"val") {
                            style.name = name;
                        }
                    }
                    b"basedOn" => style.base_style = attr_value(e, b"val"),
                    _ => {}
                },
                (Some(b"style"), Some(b"rPr")) => apply_run_property(style, local, e),
                (Some(b"style"), Some(b"pPr")) => apply_paragraph_property(style, local, e),
                _ => {}
            }
            return;
        }

        if matches!((grandparent, parent), (Some(b"rPrDefault"), Some(b"rPr"))) {
            match local {
                b"rFonts" => self.defaults.font_name = font_name(e),
                b"sz" => self.defaults.font_size_pt = half_points(e),
                _ => {}
            }
        }
    }

    fn push(&mut self, style: StyleInfo) {
        if style.style_id.is_empty() {
            return;
        }
        if self.index.contains_key(&style.style_id) {
            log::warn!("Duplicate style id {}; keeping the first", style.style_id);
            return;
        }
        self.index.insert(style.style_id.clone(), self.styles.len());
        self.styles.push(style);
    }

    /// Fill unset allowlisted attributes by walking `basedOn` links.
    ///
    /// Each chain is walked against the unresolved definitions and stops at
    /// the first repeated id, so cycles terminate.
    pub fn resolve_inheritance(&mut self) {
        let snapshot = self.styles.clone();

        for style in &mut self.styles {
            let mut visited = HashSet::new();
            visited.insert(style.style_id.clone());
            let mut base = style.base_style.clone();

            while let Some(id) = base {
                if !visited.insert(id.clone()) {
                    log::warn!("Style inheritance cycle at {}", id);
                    break;
                }
                let Some(&idx) = self.index.get(&id) else {
                    break;
                };
                let ancestor = &snapshot[idx];
                if !style.inherit_from(ancestor) {
                    break;
                }
                base = ancestor.base_style.clone();
            }
        }
    }

    /// Style by id.
    pub fn get(&self, style_id: &str) -> Option<&StyleInfo> {
        self.index.get(style_id).map(|&i| &self.styles[i])
    }

    /// All styles in document order.
    pub fn styles(&self) -> &[StyleInfo] {
        &self.styles
    }

    /// Number of styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether the graph has no style.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// First style whose resolved outline level equals `level`.
    pub fn style_by_outline_level(&self, level: u8) -> Option<&StyleInfo> {
        self.styles
            .iter()
            .find(|s| s.style_type == StyleType::Paragraph && s.outline_level == Some(level))
    }

    /// Style whose id equals `candidate`, or whose display name matches it
    /// case-insensitively.
    pub fn find_candidate(&self, candidate: &str) -> Option<&StyleInfo> {
        self.get(candidate).or_else(|| {
            let wanted = candidate.to_lowercase();
            self.styles.iter().find(|s| s.name.to_lowercase() == wanted)
        })
    }

    /// Display name of a style id, falling back to the id itself.
    pub fn display_name(&self, style_id: &str) -> String {
        self.get(style_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| style_id.to_string())
    }

    /// The default paragraph style (`w:default="1"`).
    pub fn default_paragraph_style(&self) -> Option<&StyleInfo> {
        self.styles
            .iter()
            .find(|s| s.is_default && s.style_type == StyleType::Paragraph)
    }

    /// Effective paragraph style id: the explicit one, else the default paragraph style.
    pub fn effective_style_id<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit.or_else(|| self.default_paragraph_style().map(|s| s.style_id.as_str()))
    }

    /// Document-wide run defaults.
    pub fn defaults(&self) -> &DocDefaults {
        &self.defaults
    }

    /// Theme color scheme (`dk1`, `accent1`, ... to hex).
    pub fn theme_colors(&self) -> &BTreeMap<String, String> {
        &self.theme_colors
    }

    /// Attach the theme color scheme.
    pub fn set_theme_colors(&mut self, colors: BTreeMap<String, String>) {
        self.theme_colors = colors;
    }
}

fn apply_run_property(style: &mut StyleInfo, local: &[u8], e: &BytesStart<'_>) {
    match local {
        b"rFonts" => style.font_name = font_name(e),
        b"sz" => style.font_size_pt = half_points(e),
        b"b" => style.bold = Some(on_off(e)),
        b"i" => style.italic = Some(on_off(e)),
        b"color" => style.color = attr_value(e, b"val"),
        _ => {}
    }
}

fn apply_paragraph_property(style: &mut StyleInfo, local: &[u8], e: &BytesStart<'_>) {
    match local {
        b"jc" => style.alignment = attr_value(e, b"val"),
        b"spacing" => {
            if let Some(v) = numeric(e, b"before") {
                style.space_before_pt = Some(v / 20.0);
            }
            if let Some(v) = numeric(e, b"after") {
                style.space_after_pt = Some(v / 20.0);
            }
            if let Some(v) = numeric(e, b"line") {
                style.line_spacing = Some(v / 240.0);
            }
        }
        b"ind" => {
            if let Some(v) = numeric(e, b"left").or_else(|| numeric(e, b"start")) {
                style.left_indent_pt = Some(v / 20.0);
            }
        }
        b"outlineLvl" => {
            style.outline_level = attr_value(e, b"val").and_then(|v| v.parse().ok());
        }
        _ => {}
    }
}

fn font_name(e: &BytesStart<'_>) -> Option<String> {
    attr_value(e, b"ascii")
        .or_else(|| attr_value(e, b"hAnsi"))
        .or_else(|| attr_value(e, b"eastAsia"))
}

fn half_points(e: &BytesStart<'_>) -> Option<f32> {
    numeric(e, b"val").map(|v| v / 2.0)
}

fn numeric(e: &BytesStart<'_>, key: &[u8]) -> Option<f32> {
    attr_value(e, key).and_then(|v| v.parse().ok())
}

/// OOXML on/off property: absent `w:val` means on.
fn on_off(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr_value(e, b"val").as_deref(),
        Some("0") | Some("false") | Some("off")
    )
}

/// Parse the color scheme of a theme part.
pub fn parse_theme_colors(xml: &str) -> Result<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut colors = BTreeMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(local_name(e.name().as_ref()).to_vec()),
            Event::Empty(e) => {
                let in_scheme = stack.len() >= 2 && stack[stack.len() - 2] == b"clrScheme";
                if in_scheme {
                    let slot = String::from_utf8_lossy(&stack[stack.len() - 1]).into_owned();
                    let value = match local_name(e.name().as_ref()) {
                        b"srgbClr" => attr_value(&e, b"val"),
                        b"sysClr" => attr_value(&e, b"lastClr"),
                        _ => None,
                    };
                    if let Some(value) = value {
                        colors.insert(slot, value);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(colors)
}

//! Package relationship graph: parsing `.rels` parts and resolving their targets.

use super::xml::{attr_value, local_name, strip_bom};
use super::Package;
use crate::error::Result;
use crate::model::{Provenance, Region};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// Conventional location of the main document part.
pub const DEFAULT_DOCUMENT_PATH: &str = "word/document.xml";
/// Conventional location of the style definitions part.
pub const DEFAULT_STYLES_PATH: &str = "word/styles.xml";

/// Relationship type suffixes. Transitional and strict OOXML share the last
/// path segment, so types are matched on it.
pub mod types {
    /// Main document part
    pub const OFFICE_DOCUMENT: &str = "/officeDocument";
    /// Style definitions
    pub const STYLES: &str = "/styles";
    /// Header part
    pub const HEADER: &str = "/header";
    /// Footer part
    pub const FOOTER: &str = "/footer";
    /// Theme part
    pub const THEME: &str = "/theme";
    /// Image
    pub const IMAGE: &str = "/image";
    /// Core properties
    pub const CORE_PROPERTIES: &str = "/core-properties";
}

/// A single relationship record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id (e.g. `rId1`)
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Raw target as written in the part
    pub target: String,
    /// Whether the target lives outside the package
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with the given suffix.
    pub fn is_type(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// Parse a relationships part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"Relationship" => {
                let (Some(id), Some(rel_type), Some(target)) = (
                    attr_value(&e, b"Id"),
                    attr_value(&e, b"Type"),
                    attr_value(&e, b"Target"),
                ) else {
                    log::warn!("Skipping incomplete relationship entry");
                    continue;
                };
                let external = attr_value(&e, b"TargetMode")
                    .map(|m| m.eq_ignore_ascii_case("external"))
                    .unwrap_or(false);
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Path of the relationships part that belongs to `part`.
///
/// The package itself (empty part name) maps to `_rels/.rels`.
pub fn rels_path_for(part: &str) -> String {
    let part = part.trim_start_matches('/');
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
///
/// Absolute targets (`/word/styles.xml`) are package-rooted; relative ones
/// are joined with the source part's directory and normalized.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let dir = source_part
        .trim_start_matches('/')
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("");
    if dir.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", dir, target))
    }
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Discovered location of a core part and how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLocation {
    /// Part name inside the package
    pub path: String,
    /// Whether the relationship graph or the conventional path produced it
    pub provenance: Provenance,
}

/// Result of [`RelationshipResolver::resolve_core_paths`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorePaths {
    /// Main document part
    pub document: Option<PartLocation>,
    /// Style definitions part
    pub styles: Option<PartLocation>,
}

impl CorePaths {
    /// Main document part name, if discovered.
    pub fn document_path(&self) -> Option<&str> {
        self.document.as_ref().map(|l| l.path.as_str())
    }

    /// Style part name, if discovered.
    pub fn styles_path(&self) -> Option<&str> {
        self.styles.as_ref().map(|l| l.path.as_str())
    }
}

/// Walks the package relationship graph instead of assuming fixed part names.
pub struct RelationshipResolver<'a> {
    package: &'a Package,
}

impl<'a> RelationshipResolver<'a> {
    /// Create a resolver over an open package.
    pub fn new(package: &'a Package) -> Self {
        Self { package }
    }

    /// Relationships declared by `part` (empty string for the package itself).
    ///
    /// A missing or unreadable relationships part yields an empty list.
    pub fn relationships(&self, part: &str) -> Vec<Relationship> {
        let rels_path = rels_path_for(part);
        let Some(data) = self.package.read(&rels_path) else {
            return Vec::new();
        };
        let xml = String::from_utf8_lossy(strip_bom(data));
        match parse_relationships(&xml) {
            Ok(rels) => rels,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", rels_path, e);
                Vec::new()
            }
        }
    }

    /// Internal targets of `part` whose type ends with `suffix`, resolved to part names.
    pub fn targets_of_type(&self, part: &str, suffix: &str) -> Vec<String> {
        self.relationships(part)
            .into_iter()
            .filter(|r| !r.external && r.is_type(suffix))
            .map(|r| resolve_target(part, &r.target))
            .collect()
    }

    /// Resolve the relationship id `id` declared by `part` to a part name.
    pub fn target_by_id(&self, part: &str, id: &str) -> Option<String> {
        self.relationships(part)
            .into_iter()
            .find(|r| r.id == id && !r.external)
            .map(|r| resolve_target(part, &r.target))
    }

    /// Find the main document part and its style part.
    pub fn resolve_core_paths(&self) -> CorePaths {
        let document = self.resolve_document_path();
        let styles = document
            .as_ref()
            .and_then(|doc| self.resolve_styles_path(&doc.path));
        CorePaths { document, styles }
    }

    fn resolve_document_path(&self) -> Option<PartLocation> {
        if let Some(path) = self
            .targets_of_type("", types::OFFICE_DOCUMENT)
            .into_iter()
            .find(|p| self.package.contains(p))
        {
            return Some(PartLocation {
                path,
                provenance: Provenance::Resolved,
            });
        }

        if self.package.contains(DEFAULT_DOCUMENT_PATH) {
            log::warn!(
                "Main document relationship not found, using {}",
                DEFAULT_DOCUMENT_PATH
            );
            return Some(PartLocation {
                path: DEFAULT_DOCUMENT_PATH.to_string(),
                provenance: Provenance::FallbackDefault,
            });
        }

        None
    }

    fn resolve_styles_path(&self, document_path: &str) -> Option<PartLocation> {
        if let Some(path) = self
            .targets_of_type(document_path, types::STYLES)
            .into_iter()
            .find(|p| self.package.contains(p))
        {
            return Some(PartLocation {
                path,
                provenance: Provenance::Resolved,
            });
        }

        if self.package.contains(DEFAULT_STYLES_PATH) {
            log::warn!(
                "Styles relationship not found, using {}",
                DEFAULT_STYLES_PATH
            );
            return Some(PartLocation {
                path: DEFAULT_STYLES_PATH.to_string(),
                provenance: Provenance::FallbackDefault,
            });
        }

        log::warn!("No style part found; continuing without style metadata");
        None
    }

    /// Header and footer parts referenced by the main document, in relationship order.
    pub fn header_footer_parts(&self, document_path: &str) -> Vec<(Region, String)> {
        self.relationships(document_path)
            .into_iter()
            .filter(|r| !r.external)
            .filter_map(|r| {
                let kind = if r.is_type(types::HEADER) {
                    Region::Header
                } else if r.is_type(types::FOOTER) {
                    Region::Footer
                } else {
                    return None;
                };
                let path = resolve_target(document_path, &r.target);
                self.package.contains(&path).then_some((kind, path))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/main.xml"/>
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(PACKAGE_RELS).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[1].id, "rId1");
        assert!(rels[1].is_type(types::OFFICE_DOCUMENT));
        assert_eq!(rels[1].target, "word/main.xml");
        assert!(!rels[1].external);
        assert!(rels[2].external);
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for(""), "_rels/.rels");
        assert_eq!(rels_path_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path_for("/word/main.xml"), "word/_rels/main.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word/document.xml", "styles.xml"), "word/styles.xml");
        assert_eq!(
            resolve_target("word/document.xml", "/custom/styles.xml"),
            "custom/styles.xml"
        );
        assert_eq!(
            resolve_target("word/document.xml", "../media/logo.png"),
            "media/logo.png"
        );
        assert_eq!(
            resolve_target("word/document.xml", "./theme/theme1.xml"),
            "word/theme/theme1.xml"
        );
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
    }
}
